use std::time::Instant;
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a large integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let s = n.abs().to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

/// Two-decimal price with thousands separators, e.g. 71400.0 → "71,400.00".
pub fn fmt_price(p: f64) -> String {
    if p < 0.0 {
        let s = fmt_price(-p);
        // -0.001 rounds to zero; don't print "-0.00".
        if s == "0.00" {
            return s;
        }
        return format!("-{}", s);
    }
    let whole = p.trunc() as i64;
    let frac = (p.fract() * 100.0).round() as i64;
    // Carry when the fraction rounds up to a whole unit.
    if frac >= 100 {
        return fmt_price((whole + 1) as f64);
    }
    format!("{}.{:02}", fmt_number(whole), frac)
}
