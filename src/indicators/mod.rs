//! Derived technical indicators over a price table.

use crate::models::{Fetched, PriceTable};

/// Rolling window for the moving average.
pub const MA_WINDOW: usize = 20;

/// Annotate a fetched table with MA20 and day-over-day change. Pure: the
/// OHLCV fields pass through untouched, only the derived fields are filled.
/// Absent input (empty or failed fetch) passes through unchanged; a table
/// with zero rows degrades to `Empty`.
pub fn add_technical_indicators(input: Fetched<PriceTable>) -> Fetched<PriceTable> {
    match input {
        Fetched::Data(table) if table.is_empty() => Fetched::Empty,
        Fetched::Data(table) => Fetched::Data(annotate(table)),
        other => other,
    }
}

fn annotate(mut table: PriceTable) -> PriceTable {
    let closes: Vec<f64> = table.rows.iter().map(|r| r.close).collect();
    let mut window_sum = 0.0;

    for i in 0..closes.len() {
        window_sum += closes[i];
        if i >= MA_WINDOW {
            window_sum -= closes[i - MA_WINDOW];
        }
        if i + 1 >= MA_WINDOW {
            table.rows[i].ma20 = Some(window_sum / MA_WINDOW as f64);
        }
        if i >= 1 {
            table.rows[i].daily_change = Some(closes[i] - closes[i - 1]);
        }
    }
    table
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceRow;
    use chrono::NaiveDate;

    fn table_from_closes(closes: &[f64]) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceRow::new(start + chrono::Days::new(i as u64), c))
            .collect();
        PriceTable::new("TEST", rows)
    }

    fn mean(xs: &[f64]) -> f64 {
        xs.iter().sum::<f64>() / xs.len() as f64
    }

    #[test]
    fn test_ma20_defined_from_row_twenty() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let table = add_technical_indicators(Fetched::Data(table_from_closes(&closes)))
            .data()
            .unwrap();

        for i in 0..19 {
            assert!(table.rows[i].ma20.is_none(), "row {} should be undefined", i);
        }
        for i in 19..25 {
            let expected = mean(&closes[i + 1 - MA_WINDOW..=i]);
            let got = table.rows[i].ma20.unwrap();
            assert!((got - expected).abs() < 1e-9, "row {}: {} vs {}", i, got, expected);
        }
    }

    #[test]
    fn test_rising_close_scenario() {
        // 100, 102, 105, then 18 more rising values ending at 130.
        let mut closes = vec![100.0, 102.0, 105.0];
        closes.extend((1..=18).map(|i| 105.0 + i as f64 * 25.0 / 18.0));
        assert_eq!(closes.len(), 21);
        assert!((closes[20] - 130.0).abs() < 1e-9);

        let table = add_technical_indicators(Fetched::Data(table_from_closes(&closes)))
            .data()
            .unwrap();

        assert!(table.rows[0].daily_change.is_none());
        assert!((table.rows[1].daily_change.unwrap() - 2.0).abs() < 1e-9);
        assert!((table.rows[19].ma20.unwrap() - mean(&closes[0..20])).abs() < 1e-9);
        assert!((table.rows[20].ma20.unwrap() - mean(&closes[1..21])).abs() < 1e-9);
    }

    #[test]
    fn test_short_table_has_no_ma_but_has_change() {
        let table = add_technical_indicators(Fetched::Data(table_from_closes(&[10.0, 12.5])))
            .data()
            .unwrap();
        assert!(table.rows.iter().all(|r| r.ma20.is_none()));
        assert!((table.rows[1].daily_change.unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_price_fields_untouched() {
        let mut input = table_from_closes(&[50.0, 51.0, 52.0]);
        input.rows[1].open = Some(50.5);
        input.rows[1].volume = Some(1_000);

        let table = add_technical_indicators(Fetched::Data(input.clone()))
            .data()
            .unwrap();
        assert_eq!(table.rows[1].open, Some(50.5));
        assert_eq!(table.rows[1].volume, Some(1_000));
        assert_eq!(table.rows[1].close, input.rows[1].close);
        assert_eq!(table.rows[1].date, input.rows[1].date);
    }

    #[test]
    fn test_absent_input_stays_absent() {
        assert_eq!(add_technical_indicators(Fetched::Empty), Fetched::Empty);
        assert_eq!(
            add_technical_indicators(Fetched::Failed("down".into())),
            Fetched::Failed("down".into())
        );
        // Zero rows degrades to Empty.
        assert_eq!(
            add_technical_indicators(Fetched::Data(PriceTable::new("X", vec![]))),
            Fetched::Empty
        );
    }
}
