//! Per-session UI state for the interactive dashboard.
//!
//! The generated report is stored together with the selection token it was
//! produced for. Changing the selection deletes the stored report, and the
//! accessor re-checks the token before surfacing it, so a report for ticker
//! A can never be rendered against ticker B.

use crate::models::{Period, SymbolEntry};

#[derive(Debug, Clone, PartialEq)]
struct ReportSlot {
    token: String,
    text: String,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    selection: Option<SymbolEntry>,
    period: Period,
    report: Option<ReportSlot>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            selection: None,
            period: Period::ThreeMonths,
            report: None,
        }
    }

    pub fn selection(&self) -> Option<&SymbolEntry> {
        self.selection.as_ref()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
    }

    /// Change the active selection. Any stored report is invalidated, even if
    /// the user later returns to the same ticker.
    pub fn select(&mut self, entry: SymbolEntry) {
        if self.selection.as_ref() != Some(&entry) {
            self.report = None;
        }
        self.selection = Some(entry);
    }

    /// Store a freshly generated report against the current selection.
    /// No-op when nothing is selected.
    pub fn store_report(&mut self, text: String) {
        if let Some(sel) = &self.selection {
            self.report = Some(ReportSlot {
                token: sel.display_name(),
                text,
            });
        }
    }

    /// The stored report, only if it was generated for the current selection.
    pub fn current_report(&self) -> Option<&str> {
        let slot = self.report.as_ref()?;
        let sel = self.selection.as_ref()?;
        if slot.token == sel.display_name() {
            Some(&slot.text)
        } else {
            None
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
