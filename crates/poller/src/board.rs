use catalog::{Item, PricedRow};

use crate::diff::classify;

pub const LOAD_ERROR_MESSAGE: &str = "Failed to fetch items. Please try again later.";

/// What the user sees, plus the snapshot the next cycle diffs against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    rows: Vec<PricedRow>,
    previous: Vec<Item>,
    loading: bool,
    load_error: Option<String>,
    cycles: u64,
    applied_seq: u64,
}

impl Board {
    pub fn rows(&self) -> &[PricedRow] {
        &self.rows
    }

    /// Snapshot the next update cycle compares against.
    pub fn previous(&self) -> &[Item] {
        &self.previous
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Number of update cycles applied so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub(crate) fn begin_load(&mut self) {
        self.loading = true;
    }

    pub(crate) fn finish_load(&mut self, items: Vec<Item>) {
        self.rows = items.iter().cloned().map(PricedRow::untagged).collect();
        self.previous = items;
        self.loading = false;
        self.load_error = None;
    }

    pub(crate) fn fail_load(&mut self) {
        self.rows.clear();
        self.previous.clear();
        self.loading = false;
        self.load_error = Some(LOAD_ERROR_MESSAGE.to_string());
    }

    /// Applies the result of cycle `seq`. Results from cycles older than the
    /// last applied one are dropped and leave the board untouched.
    pub(crate) fn apply_update(&mut self, seq: u64, items: Vec<Item>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.rows = classify(&self.previous, &items);
        self.previous = items;
        self.cycles += 1;
        self.applied_seq = seq;
        true
    }
}
