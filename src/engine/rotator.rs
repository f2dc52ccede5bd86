//! Trending symbol rotation.
//!
//! Picks the cold-start symbol group for a calendar day from a fixed
//! rotation table. No randomness and no state: the same day always yields
//! the same group, so "why did the dashboard show these symbols today" has
//! a reproducible answer.

use chrono::{Datelike, NaiveDate, Utc};

/// Symbols per rotation group.
pub const GROUP_SIZE: usize = 3;

/// Fixed schedule of trending groups, indexed by day-of-year.
pub const ROTATION_TABLE: [[&str; GROUP_SIZE]; 8] = [
    ["AAPL", "MSFT", "GOOGL"],
    ["AMZN", "TSLA", "META"],
    ["NVDA", "NFLX", "AMD"],
    ["INTC", "CRM", "ORCL"],
    ["ADBE", "PYPL", "UBER"],
    ["SPOT", "ZM", "SHOP"],
    ["SQ", "ROKU", "SNAP"],
    ["COIN", "RBLX", "DIS"],
];

const _: () = assert!(!ROTATION_TABLE.is_empty());

/// Deterministic daily selector over `ROTATION_TABLE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendingRotator {
    /// Fixed calendar day, for replay and tests. `None` follows the clock.
    pinned: Option<NaiveDate>,
}

impl TrendingRotator {
    pub fn new() -> Self {
        Self { pinned: None }
    }

    /// A rotator that always answers for `date`.
    pub fn pinned(date: NaiveDate) -> Self {
        Self { pinned: Some(date) }
    }

    /// The day this rotator answers for: the pinned date, or the current
    /// UTC calendar day.
    pub fn today(&self) -> NaiveDate {
        self.pinned.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Today's group.
    pub fn todays_symbols(&self) -> Vec<String> {
        Self::symbols_for(self.today())
    }

    /// Index into the rotation table for `date`.
    ///
    /// Day-of-year is zero-based: January 1st is day 0.
    pub fn index_for(date: NaiveDate) -> usize {
        date.ordinal0() as usize % ROTATION_TABLE.len()
    }

    /// The group selected for `date`.
    pub fn symbols_for(date: NaiveDate) -> Vec<String> {
        ROTATION_TABLE[Self::index_for(date)]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Index of the group `todays_symbols` would return.
    pub fn todays_index(&self) -> usize {
        Self::index_for(self.today())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
