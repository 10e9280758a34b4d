use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ir::{FlowRecord, FlowStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Pending,
    Completed,
    #[default]
    All,
}

impl StatusFilter {
    pub fn accepts(self, status: Option<FlowStatus>) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == Some(FlowStatus::Pending),
            Self::Completed => status == Some(FlowStatus::Completed),
        }
    }
}

/// Caller-side selection of the records handed to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub status: StatusFilter,
    /// Inclusive lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &FlowRecord) -> bool {
        if !self.status.accepts(record.status) {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = record.date.map(|ts| ts.date_naive()) else {
            return false;
        };
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// Keeps input order.
    pub fn apply(&self, records: &[FlowRecord]) -> Vec<FlowRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}
