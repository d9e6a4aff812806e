//! Load run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::schema::TableRef;
use crate::error::Result;

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Finished, but some row-sets or constraints failed.
    Failed,
    Cancelled,
}

/// Row-set lifecycle: `Pending -> Loading -> Loaded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSetStatus {
    Pending,
    Loading,
    Loaded,
    Failed,
}

/// Outcome of one row-set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSetReport {
    pub table: TableRef,
    pub status: RowSetStatus,

    /// Rows written to the target.
    pub rows: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Constraint that could not be applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintFailure {
    pub table: TableRef,
    pub constraint: String,
    pub error: String,
}

/// Constraint phase counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub applied: usize,
    pub failed: usize,

    /// Not attempted because a table they depend on did not load.
    pub skipped: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ConstraintFailure>,
}

/// Result of a load run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResult {
    /// Unique run identifier.
    pub run_id: String,

    pub status: RunStatus,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    pub rows_loaded: u64,

    /// Per row-set outcome, in backup order.
    pub row_sets: Vec<RowSetReport>,

    pub constraints: ConstraintSummary,
}

impl LoadResult {
    /// Row-sets that failed.
    pub fn failed_row_sets(&self) -> impl Iterator<Item = &RowSetReport> {
        self.row_sets
            .iter()
            .filter(|r| r.status == RowSetStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
