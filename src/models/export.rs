use crate::models::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one "ready" export: one outcome per company group, in group order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub exported_at: DateTime<Utc>,
    pub groups: Vec<GroupOutcome>,
}

/// Outcome of writing one company's document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub company: String,
    pub item_ids: Vec<ItemId>,
    #[serde(flatten)]
    pub result: DocumentResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentResult {
    Written { path: PathBuf },
    Failed { error: String },
}

impl ExportReport {
    pub fn new(groups: Vec<GroupOutcome>) -> Self {
        Self {
            exported_at: Utc::now(),
            groups,
        }
    }

    /// Ids of the items whose document was written
    pub fn succeeded_ids(&self) -> Vec<ItemId> {
        self.groups
            .iter()
            .filter(|g| g.is_written())
            .flat_map(|g| g.item_ids.iter().copied())
            .collect()
    }

    pub fn written_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_written()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.len() - self.written_count()
    }

    /// True when every group was written (vacuously true for an empty export)
    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

impl GroupOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.result, DocumentResult::Written { .. })
    }
}
