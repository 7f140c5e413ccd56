//! Machine-readable run report.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use glossa_types::{Artifact, Result, Status};

use crate::pipeline::PipelineResult;

/// One rule's result as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub rule: String,
    pub status: Status,
    pub message: String,
    pub changed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Artifact path after this rule ran.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub path: String,
    pub languages: Vec<String>,
    pub status: Status,
    pub changed: bool,
    pub cancelled: bool,
    pub halted_by: Option<String>,
    #[serde(default)]
    pub skipped: Vec<String>,
    pub duration_ms: u64,
    pub rules: Vec<RuleRecord>,
}

impl RunReport {
    /// Build a report for `input` from the run's result.
    pub fn new(input: &Artifact, result: &PipelineResult, started_at: DateTime<Utc>) -> Self {
        let rules = result
            .outcomes
            .iter()
            .map(|o| RuleRecord {
                rule: o.rule.clone(),
                status: o.status,
                message: o.message.clone(),
                changed: o.changed,
                note: o.note.clone(),
                path: o.path().display().to_string(),
            })
            .collect();
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            path: input.path().display().to_string(),
            languages: input.languages().to_vec(),
            status: result.worst_status(),
            changed: result.changed(),
            cancelled: result.cancelled,
            halted_by: result.halted_by.clone(),
            skipped: result.skipped.clone(),
            duration_ms: result.duration.as_millis() as u64,
            rules,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json_pretty()?).await?;
        tracing::debug!(path = %path.display(), run_id = %self.run_id, "report saved");
        Ok(())
    }
}
