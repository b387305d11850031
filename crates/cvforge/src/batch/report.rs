use std::path::PathBuf;

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::pipeline::PipelineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    AllSucceeded,
    Partial,
    AllFailed,
    Empty,
}

/// Aggregated results of a batch, index-aligned with the submitted items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<PipelineResult>,
    pub batch_folder: Option<PathBuf>,
    pub shared_context_label: String,
    pub timestamp: String,
    pub overall_success: bool,
}

impl BatchReport {
    pub fn new(
        results: Vec<PipelineResult>,
        batch_folder: Option<PathBuf>,
        shared_context_label: &str,
        timestamp: &str,
    ) -> Self {
        let overall_success = results.iter().all(|r| r.success);
        Self {
            results,
            batch_folder,
            shared_context_label: shared_context_label.to_string(),
            timestamp: timestamp.to_string(),
            overall_success,
        }
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn outcome(&self) -> BatchOutcome {
        match (self.results.len(), self.success_count()) {
            (0, _) => BatchOutcome::Empty,
            (total, ok) if ok == total => BatchOutcome::AllSucceeded,
            (_, 0) => BatchOutcome::AllFailed,
            _ => BatchOutcome::Partial,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} succeeded",
            self.success_count(),
            self.results.len()
        )
    }

    /// Per-item status table in submission order.
    pub fn status_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["#", "Candidate", "Status", "Artifacts", "Details"]);

        for (i, result) in self.results.iter().enumerate() {
            let produced = ArtifactKind::DELIVERABLES
                .iter()
                .filter(|kind| result.handle(**kind).is_some())
                .count();
            let details = match &result.error {
                Some(error) => error.clone(),
                None if !result.warnings.is_empty() => result.warnings.join("; "),
                None => "-".to_string(),
            };
            table.add_row(vec![
                (i + 1).to_string(),
                result.candidate_display_name.clone(),
                if result.success { "OK" } else { "FAILED" }.to_string(),
                format!("{}/{}", produced, ArtifactKind::DELIVERABLES.len()),
                details,
            ]);
        }

        table.to_string()
    }
}
