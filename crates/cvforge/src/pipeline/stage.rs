use serde::{Deserialize, Serialize};

/// Outcome of one pipeline stage. Stages that cannot abort the run report
/// through this instead of `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ok(T),
    Skipped(String),
    Failed(String),
}

impl<T> StageOutcome<T> {
    pub fn status(&self) -> StageStatus {
        match self {
            StageOutcome::Ok(_) => StageStatus::Ok,
            StageOutcome::Skipped(_) => StageStatus::Skipped,
            StageOutcome::Failed(_) => StageStatus::Failed,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            StageOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Ok(_) => None,
            StageOutcome::Skipped(reason) | StageOutcome::Failed(reason) => Some(reason),
        }
    }

    pub fn report(&self, stage: Stage) -> StageReport {
        StageReport {
            stage,
            status: self.status(),
            detail: self.reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractContext,
    ExtractItem,
    Validate,
    Document,
    MatchReport,
    Feedback,
    Proposal,
    Dashboard,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ExtractContext => "context extraction",
            Stage::ExtractItem => "item extraction",
            Stage::Validate => "validation",
            Stage::Document => "document",
            Stage::MatchReport => "match report",
            Stage::Feedback => "feedback report",
            Stage::Proposal => "proposal",
            Stage::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
