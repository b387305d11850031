//! Artifact kinds produced by the pipeline and the handles returned for them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Every file the pipeline can place on disk.
///
/// The `*Data` kinds (plus `ItemData` and `JobProfile`) are structured JSON
/// records; the others are rendered deliverables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ItemData,
    JobProfile,
    Document,
    MatchData,
    MatchReport,
    FeedbackData,
    Feedback,
    ProposalData,
    Proposal,
    Dashboard,
}

const ALL_KINDS: [ArtifactKind; 10] = [
    ArtifactKind::ItemData,
    ArtifactKind::JobProfile,
    ArtifactKind::Document,
    ArtifactKind::MatchData,
    ArtifactKind::MatchReport,
    ArtifactKind::FeedbackData,
    ArtifactKind::Feedback,
    ArtifactKind::ProposalData,
    ArtifactKind::Proposal,
    ArtifactKind::Dashboard,
];

impl ArtifactKind {
    /// Deliverables that always get a slot in a pipeline result.
    pub const DELIVERABLES: [ArtifactKind; 5] = [
        ArtifactKind::Document,
        ArtifactKind::MatchReport,
        ArtifactKind::Feedback,
        ArtifactKind::Proposal,
        ArtifactKind::Dashboard,
    ];

    /// Token used in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::ItemData => "data",
            ArtifactKind::JobProfile => "job_profile",
            ArtifactKind::Document => "document",
            ArtifactKind::MatchData => "match_data",
            ArtifactKind::MatchReport => "match_report",
            ArtifactKind::FeedbackData => "feedback_data",
            ArtifactKind::Feedback => "feedback",
            ArtifactKind::ProposalData => "proposal_data",
            ArtifactKind::Proposal => "proposal",
            ArtifactKind::Dashboard => "dashboard",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|kind| kind.as_str() == token)
    }

    pub fn is_data(self) -> bool {
        matches!(
            self,
            ArtifactKind::ItemData
                | ArtifactKind::JobProfile
                | ArtifactKind::MatchData
                | ArtifactKind::FeedbackData
                | ArtifactKind::ProposalData
        )
    }

    /// Extension used when the caller does not override it.
    pub fn default_extension(self) -> &'static str {
        match self {
            ArtifactKind::Dashboard => "html",
            kind if kind.is_data() => "json",
            _ => "docx",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ArtifactKind::ItemData => "item data",
            ArtifactKind::JobProfile => "job profile",
            ArtifactKind::Document => "document",
            ArtifactKind::MatchData => "match data",
            ArtifactKind::MatchReport => "match report",
            ArtifactKind::FeedbackData => "feedback data",
            ArtifactKind::Feedback => "feedback report",
            ArtifactKind::ProposalData => "proposal data",
            ArtifactKind::Proposal => "proposal",
            ArtifactKind::Dashboard => "dashboard",
        };
        write!(f, "{}", label)
    }
}

/// Where a produced artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl ArtifactHandle {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
