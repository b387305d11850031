use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::error::ConfigError;

use super::token::{
    sanitize_token, ARTIFACT_FALLBACK, CANDIDATE_FALLBACK, JOB_CONTEXT_FALLBACK,
};

/// `chrono` format of generated timestamps, e.g. `20240131_154502`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const BATCH_FOLDER_PREFIX: &str = "batch_comparison";
const DEFAULT_ARTIFACT_TYPE: &str = "data";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Basic,
    ProfessionalAnalysis,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Basic => "basic",
            Mode::ProfessionalAnalysis => "professional_analysis",
        }
    }

    pub fn requires_job_context(self) -> bool {
        matches!(self, Mode::ProfessionalAnalysis)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "basic" => Ok(Mode::Basic),
            "professional_analysis" | "professional" => Ok(Mode::ProfessionalAnalysis),
            other => Err(ConfigError::Validation {
                message: format!("Unknown mode '{}'", other),
            }),
        }
    }
}

/// Everything needed to name one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    pub mode: Mode,
    pub is_batch: bool,
    pub candidate_name: String,
    pub job_context_name: String,
    pub artifact_type: String,
    pub timestamp: Option<String>,
    pub extension: Option<String>,
}

impl NamingContext {
    pub fn new(mode: Mode, candidate_name: &str, job_context_name: &str) -> Self {
        Self {
            mode,
            is_batch: false,
            candidate_name: candidate_name.to_string(),
            job_context_name: job_context_name.to_string(),
            artifact_type: DEFAULT_ARTIFACT_TYPE.to_string(),
            timestamp: None,
            extension: None,
        }
    }

    pub fn batch(mut self, is_batch: bool) -> Self {
        self.is_batch = is_batch;
        self
    }

    pub fn artifact(mut self, artifact_type: &str) -> Self {
        self.artifact_type = artifact_type.to_string();
        self
    }

    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }
}

/// Output of [`PathResolver::resolve`].
///
/// For batch resolutions `folder_*` describe the item subfolder, which is also
/// exposed as `item_folder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    pub folder_name: String,
    pub folder_path: PathBuf,
    pub file_name: String,
    pub file_path: PathBuf,
    pub timestamp: String,
    pub candidate_token: String,
    pub job_context_token: Option<String>,
    pub batch_folder: Option<PathBuf>,
    pub shared_context_file: Option<PathBuf>,
    pub item_folder: Option<PathBuf>,
}

/// Maps naming inputs onto the on-disk layout below `base_dir`.
///
/// ```text
/// basic:   <cand>_<ts>/<cand>_<artifact>_<ts>.<ext>
/// single:  <job>_<cand>_<ts>/<job>_<cand>_<artifact>_<ts>.<ext>
/// batch:   batch_comparison_<job>_<ts>/<job>_<ts>.json
///          batch_comparison_<job>_<ts>/<job>_<cand>_<ts>/<job>_<cand>_<artifact>_<ts>.<ext>
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, naming: &NamingContext) -> Result<ResolvedPaths, ConfigError> {
        let job_context = naming.job_context_name.trim();
        if job_context.is_empty() && (naming.mode.requires_job_context() || naming.is_batch) {
            return Err(ConfigError::MissingJobContext {
                mode: if naming.is_batch {
                    "batch".to_string()
                } else {
                    naming.mode.to_string()
                },
            });
        }

        let timestamp = match &naming.timestamp {
            Some(ts) => validate_timestamp(ts)?,
            None => generate_timestamp(),
        };

        let candidate = sanitize_token(&naming.candidate_name, CANDIDATE_FALLBACK);
        let artifact = sanitize_token(&naming.artifact_type, ARTIFACT_FALLBACK);
        let extension = naming
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| default_extension(&naming.artifact_type))
            .to_string();

        // Basic mode drops the job context from the item layout entirely.
        let job_token = if naming.mode == Mode::Basic && !naming.is_batch {
            None
        } else {
            Some(sanitize_token(job_context, JOB_CONTEXT_FALLBACK))
        };

        let stem = match &job_token {
            Some(job) => format!("{}_{}", job, candidate),
            None => candidate.clone(),
        };
        let folder_name = format!("{}_{}", stem, timestamp);
        let file_name = format!("{}_{}_{}.{}", stem, artifact, timestamp, extension);

        let (folder_path, batch_folder, shared_context_file, item_folder) = if naming.is_batch {
            let job = job_token.as_deref().unwrap_or(JOB_CONTEXT_FALLBACK);
            let batch_folder = self
                .base_dir
                .join(format!("{}_{}_{}", BATCH_FOLDER_PREFIX, job, timestamp));
            let shared_context_file = batch_folder.join(format!("{}_{}.json", job, timestamp));
            let item_folder = batch_folder.join(&folder_name);
            (
                item_folder.clone(),
                Some(batch_folder),
                Some(shared_context_file),
                Some(item_folder),
            )
        } else {
            (self.base_dir.join(&folder_name), None, None, None)
        };

        let file_path = folder_path.join(&file_name);

        Ok(ResolvedPaths {
            folder_name,
            folder_path,
            file_name,
            file_path,
            timestamp,
            candidate_token: candidate,
            job_context_token: job_token,
            batch_folder,
            shared_context_file,
            item_folder,
        })
    }
}

/// Free-function form of [`PathResolver::resolve`].
pub fn resolve(
    mode: Mode,
    is_batch: bool,
    candidate_name: &str,
    job_context_name: &str,
    artifact_type: &str,
    timestamp: Option<&str>,
    base_dir: &Path,
) -> Result<ResolvedPaths, ConfigError> {
    let mut naming = NamingContext::new(mode, candidate_name, job_context_name)
        .batch(is_batch)
        .artifact(artifact_type);
    naming.timestamp = timestamp.map(str::to_string);
    PathResolver::new(base_dir).resolve(&naming)
}

pub fn generate_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn validate_timestamp(timestamp: &str) -> Result<String, ConfigError> {
    let trimmed = timestamp.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidTimestamp(timestamp.to_string()))
    }
}

fn default_extension(artifact_type: &str) -> &'static str {
    ArtifactKind::from_token(artifact_type)
        .map(ArtifactKind::default_extension)
        .unwrap_or("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "20240131_154502";

    fn base() -> PathBuf {
        PathBuf::from("/out")
    }

    #[test]
    fn test_single_layout() {
        let paths = resolve(
            Mode::ProfessionalAnalysis,
            false,
            "Jane Doe",
            "Rust Engineer",
            "document",
            Some(TS),
            &base(),
        )
        .unwrap();

        assert_eq!(paths.folder_name, "rust_engineer_jane_doe_20240131_154502");
        assert_eq!(
            paths.file_name,
            "rust_engineer_jane_doe_document_20240131_154502.docx"
        );
        assert_eq!(
            paths.file_path,
            PathBuf::from(
                "/out/rust_engineer_jane_doe_20240131_154502/rust_engineer_jane_doe_document_20240131_154502.docx"
            )
        );
        assert!(paths.batch_folder.is_none());
        assert!(paths.shared_context_file.is_none());
        assert!(paths.item_folder.is_none());
    }

    #[test]
    fn test_basic_layout_omits_job_context() {
        let paths = resolve(Mode::Basic, false, "Jane Doe", "", "data", Some(TS), &base()).unwrap();

        assert_eq!(paths.folder_name, "jane_doe_20240131_154502");
        assert_eq!(paths.file_name, "jane_doe_data_20240131_154502.json");
        assert!(paths.job_context_token.is_none());
    }

    #[test]
    fn test_batch_layout() {
        let paths = resolve(
            Mode::ProfessionalAnalysis,
            true,
            "Jane Doe",
            "Rust Engineer",
            "feedback",
            Some(TS),
            &base(),
        )
        .unwrap();

        let batch = PathBuf::from("/out/batch_comparison_rust_engineer_20240131_154502");
        assert_eq!(paths.batch_folder.as_ref(), Some(&batch));
        assert_eq!(
            paths.shared_context_file,
            Some(batch.join("rust_engineer_20240131_154502.json"))
        );
        let item = batch.join("rust_engineer_jane_doe_20240131_154502");
        assert_eq!(paths.item_folder.as_ref(), Some(&item));
        assert_eq!(paths.folder_path, item);
        assert_eq!(
            paths.file_path,
            item.join("rust_engineer_jane_doe_feedback_20240131_154502.docx")
        );
    }

    #[test]
    fn test_professional_analysis_requires_job_context() {
        let err = resolve(
            Mode::ProfessionalAnalysis,
            false,
            "Jane",
            "   ",
            "document",
            Some(TS),
            &base(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingJobContext { .. }));
    }

    #[test]
    fn test_batch_requires_job_context_even_in_basic_mode() {
        let err = resolve(Mode::Basic, true, "Jane", "", "data", Some(TS), &base()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingJobContext { mode } if mode == "batch"));
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let resolver = PathResolver::new(base());
        let naming = NamingContext::new(Mode::ProfessionalAnalysis, "Ana María", "Data Lead")
            .artifact("match_report")
            .timestamp(TS);
        assert_eq!(
            resolver.resolve(&naming).unwrap(),
            resolver.resolve(&naming).unwrap()
        );

        let batch = naming.clone().batch(true);
        assert_eq!(
            resolver.resolve(&batch).unwrap(),
            resolver.resolve(&batch).unwrap()
        );
    }

    #[test]
    fn test_generated_timestamp_is_returned() {
        let resolver = PathResolver::new(base());
        let naming = NamingContext::new(Mode::Basic, "Jane", "");
        let first = resolver.resolve(&naming).unwrap();

        assert_eq!(first.timestamp.len(), "20240131_154502".len());
        assert!(first.folder_name.ends_with(&first.timestamp));

        let reused = resolver
            .resolve(&naming.clone().artifact("dashboard").timestamp(&first.timestamp))
            .unwrap();
        assert_eq!(reused.folder_path, first.folder_path);
    }

    #[test]
    fn test_explicit_extension_overrides_default() {
        let resolver = PathResolver::new(base());
        let naming = NamingContext::new(Mode::Basic, "Jane", "")
            .artifact("document")
            .timestamp(TS)
            .extension(".pdf");
        let paths = resolver.resolve(&naming).unwrap();
        assert!(paths.file_name.ends_with("_document_20240131_154502.pdf"));
    }

    #[test]
    fn test_dashboard_defaults_to_html() {
        let paths = resolve(Mode::Basic, false, "Jane", "", "dashboard", Some(TS), &base()).unwrap();
        assert!(paths.file_name.ends_with(".html"));
    }

    #[test]
    fn test_rejects_timestamp_with_separators() {
        let resolver = PathResolver::new(base());
        let naming = NamingContext::new(Mode::Basic, "Jane", "").timestamp("../etc");
        assert!(matches!(
            resolver.resolve(&naming),
            Err(ConfigError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("basic".parse::<Mode>().unwrap(), Mode::Basic);
        assert_eq!(
            "professional-analysis".parse::<Mode>().unwrap(),
            Mode::ProfessionalAnalysis
        );
        assert!("fancy".parse::<Mode>().is_err());
    }
}
