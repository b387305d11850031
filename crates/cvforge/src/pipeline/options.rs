use std::path::PathBuf;
use std::time::Duration;

use crate::collab::GenerationSettings;
use crate::config::Config;
use crate::extract::RetryPolicy;
use crate::naming::Mode;

/// Hard ceiling on concurrent batch items.
pub const MAX_BATCH_WORKERS: usize = 4;

/// Runtime settings threaded through every pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub mode: Mode,
    pub output_directory: PathBuf,
    pub settings: GenerationSettings,
    pub retry: RetryPolicy,
    pub generation_workers: usize,
    pub batch_workers: Option<usize>,
    pub generation_timeout: Option<Duration>,
    pub generate_proposal: bool,
}

impl PipelineOptions {
    pub fn new<P: Into<PathBuf>>(mode: Mode, output_directory: P) -> Self {
        Self {
            mode,
            output_directory: output_directory.into(),
            settings: GenerationSettings::default(),
            retry: RetryPolicy::default(),
            generation_workers: 3,
            batch_workers: None,
            generation_timeout: Some(Duration::from_secs(300)),
            generate_proposal: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.mode,
            output_directory: PathBuf::from(&config.output_directory),
            settings: GenerationSettings {
                model: config.model.clone(),
                language: config.language.clone(),
                style_preset: config.style_preset.clone(),
            },
            retry: RetryPolicy::new(
                config.retry.max_attempts,
                Duration::from_millis(config.retry.base_delay_ms),
            ),
            generation_workers: config.workers.generation.max(1),
            batch_workers: config.workers.batch,
            generation_timeout: match config.generation_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            generate_proposal: config.generate_proposal,
        }
    }

    /// `max(1, min(cpus - 1, 4))`, or the configured override capped at 4.
    pub fn batch_worker_count(&self) -> usize {
        let wanted = self
            .batch_workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1));
        wanted.clamp(1, MAX_BATCH_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_maps_every_field() {
        let mut config = Config::default();
        config.output_directory = "/out".to_string();
        config.mode = Mode::ProfessionalAnalysis;
        config.language = "fr".to_string();
        config.retry.base_delay_ms = 50;
        config.workers.generation = 2;
        config.generation_timeout_secs = 0;
        config.generate_proposal = false;

        let options = PipelineOptions::from_config(&config);

        assert_eq!(options.mode, Mode::ProfessionalAnalysis);
        assert_eq!(options.output_directory, PathBuf::from("/out"));
        assert_eq!(options.settings.language, "fr");
        assert_eq!(options.retry.base_delay, Duration::from_millis(50));
        assert_eq!(options.generation_workers, 2);
        assert_eq!(options.generation_timeout, None);
        assert!(!options.generate_proposal);
    }

    #[test]
    fn test_batch_worker_override_is_capped() {
        let mut options = PipelineOptions::new(Mode::Basic, "/out");
        options.batch_workers = Some(16);
        assert_eq!(options.batch_worker_count(), 4);

        options.batch_workers = Some(2);
        assert_eq!(options.batch_worker_count(), 2);
    }

    #[test]
    fn test_batch_worker_default_in_range() {
        let options = PipelineOptions::new(Mode::Basic, "/out");
        let count = options.batch_worker_count();
        assert!((1..=MAX_BATCH_WORKERS).contains(&count));
    }
}
