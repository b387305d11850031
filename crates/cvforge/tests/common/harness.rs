//! Test harness for running pipelines against a throwaway output directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use cvforge::collab::{HtmlDashboardRenderer, JsonExtractor};
use cvforge::pipeline::{FnProgress, ProgressEvent, ProgressState};
use cvforge::{Collaborators, Mode, Pipeline, PipelineOptions, RetryPolicy};

use super::builders::CountingRenderer;

/// Owns a temp directory with `input/` and `output/` below it.
pub struct TestHarness {
    pub temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");

        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a source document into the input directory.
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let child = self.temp_dir.child("input").child(name);
        child.write_str(content).expect("Failed to write input file");
        child.path().to_path_buf()
    }

    /// Write a config file next to the inputs.
    pub fn write_config(&self, name: &str, json: &str) -> PathBuf {
        let child = self.temp_dir.child(name);
        child.write_str(json).expect("Failed to write config file");
        child.path().to_path_buf()
    }

    /// Options tuned for tests: millisecond backoff and a short render timeout.
    pub fn options(&self, mode: Mode) -> PipelineOptions {
        let mut options = PipelineOptions::new(mode, &self.output_dir);
        options.retry = RetryPolicy::new(3, Duration::from_millis(1));
        options.generation_timeout = Some(Duration::from_secs(10));
        options
    }

    /// Reference collaborators writing into the output directory.
    pub fn reference_collaborators(&self) -> Collaborators {
        Collaborators::reference(&self.output_dir)
    }

    /// Reference collaborators with a counting document renderer.
    pub fn counting_collaborators(&self) -> (Collaborators, Arc<CountingRenderer>) {
        let renderer = Arc::new(CountingRenderer::new(&self.output_dir));
        let collaborators = Collaborators::new(
            Arc::new(JsonExtractor),
            renderer.clone(),
            Arc::new(HtmlDashboardRenderer::new(&self.output_dir)),
        );
        (collaborators, renderer)
    }

    pub fn pipeline(&self, options: PipelineOptions, collaborators: Collaborators) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(options, collaborators))
    }

    /// Every file below the output directory, relative to it.
    pub fn list_outputs(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.output_dir, &mut files);
        files
            .into_iter()
            .filter_map(|p| p.strip_prefix(&self.output_dir).ok().map(Path::to_path_buf))
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}

/// Records every progress event it receives.
#[derive(Clone, Default)]
pub struct ProgressLog {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressLog {
    pub fn reporter(&self) -> FnProgress<impl Fn(ProgressEvent) + Send + Sync> {
        let events = Arc::clone(&self.events);
        FnProgress(move |event| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.percent).collect()
    }

    pub fn last_state(&self) -> Option<ProgressState> {
        self.events().last().map(|e| e.state)
    }
}
