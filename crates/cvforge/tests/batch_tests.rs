//! Batch coordinator scenarios: shared context, ordering, crashes, gates.

mod common;

use std::sync::Arc;

use cvforge::pipeline::{NoopProgress, ProgressState};
use cvforge::{
    ArtifactKind, BatchCoordinator, BatchOutcome, BatchRequest, Collaborators, Mode,
    PipelineOptions, TargetSchema,
};

use common::*;

const TS: &str = "20240315_090000";

fn candidates(n: usize) -> Vec<cvforge::SourceDocument> {
    (0..n)
        .map(|i| resume_doc(&format!("cand{}", i), &format!("Candidate {}", i), &["Rust", "SQL"]))
        .collect()
}

fn batch(items: Vec<cvforge::SourceDocument>) -> BatchRequest {
    BatchRequest::new(items, job_doc("acme", "Backend Engineer", &["rust", "sql"]))
        .with_job_context_name("Acme Backend")
        .with_timestamp(TS)
}

fn options(harness: &TestHarness, workers: usize) -> PipelineOptions {
    let mut options = harness.options(Mode::ProfessionalAnalysis);
    options.batch_workers = Some(workers);
    options
}

#[test]
fn test_batch_extracts_job_profile_once() {
    let harness = TestHarness::new();
    let extractor = Arc::new(ScriptedExtractor::new());
    let collaborators = Collaborators {
        extractor: extractor.clone(),
        ..harness.reference_collaborators()
    };
    let coordinator = BatchCoordinator::new(harness.pipeline(options(&harness, 2), collaborators));
    let log = ProgressLog::default();

    let report = coordinator.run_batch(batch(candidates(3)), &log.reporter()).unwrap();

    assert!(report.overall_success);
    assert_eq!(report.outcome(), BatchOutcome::AllSucceeded);
    assert_eq!(report.summary(), "3 of 3 succeeded");
    assert_eq!(extractor.calls(TargetSchema::JobProfile), 1);
    assert_eq!(extractor.calls(TargetSchema::Resume), 3);

    let folder = report.batch_folder.clone().unwrap();
    assert_eq!(
        folder,
        harness.output_dir.join(format!("batch_comparison_acme_backend_{}", TS))
    );
    assert!(folder.join(format!("acme_backend_{}.json", TS)).exists());
    assert!(folder.join("batch_report.json").exists());

    for result in &report.results {
        let item_folder = result.output_folder.as_ref().unwrap();
        assert!(item_folder.starts_with(&folder));
        assert!(result.handle(ArtifactKind::MatchReport).is_some());
        assert!(result.handle(ArtifactKind::Proposal).is_some());
        // The shared profile is not re-extracted or re-persisted per item.
        assert!(!result.data_files.contains_key(&ArtifactKind::JobProfile));
    }

    let percents = log.percents();
    assert_eq!(percents.first(), Some(&10));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(log.last_state(), Some(ProgressState::Complete));
}

#[test]
fn test_results_keep_submission_order() {
    let harness = TestHarness::new();
    let collaborators = Collaborators {
        extractor: Arc::new(ScriptedExtractor::new().random_latency(1, 30)),
        ..harness.reference_collaborators()
    };
    let coordinator = BatchCoordinator::new(harness.pipeline(options(&harness, 4), collaborators));
    let items = candidates(8);
    let labels: Vec<String> = items.iter().map(|i| i.label.clone()).collect();

    let report = coordinator.run_batch(batch(items), &NoopProgress).unwrap();

    let got: Vec<String> = report.results.iter().map(|r| r.source_label.clone()).collect();
    assert_eq!(got, labels);
    assert!(report.overall_success);
}

#[test]
fn test_panicking_item_gets_crashed_slot() {
    let harness = TestHarness::new();
    let collaborators = Collaborators {
        extractor: Arc::new(ScriptedExtractor::new().panic_on("Explode")),
        ..harness.reference_collaborators()
    };
    let coordinator = BatchCoordinator::new(harness.pipeline(options(&harness, 2), collaborators));
    let mut items = candidates(4);
    items[2] = resume_doc("eve", "Eve Explode", &["Rust"]);

    let report = coordinator.run_batch(batch(items), &NoopProgress).unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.outcome(), BatchOutcome::Partial);
    assert!(!report.overall_success);
    assert_eq!(report.success_count(), 3);

    let crashed = &report.results[2];
    assert!(!crashed.success);
    assert_eq!(crashed.source_label, "eve");
    let error = crashed.error.as_deref().unwrap();
    assert!(error.contains("Task 2 crashed"), "{}", error);
    assert!(error.contains("Explode"), "{}", error);
    assert!(crashed.produced().next().is_none());

    for i in [0, 1, 3] {
        assert!(report.results[i].success, "item {} failed", i);
    }
}

#[test]
fn test_job_profile_failure_skips_every_item() {
    let harness = TestHarness::new();
    let extractor = Arc::new(ScriptedExtractor::new().permanent(TargetSchema::JobProfile));
    let collaborators = Collaborators {
        extractor: extractor.clone(),
        ..harness.reference_collaborators()
    };
    let coordinator = BatchCoordinator::new(harness.pipeline(options(&harness, 2), collaborators));
    let log = ProgressLog::default();

    let report = coordinator.run_batch(batch(candidates(3)), &log.reporter()).unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.outcome(), BatchOutcome::AllFailed);
    let error = report.results[0].error.as_deref().unwrap();
    assert!(error.starts_with("Shared context extraction failed"), "{}", error);
    assert_eq!(extractor.calls(TargetSchema::Resume), 0);
    assert_eq!(log.last_state(), Some(ProgressState::Error));
}

#[test]
fn test_empty_batch() {
    let harness = TestHarness::new();
    let coordinator = BatchCoordinator::new(
        harness.pipeline(options(&harness, 2), harness.reference_collaborators()),
    );
    let log = ProgressLog::default();

    let report = coordinator.run_batch(batch(vec![]), &log.reporter()).unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.outcome(), BatchOutcome::Empty);
    assert!(report.batch_folder.is_none());
    assert!(harness.list_outputs().is_empty());
    assert_eq!(log.last_state(), Some(ProgressState::Complete));
}

#[test]
fn test_all_invalid_items_fail_batch() {
    let harness = TestHarness::new();
    let (collaborators, renderer) = harness.counting_collaborators();
    let coordinator = BatchCoordinator::new(harness.pipeline(options(&harness, 3), collaborators));
    let items = vec![nameless_resume_doc("a"), nameless_resume_doc("b")];
    let log = ProgressLog::default();

    let report = coordinator.run_batch(batch(items), &log.reporter()).unwrap();

    assert_eq!(report.outcome(), BatchOutcome::AllFailed);
    assert_eq!(report.failure_count(), 2);
    assert_eq!(renderer.calls(), 0);
    assert_eq!(log.last_state(), Some(ProgressState::Error));

    let table = report.status_table();
    assert!(table.contains("FAILED"), "{}", table);
}

#[test]
fn test_batch_report_is_written_and_readable() {
    let harness = TestHarness::new();
    let coordinator = BatchCoordinator::new(
        harness.pipeline(options(&harness, 2), harness.reference_collaborators()),
    );

    let report = coordinator.run_batch(batch(candidates(2)), &NoopProgress).unwrap();

    let path = report.batch_folder.as_ref().unwrap().join("batch_report.json");
    let stored: cvforge::BatchReport =
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(stored, report);
}

#[test]
fn test_crash_keeps_its_index_under_random_latency() {
    for round in 0..5 {
        let harness = TestHarness::new();
        let collaborators = Collaborators {
            extractor: Arc::new(
                ScriptedExtractor::new()
                    .random_latency(1, 40)
                    .panic_on("Explode"),
            ),
            ..harness.reference_collaborators()
        };
        let coordinator =
            BatchCoordinator::new(harness.pipeline(options(&harness, 3), collaborators));
        let items = vec![
            resume_doc("first", "Ada Lovelace", &["Rust"]),
            resume_doc("second", "Eve Explode", &["Rust"]),
            resume_doc("third", "Grace Hopper", &["SQL"]),
        ];

        let report = coordinator.run_batch(batch(items), &NoopProgress).unwrap();

        assert_eq!(report.results.len(), 3, "round {}", round);
        let labels: Vec<&str> = report.results.iter().map(|r| r.source_label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second", "third"], "round {}", round);
        assert!(report.results[0].success, "round {}", round);
        assert!(!report.results[1].success, "round {}", round);
        assert!(report.results[2].success, "round {}", round);
        let error = report.results[1].error.as_deref().unwrap();
        assert!(error.contains("Task 1 crashed"), "round {}: {}", round, error);
        assert!(!report.overall_success);
    }
}

#[test]
fn test_reported_item_failure_keeps_its_slot() {
    let harness = TestHarness::new();
    let coordinator = BatchCoordinator::new(
        harness.pipeline(options(&harness, 3), harness.reference_collaborators()),
    );
    let items = vec![
        resume_doc("first", "Ada Lovelace", &["Rust"]),
        cvforge::SourceDocument::from_text("second", "this is not structured data"),
        resume_doc("third", "Grace Hopper", &["SQL"]),
    ];

    let report = coordinator.run_batch(batch(items), &NoopProgress).unwrap();

    let flags: Vec<bool> = report.results.iter().map(|r| r.success).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert!(!report.overall_success);
    assert_eq!(report.outcome(), BatchOutcome::Partial);

    let failed = &report.results[1];
    assert_eq!(failed.source_label, "second");
    let error = failed.error.as_deref().unwrap();
    assert!(error.starts_with("Item extraction failed"), "{}", error);
    assert!(!error.contains("crashed"), "{}", error);
}
