use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::collab::SourceDocument;
use crate::error::CvforgeError;
use crate::naming::NamingContext;
use crate::pipeline::{
    ItemRequest, NoopProgress, Pipeline, PipelineResult, ProgressEvent, ProgressReporter,
    SharedContext,
};
use crate::sanitize;
use crate::worker::{TaskOutcome, WorkerPool};

use super::report::BatchReport;

const REPORT_FILE_NAME: &str = "batch_report.json";

/// Many items compared against one target document.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub items: Vec<SourceDocument>,
    pub target: SourceDocument,
    /// Defaults to the target label.
    pub job_context_name: Option<String>,
    pub timestamp: Option<String>,
}

impl BatchRequest {
    pub fn new(items: Vec<SourceDocument>, target: SourceDocument) -> Self {
        Self {
            items,
            target,
            job_context_name: None,
            timestamp: None,
        }
    }

    pub fn with_job_context_name(mut self, name: &str) -> Self {
        self.job_context_name = Some(name.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }
}

/// Extracts the shared job profile once, then runs one pipeline per item
/// on a bounded pool and collects results in submission order.
pub struct BatchCoordinator {
    pipeline: Arc<Pipeline>,
}

impl BatchCoordinator {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Fails only when the batch cannot be named; every item-level problem
    /// ends up inside the report.
    pub fn run_batch(
        &self,
        request: BatchRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport, CvforgeError> {
        let BatchRequest {
            items,
            target,
            job_context_name,
            timestamp,
        } = request;

        let job_context = job_context_name.unwrap_or_else(|| target.label.clone());
        let mut naming = NamingContext::new(self.pipeline.options().mode, "", &job_context)
            .batch(true);
        naming.timestamp = timestamp;
        let paths = self.pipeline.resolver().resolve(&naming)?;

        let _batch_span = info_span!("batch",
            items = items.len(),
            job_context = %job_context,
            timestamp = %paths.timestamp,
        )
        .entered();

        if items.is_empty() {
            info!("Empty batch, nothing to do");
            progress.report(ProgressEvent::complete("No items to process"));
            return Ok(BatchReport::new(vec![], None, &job_context, &paths.timestamp));
        }

        // Shared context: a failure here stops the whole batch.
        let data = match self.pipeline.extract_shared_context(&target) {
            Ok(data) => data,
            Err(e) => {
                error!("Shared context extraction failed, skipping all items: {}", e);
                let failure = PipelineResult::failure(
                    &target.label,
                    format!("Shared context extraction failed: {}", e),
                );
                progress.report(ProgressEvent::error(100, failure.error.clone().unwrap_or_default()));
                return Ok(BatchReport::new(
                    vec![failure],
                    paths.batch_folder.clone(),
                    &job_context,
                    &paths.timestamp,
                ));
            }
        };

        let mut shared = SharedContext::new(&job_context, data);
        if let Some(path) = &paths.shared_context_file {
            match self.pipeline.storage().write_json(path, &shared.data) {
                Ok(written) => {
                    debug!("Stored shared context -> {}", sanitize::file_name(&written));
                    shared.persisted_path = Some(written);
                }
                Err(e) => warn!("Shared context was not saved: {}", e),
            }
        }
        let shared = Arc::new(shared);
        progress.report(ProgressEvent::running(10, "Job profile extracted"));

        let total = items.len();
        let labels: Vec<String> = items.iter().map(|item| item.label.clone()).collect();
        let worker_count = self.pipeline.options().batch_worker_count().min(total);
        let mut pool: WorkerPool<PipelineResult> = WorkerPool::new("batch", worker_count)?;

        info!("Dispatching {} items to {} workers", total, worker_count);

        let mut dispatch_error = None;
        for item in items {
            let pipeline = Arc::clone(&self.pipeline);
            let label = item.label.clone();
            let item_request = ItemRequest::new(item)
                .with_job_context_name(&job_context)
                .with_shared_context(Arc::clone(&shared))
                .with_timestamp(&paths.timestamp)
                .in_batch();

            let submitted = pool.submit(move || match pipeline.prepare(item_request) {
                Ok(ctx) => pipeline.run(ctx, &NoopProgress).0,
                Err(e) => PipelineResult::failure(&label, e.to_string()),
            });
            if let Err(e) = submitted {
                error!("Failed to dispatch batch item: {}", e);
                dispatch_error = Some(e.to_string());
                break;
            }
        }

        let mut settled = 0;
        let outcomes = pool.join_with(|index, outcome| {
            settled += 1;
            debug!(index, completed = outcome.is_completed(), "Batch item settled");
            let percent = 10 + (80 * settled / total) as u8;
            progress.report(ProgressEvent::running(
                percent,
                format!("Processed {} of {} items", settled, total),
            ));
        });

        let mut results: Vec<PipelineResult> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                TaskOutcome::Completed(result) => result,
                TaskOutcome::Panicked(message) => {
                    PipelineResult::crashed(index, &labels[index], &message)
                }
            })
            .collect();

        // Items never handed to a worker still get a slot each.
        let reason = dispatch_error.unwrap_or_else(|| "item was not dispatched".to_string());
        for label in labels.iter().skip(results.len()) {
            results.push(PipelineResult::failure(label, reason.clone()));
        }

        let report = BatchReport::new(
            results,
            paths.batch_folder.clone(),
            &shared.label,
            &paths.timestamp,
        );

        if let Some(folder) = &report.batch_folder {
            if let Err(e) = self
                .pipeline
                .storage()
                .write_json(&folder.join(REPORT_FILE_NAME), &report)
            {
                warn!("Batch report was not saved: {}", e);
            }
        }

        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Batch finished"
        );
        let summary = report.summary();
        if report.success_count() == 0 {
            progress.report(ProgressEvent::error(100, summary));
        } else {
            progress.report(ProgressEvent::complete(summary));
        }

        Ok(report)
    }
}
