//! Builders for source documents and scripted collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};

use cvforge::collab::{
    DocumentRenderer, ExtractionRequest, Extractor, JsonDocumentRenderer, JsonExtractor,
    RenderRequest,
};
use cvforge::{ArtifactHandle, ArtifactKind, CollaboratorError, SourceDocument, TargetSchema};

/// Structured résumé as the reference extractor expects it.
pub fn resume_value(name: &str, skills: &[&str]) -> Value {
    json!({
        "personal_info": {
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        },
        "summary": format!("{} builds backend systems.", name),
        "skills": skills,
        "experience": [
            {
                "title": "Engineer",
                "company": "Initech",
                "highlights": ["Shipped things", "Fixed things"]
            }
        ],
        "education": [],
    })
}

pub fn resume_doc(label: &str, name: &str, skills: &[&str]) -> SourceDocument {
    SourceDocument::from_text(label, &resume_value(name, skills).to_string())
}

pub fn job_value(title: &str, requirements: &[&str]) -> Value {
    json!({
        "title": title,
        "company": "Acme",
        "requirements": requirements,
    })
}

pub fn job_doc(label: &str, title: &str, requirements: &[&str]) -> SourceDocument {
    SourceDocument::from_text(label, &job_value(title, requirements).to_string())
}

/// Item data that fails structural validation (no name).
pub fn nameless_resume_doc(label: &str) -> SourceDocument {
    let data = json!({
        "personal_info": { "email": "someone@example.com" },
        "skills": ["rust"],
    });
    SourceDocument::from_text(label, &data.to_string())
}

/// Wraps [`JsonExtractor`] with scripted failures, latency and panics.
#[derive(Default)]
pub struct ScriptedExtractor {
    inner: JsonExtractor,
    transient: Mutex<HashMap<TargetSchema, u32>>,
    permanent: HashSet<TargetSchema>,
    latency_ms: Option<(u64, u64)>,
    panic_marker: Option<String>,
    calls: Mutex<HashMap<TargetSchema, usize>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls for `schema` with a transient error.
    pub fn transient(self, schema: TargetSchema, times: u32) -> Self {
        self.transient.lock().unwrap().insert(schema, times);
        self
    }

    /// Always fail `schema` with a permanent error.
    pub fn permanent(mut self, schema: TargetSchema) -> Self {
        self.permanent.insert(schema);
        self
    }

    /// Sleep a random number of milliseconds in `min..=max` per call.
    pub fn random_latency(mut self, min: u64, max: u64) -> Self {
        self.latency_ms = Some((min, max));
        self
    }

    /// Panic while extracting any résumé whose text contains `marker`.
    pub fn panic_on(mut self, marker: &str) -> Self {
        self.panic_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self, schema: TargetSchema) -> usize {
        self.calls.lock().unwrap().get(&schema).copied().unwrap_or(0)
    }
}

impl Extractor for ScriptedExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, CollaboratorError> {
        *self.calls.lock().unwrap().entry(request.schema).or_insert(0) += 1;

        if let Some((min, max)) = self.latency_ms {
            let millis = rand::thread_rng().gen_range(min..=max);
            thread::sleep(Duration::from_millis(millis));
        }

        if let Some(marker) = &self.panic_marker {
            if request.schema == TargetSchema::Resume && request.source.contains(marker.as_str()) {
                panic!("extractor blew up on {}", marker);
            }
        }

        if self.permanent.contains(&request.schema) {
            return Err(CollaboratorError::permanent(format!(
                "{} is not supported",
                request.schema
            )));
        }

        {
            let mut transient = self.transient.lock().unwrap();
            if let Some(remaining) = transient.get_mut(&request.schema) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(CollaboratorError::transient("rate limited"));
                }
            }
        }

        self.inner.extract(request)
    }
}

/// [`JsonDocumentRenderer`] that counts calls and can fail one artifact kind.
pub struct CountingRenderer {
    inner: JsonDocumentRenderer,
    calls: AtomicUsize,
    fail_kind: Option<ArtifactKind>,
}

impl CountingRenderer {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            inner: JsonDocumentRenderer::new(output_directory),
            calls: AtomicUsize::new(0),
            fail_kind: None,
        }
    }

    pub fn failing_on<P: AsRef<Path>>(output_directory: P, kind: ArtifactKind) -> Self {
        Self {
            fail_kind: Some(kind),
            ..Self::new(output_directory)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentRenderer for CountingRenderer {
    fn extension(&self) -> &str {
        self.inner.extension()
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<ArtifactHandle, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_kind == Some(request.kind) {
            return Err(CollaboratorError::permanent(format!(
                "template for {} is broken",
                request.kind
            )));
        }
        self.inner.render(request)
    }
}

/// [`JsonDocumentRenderer`] that stalls before rendering one artifact kind.
pub struct StallingRenderer {
    inner: JsonDocumentRenderer,
    stall_kind: ArtifactKind,
    stall: Duration,
}

impl StallingRenderer {
    pub fn new<P: AsRef<Path>>(output_directory: P, stall_kind: ArtifactKind, stall: Duration) -> Self {
        Self {
            inner: JsonDocumentRenderer::new(output_directory),
            stall_kind,
            stall,
        }
    }
}

impl DocumentRenderer for StallingRenderer {
    fn extension(&self) -> &str {
        self.inner.extension()
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<ArtifactHandle, CollaboratorError> {
        if request.kind == self.stall_kind {
            thread::sleep(self.stall);
        }
        self.inner.render(request)
    }
}
