//! File-based reference collaborators.
//!
//! These make the engine usable without an external model service: sources
//! are expected to already be JSON (job profiles may also be plain text), and
//! rendering writes JSON / minimal HTML. Output quality is not a goal here.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::path::Path;

use serde_json::{json, Value};

use crate::artifact::{ArtifactHandle, ArtifactKind};
use crate::error::CollaboratorError;
use crate::storage::FileStorage;

use super::{
    DashboardInput, DashboardRenderer, DocumentRenderer, ExtractionRequest, Extractor,
    RenderRequest, TargetSchema,
};

const KEYWORD_FIELDS: &[&str] = &["skills", "requirements", "keywords", "technologies"];

/// Parses JSON sources and derives naive match, feedback and cover-letter
/// records from them.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, CollaboratorError> {
        match request.schema {
            TargetSchema::Resume => parse_object(request.source),
            TargetSchema::JobProfile => Ok(parse_object(request.source)
                .unwrap_or_else(|_| job_profile_from_text(request.source))),
            TargetSchema::MatchReport => {
                let item = parse_object(request.source)?;
                let context = request.context.ok_or_else(|| {
                    CollaboratorError::permanent("match report requires a job profile")
                })?;
                Ok(match_report(&item, context))
            }
            TargetSchema::Feedback => {
                let item = parse_object(request.source)?;
                Ok(feedback_report(&item, &request.settings.language))
            }
            TargetSchema::CoverLetter => {
                let input = parse_object(request.source)?;
                Ok(cover_letter(&input, request.context))
            }
        }
    }
}

fn parse_object(source: &str) -> Result<Value, CollaboratorError> {
    let value: Value = serde_json::from_str(source)
        .map_err(|e| CollaboratorError::permanent(format!("source is not valid JSON: {}", e)))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CollaboratorError::permanent("source JSON is not an object"))
    }
}

fn job_profile_from_text(text: &str) -> Value {
    let title = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Untitled position");

    let keywords: BTreeSet<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|word| word.len() > 2)
        .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
        .map(str::to_lowercase)
        .collect();

    json!({
        "title": title,
        "description": text.trim(),
        "keywords": keywords.into_iter().collect::<Vec<_>>(),
    })
}

fn collect_keywords(value: &Value) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    for field in KEYWORD_FIELDS {
        if let Some(Value::Array(entries)) = value.get(field) {
            for entry in entries {
                let word = match entry {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("name").and_then(Value::as_str),
                    _ => None,
                };
                if let Some(word) = word {
                    keywords.insert(word.trim().to_lowercase());
                }
            }
        }
    }
    keywords.remove("");
    keywords
}

fn match_report(item: &Value, context: &Value) -> Value {
    let offered = collect_keywords(item);
    let wanted = collect_keywords(context);

    let matched: Vec<&String> = wanted.intersection(&offered).collect();
    let missing: Vec<&String> = wanted.difference(&offered).collect();
    let score = if wanted.is_empty() {
        0
    } else {
        (matched.len() * 100) / wanted.len()
    };

    json!({
        "position": context.get("title").cloned().unwrap_or(Value::Null),
        "score": score,
        "matched_keywords": matched,
        "missing_keywords": missing,
    })
}

fn feedback_report(item: &Value, language: &str) -> Value {
    let mut strengths = Vec::new();
    let mut suggestions = Vec::new();

    let experience = item
        .get("experience")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if experience > 0 {
        strengths.push(format!("{} role(s) listed", experience));
    } else {
        suggestions.push("Add at least one professional experience entry".to_string());
    }

    let skills = collect_keywords(item).len();
    if skills >= 5 {
        strengths.push(format!("{} skills listed", skills));
    } else {
        suggestions.push("List more concrete skills".to_string());
    }

    match item.get("summary").and_then(Value::as_str) {
        Some(summary) if !summary.trim().is_empty() => {
            strengths.push("Includes a professional summary".to_string())
        }
        _ => suggestions.push("Add a short professional summary".to_string()),
    }

    json!({
        "language": language,
        "strengths": strengths,
        "suggestions": suggestions,
    })
}

fn cover_letter(input: &Value, context: Option<&Value>) -> Value {
    let name = input
        .pointer("/item/personal_info/name")
        .and_then(Value::as_str)
        .unwrap_or("Applicant");
    let position = context
        .and_then(|c| c.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("the advertised position");
    let matched: Vec<String> = input
        .pointer("/match/matched_keywords")
        .and_then(Value::as_array)
        .map(|words| {
            words
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut body = format!("I am writing to apply for {}.", position);
    if !matched.is_empty() {
        let _ = write!(body, " My background covers {}.", matched.join(", "));
    }

    json!({
        "greeting": "Dear Hiring Team,",
        "body": body,
        "closing": format!("Kind regards,\n{}", name),
    })
}

/// Writes the structured data itself as the "formatted" document.
#[derive(Debug, Clone)]
pub struct JsonDocumentRenderer {
    storage: FileStorage,
}

impl JsonDocumentRenderer {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            storage: FileStorage::new(output_directory),
        }
    }
}

impl DocumentRenderer for JsonDocumentRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<ArtifactHandle, CollaboratorError> {
        let document = json!({
            "kind": request.kind,
            "style": request.settings.style_preset,
            "language": request.settings.language,
            "content": request.data,
        });
        let path = self
            .storage
            .write_json(request.output_path, &document)
            .map_err(|e| CollaboratorError::permanent(e.to_string()))?;
        Ok(ArtifactHandle::new(request.kind, path))
    }
}

/// Writes a minimal HTML overview of whatever sections are available.
#[derive(Debug, Clone)]
pub struct HtmlDashboardRenderer {
    storage: FileStorage,
}

impl HtmlDashboardRenderer {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            storage: FileStorage::new(output_directory),
        }
    }
}

impl DashboardRenderer for HtmlDashboardRenderer {
    fn render(&self, input: &DashboardInput<'_>) -> Result<ArtifactHandle, CollaboratorError> {
        let meta = input.metadata;
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">");
        let _ = writeln!(html, "<title>{}</title></head>\n<body>", escape(&meta.candidate));
        let _ = writeln!(html, "<h1>{}</h1>", escape(&meta.candidate));
        if let Some(job) = &meta.job_context {
            let _ = writeln!(html, "<p class=\"job\">{}</p>", escape(job));
        }
        let _ = writeln!(
            html,
            "<p class=\"meta\">{} &middot; {}</p>",
            escape(meta.mode.as_str()),
            escape(&meta.timestamp)
        );

        push_section(&mut html, "Profile", Some(input.item));
        push_section(&mut html, "Match", input.match_data);
        push_section(&mut html, "Feedback", input.feedback);
        push_section(&mut html, "Proposal", input.proposal);

        if !meta.informational.is_empty() {
            html.push_str("<h2>Notes</h2>\n<ul>\n");
            for note in &meta.informational {
                let _ = writeln!(html, "<li>{}</li>", escape(note));
            }
            html.push_str("</ul>\n");
        }
        if !meta.unavailable.is_empty() {
            html.push_str("<h2>Unavailable</h2>\n<ul>\n");
            for entry in &meta.unavailable {
                let _ = writeln!(html, "<li>{}</li>", escape(entry));
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</body>\n</html>\n");

        let path = self
            .storage
            .write_bytes(input.output_path, html.as_bytes())
            .map_err(|e| CollaboratorError::permanent(e.to_string()))?;
        Ok(ArtifactHandle::new(ArtifactKind::Dashboard, path))
    }
}

fn push_section(html: &mut String, title: &str, data: Option<&Value>) {
    let Some(data) = data else { return };
    let _ = writeln!(html, "<h2>{}</h2>", title);
    let pretty = serde_json::to_string_pretty(data).unwrap_or_default();
    let _ = writeln!(html, "<pre>{}</pre>", escape(&pretty));
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
