use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const MAX_SUMMARY_CHARS: usize = 600;
const MAX_BULLETS_PER_ROLE: usize = 8;
const ARRAY_SECTIONS: [&str; 3] = ["experience", "education", "skills"];
const BULLET_FIELDS: [&str; 2] = ["highlights", "bullets"];

/// Result of the structural checks on extracted item data.
///
/// `critical` entries stop the pipeline; `informational` entries are passed
/// on to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub critical: Vec<String>,
    pub informational: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.critical.is_empty()
    }

    pub fn to_error(&self) -> Option<ValidationError> {
        if self.is_valid() {
            None
        } else {
            Some(ValidationError::Structural {
                violations: self.critical.clone(),
            })
        }
    }
}

pub fn validate_item(data: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(item) = data.as_object() else {
        report
            .critical
            .push("item data is not a JSON object".to_string());
        return report;
    };

    match item.get("personal_info") {
        Some(Value::Object(info)) => {
            let name = info.get("name").and_then(Value::as_str).map(str::trim);
            if name.map_or(true, str::is_empty) {
                report
                    .critical
                    .push("personal_info.name is missing or empty".to_string());
            }
            check_email(info, &mut report);
        }
        Some(_) => report
            .critical
            .push("personal_info is not an object".to_string()),
        None => report
            .critical
            .push("personal_info.name is missing or empty".to_string()),
    }

    for section in ARRAY_SECTIONS {
        if let Some(value) = item.get(section) {
            if !value.is_array() && !value.is_null() {
                report
                    .critical
                    .push(format!("{} must be an array", section));
            }
        }
    }

    let experience = item.get("experience").and_then(Value::as_array);
    match experience {
        Some(entries) if !entries.is_empty() => {
            for (i, entry) in entries.iter().enumerate() {
                check_experience_entry(i, entry, &mut report);
            }
        }
        _ => report
            .informational
            .push("No professional experience listed".to_string()),
    }

    let has_skills = item
        .get("skills")
        .and_then(Value::as_array)
        .is_some_and(|skills| !skills.is_empty());
    if !has_skills {
        report.informational.push("No skills listed".to_string());
    }

    if let Some(summary) = item.get("summary").and_then(Value::as_str) {
        let length = summary.chars().count();
        if length > MAX_SUMMARY_CHARS {
            report.informational.push(format!(
                "Summary is {} characters long (recommended at most {})",
                length, MAX_SUMMARY_CHARS
            ));
        }
    }

    report
}

fn check_email(info: &serde_json::Map<String, Value>, report: &mut ValidationReport) {
    let email = info
        .get("email")
        .or_else(|| info.get("contact").and_then(|c| c.get("email")))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");

    if email.is_empty() {
        report
            .informational
            .push("No contact email provided".to_string());
    } else if !RE_EMAIL.is_match(email) {
        report
            .informational
            .push(format!("Contact email '{}' looks malformed", email));
    }
}

fn check_experience_entry(index: usize, entry: &Value, report: &mut ValidationReport) {
    let Some(role) = entry.as_object() else {
        report
            .critical
            .push(format!("experience[{}] is not an object", index));
        return;
    };

    for field in ["title", "company"] {
        let present = role
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty());
        if !present {
            report
                .critical
                .push(format!("experience[{}] is missing {}", index, field));
        }
    }

    for field in BULLET_FIELDS {
        if let Some(Value::Array(bullets)) = role.get(field) {
            if bullets.len() > MAX_BULLETS_PER_ROLE {
                report.informational.push(format!(
                    "experience[{}] has {} bullet points (recommended at most {})",
                    index,
                    bullets.len(),
                    MAX_BULLETS_PER_ROLE
                ));
            }
        }
    }
}
