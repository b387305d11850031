use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Longest token a name is allowed to contribute to a path component.
pub const MAX_TOKEN_LENGTH: usize = 50;

pub const CANDIDATE_FALLBACK: &str = "candidate";
pub const JOB_CONTEXT_FALLBACK: &str = "jobprofile";
pub const ARTIFACT_FALLBACK: &str = "artifact";

/// Reduces a display name to a path-safe `[a-z0-9_]` token.
///
/// Accents are folded (`Müller` → `muller`), every other character outside
/// `[a-z0-9]` becomes `_`, runs of `_` collapse, the result is cut to
/// [`MAX_TOKEN_LENGTH`] and stripped of edge underscores. An empty result
/// yields `fallback`.
pub fn sanitize_token(raw: &str, fallback: &str) -> String {
    let folded = raw
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>();

    let mut token = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' && token.ends_with('_') {
            continue;
        }
        token.push(c);
    }

    // Only ASCII remains, so byte truncation is safe.
    token.truncate(MAX_TOKEN_LENGTH);
    let token = token.trim_matches('_');

    if token.is_empty() {
        fallback.to_string()
    } else {
        token.to_string()
    }
}
