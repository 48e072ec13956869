//! Error-string analysis: status extraction, categorization, remediation,
//! transience, severity, and pattern grouping.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use vigil_types::{sha256_hex_prefix, ErrorPattern, ErrorPatternCategory};

/// Hex length of an error pattern hash.
const PATTERN_HASH_LEN: usize = 16;

/// HTTP-flavored error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpErrorCategory {
    ClientErrorValidation,
    ClientErrorAuth,
    ClientErrorNotFound,
    ClientErrorConflict,
    ClientErrorRateLimit,
    ServerError,
    Unknown,
}

/// How bad the failure is for the tool's consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Everything extracted from one raw error string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub category: HttpErrorCategory,
    pub root_cause: String,
    pub remediation: String,
    pub related_parameters: Vec<String>,
    pub transient: bool,
    pub severity: ErrorSeverity,
}

// Ordered status patterns: explicit forms first, the bare 4xx/5xx form last
// and only with a trailing status word, so three-digit substrings inside
// URLs and identifiers never match.
static STATUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bstatus(?:\s+code)?[:\s]+(\d{3})\b",
        r"(?i)\bHTTP[:\s]+(\d{3})\b",
        r"(?i)\berror[:\s]+(\d{3})\b",
        r"\[(\d{3})\]",
        r"\((\d{3})\)",
        r"(?i)\b([45]\d{2})\b\s+(?:error|bad|not|forbidden|unauthorized|internal)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("status pattern is valid"))
    .collect()
});

static QUOTED_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"`]([A-Za-z_][A-Za-z0-9_]*)['"`]"#).expect("quoted ident pattern is valid")
});

static NAMED_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:parameter|field|argument|property)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("named param pattern is valid")
});

static UUID_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("uuid pattern is valid")
});

static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("quoted literal pattern is valid"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run pattern is valid"));

const TRANSIENT_KEYWORDS: [&str; 11] = [
    "timeout",
    "temporarily",
    "retry",
    "unavailable",
    "connection",
    "network",
    "too many requests",
    "try again",
    "overloaded",
    "busy",
    "maintenance",
];

const PARAMETER_STOP_WORDS: [&str; 16] = [
    "the", "a", "an", "this", "that", "is", "was", "be", "not", "error", "invalid", "missing",
    "required", "value", "null", "true",
];

/// Run the full analysis pipeline over one raw error string.
pub fn analyze_error(message: &str) -> ErrorAnalysis {
    let lower = message.to_lowercase();
    let http_status = extract_http_status(message);
    let category = categorize(http_status, &lower);
    let (root_cause, remediation) = explain(category, &lower);
    let related_parameters = extract_parameters(message);
    let transient = is_transient(category, &lower);
    let severity = classify_severity(category, &lower);

    ErrorAnalysis {
        http_status,
        category,
        root_cause,
        remediation,
        related_parameters,
        transient,
        severity,
    }
}

/// Extract the first plausible 3-digit HTTP status.
pub fn extract_http_status(message: &str) -> Option<u16> {
    for pattern in STATUS_PATTERNS.iter() {
        for captures in pattern.captures_iter(message) {
            if let Some(code) = captures.get(1).and_then(|m| m.as_str().parse::<u16>().ok()) {
                if (100..600).contains(&code) {
                    return Some(code);
                }
            }
        }
    }
    None
}

fn categorize(status: Option<u16>, lower: &str) -> HttpErrorCategory {
    if let Some(status) = status {
        return match status {
            401 | 403 => HttpErrorCategory::ClientErrorAuth,
            404 | 410 => HttpErrorCategory::ClientErrorNotFound,
            409 => HttpErrorCategory::ClientErrorConflict,
            429 => HttpErrorCategory::ClientErrorRateLimit,
            400..=499 => HttpErrorCategory::ClientErrorValidation,
            500..=599 => HttpErrorCategory::ServerError,
            _ => HttpErrorCategory::Unknown,
        };
    }

    if lower.contains("unauthorized") || lower.contains("forbidden") || lower.contains("permission")
    {
        HttpErrorCategory::ClientErrorAuth
    } else if lower.contains("not found") || lower.contains("does not exist") {
        HttpErrorCategory::ClientErrorNotFound
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        HttpErrorCategory::ClientErrorRateLimit
    } else if lower.contains("already exists")
        || lower.contains("conflict")
        || lower.contains("duplicate")
    {
        HttpErrorCategory::ClientErrorConflict
    } else if lower.contains("invalid")
        || lower.contains("validation")
        || lower.contains("required")
        || lower.contains("must be")
    {
        HttpErrorCategory::ClientErrorValidation
    } else if lower.contains("internal") || lower.contains("server error") {
        HttpErrorCategory::ServerError
    } else {
        HttpErrorCategory::Unknown
    }
}

/// Derive a root cause and remediation: specific keywords first, category
/// defaults as fallback.
fn explain(category: HttpErrorCategory, lower: &str) -> (String, String) {
    if lower.contains("timeout") || lower.contains("timed out") {
        return (
            "the operation exceeded its time limit".into(),
            "increase the timeout or retry when the server is less loaded".into(),
        );
    }
    if lower.contains("rate limit") || lower.contains("too many requests") {
        return (
            "the server is throttling requests".into(),
            "retry with exponential backoff and reduce the request rate".into(),
        );
    }
    if lower.contains("required") || lower.contains("missing") {
        return (
            "a required input was not supplied".into(),
            "supply the missing parameter".into(),
        );
    }

    match category {
        HttpErrorCategory::ClientErrorValidation => (
            "the request arguments were rejected".into(),
            "check argument types and constraints against the tool schema".into(),
        ),
        HttpErrorCategory::ClientErrorAuth => (
            "the credentials were rejected or lack access".into(),
            "verify credentials and granted scopes".into(),
        ),
        HttpErrorCategory::ClientErrorNotFound => (
            "the referenced entity does not exist".into(),
            "verify the identifier before calling".into(),
        ),
        HttpErrorCategory::ClientErrorConflict => (
            "the request conflicts with current state".into(),
            "re-read the current state and retry the operation".into(),
        ),
        HttpErrorCategory::ClientErrorRateLimit => (
            "the server is throttling requests".into(),
            "retry with exponential backoff and reduce the request rate".into(),
        ),
        HttpErrorCategory::ServerError => (
            "the server failed internally".into(),
            "retry later; report to the server maintainer if it persists".into(),
        ),
        HttpErrorCategory::Unknown => (
            "the failure mode could not be classified".into(),
            "inspect the raw error message".into(),
        ),
    }
}

/// Candidate parameter names from quoted identifiers and `parameter X`
/// shapes, filtered against a short stop-word list.
fn extract_parameters(message: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let candidates = QUOTED_IDENT
        .captures_iter(message)
        .chain(NAMED_PARAM.captures_iter(message))
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()));
    for candidate in candidates {
        let lower = candidate.to_lowercase();
        if PARAMETER_STOP_WORDS.contains(&lower.as_str()) {
            continue;
        }
        if !parameters.contains(&candidate) {
            parameters.push(candidate);
        }
    }
    parameters
}

fn is_transient(category: HttpErrorCategory, lower: &str) -> bool {
    matches!(
        category,
        HttpErrorCategory::ClientErrorRateLimit | HttpErrorCategory::ServerError
    ) || TRANSIENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn classify_severity(category: HttpErrorCategory, lower: &str) -> ErrorSeverity {
    if lower.contains("fatal") || lower.contains("crash") || lower.contains("corrupt") {
        return ErrorSeverity::Critical;
    }
    match category {
        HttpErrorCategory::ServerError | HttpErrorCategory::ClientErrorAuth => ErrorSeverity::High,
        HttpErrorCategory::ClientErrorValidation | HttpErrorCategory::ClientErrorConflict => {
            ErrorSeverity::Medium
        }
        HttpErrorCategory::ClientErrorNotFound | HttpErrorCategory::ClientErrorRateLimit => {
            ErrorSeverity::Low
        }
        HttpErrorCategory::Unknown => ErrorSeverity::Info,
    }
}

/// Normalize a message for pattern grouping: UUIDs become `U`, quoted
/// literals become `""`, digit runs become `N`.
pub fn normalize_message(message: &str) -> String {
    let no_uuids = UUID_SPAN.replace_all(message, "U");
    let no_quotes = QUOTED_LITERAL.replace_all(&no_uuids, "\"\"");
    DIGIT_RUN.replace_all(&no_quotes, "N").into_owned()
}

/// Map the HTTP-flavored category onto the coarser pattern vocabulary.
///
/// A message that smells like a timeout is grouped under timeout whatever
/// its status said; rate limiting without that signal stays unknown rather
/// than being forced into an ill-fitting bucket.
fn pattern_category(category: HttpErrorCategory, lower: &str) -> ErrorPatternCategory {
    if lower.contains("timeout") || lower.contains("timed out") {
        return ErrorPatternCategory::Timeout;
    }
    match category {
        HttpErrorCategory::ClientErrorValidation | HttpErrorCategory::ClientErrorConflict => {
            ErrorPatternCategory::Validation
        }
        HttpErrorCategory::ClientErrorAuth => ErrorPatternCategory::Permission,
        HttpErrorCategory::ClientErrorNotFound => ErrorPatternCategory::NotFound,
        HttpErrorCategory::ServerError => ErrorPatternCategory::Internal,
        HttpErrorCategory::ClientErrorRateLimit | HttpErrorCategory::Unknown => {
            ErrorPatternCategory::Unknown
        }
    }
}

/// Group raw error messages into patterns by `(category, normalized hash)`.
pub fn group_error_patterns(messages: &[String]) -> Vec<ErrorPattern> {
    let mut patterns: Vec<ErrorPattern> = Vec::new();
    for message in messages {
        let lower = message.to_lowercase();
        let analysis_category = categorize(extract_http_status(message), &lower);
        let category = pattern_category(analysis_category, &lower);
        let pattern_hash = sha256_hex_prefix(&normalize_message(message), PATTERN_HASH_LEN);

        match patterns
            .iter_mut()
            .find(|p| p.category == category && p.pattern_hash == pattern_hash)
        {
            Some(existing) => existing.count += 1,
            None => patterns.push(ErrorPattern {
                category,
                pattern_hash,
                example: message.clone(),
                count: 1,
            }),
        }
    }
    patterns
}
