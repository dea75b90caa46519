//! Configuration validation: required settings, cross-field constraints and
//! unknown field detection.

use serde_json::Value;

use super::Config;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "telegram",
    "provider",
    "monitor",
    "schedule",
    "generation",
    "persona",
    "logging",
];

/// Known fields for each section.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("telegram", &["token"]),
    ("provider", &["api_key", "api_base", "model", "timeout_secs"]),
    (
        "monitor",
        &[
            "chat_id",
            "activity_timeout_secs",
            "threshold_min",
            "threshold_max",
            "mention_cooldown_secs",
            "recent_context_size",
            "mention_reply_delay_ms",
        ],
    ),
    ("schedule", &["enabled", "posts", "max_offset_minutes"]),
    (
        "generation",
        &[
            "temperature",
            "joke_max_tokens",
            "quote_max_tokens",
            "comment_max_tokens",
            "mention_max_tokens",
        ],
    ),
    (
        "persona",
        &[
            "system_prompt",
            "joke_prompt",
            "quote_prompt",
            "comment_template",
            "mention_template",
            "joke_fallback",
            "comment_fallback",
            "mention_fallback",
            "canned_quotes",
            "empty_context_placeholder",
            "unknown_user_name",
        ],
    ),
    ("logging", &["format", "level", "file"]),
];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Warn,
    Error,
}

impl Diagnostic {
    fn error(path: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            path: path.to_string(),
            message: message.into(),
        }
    }

    fn warn(path: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| k.to_string())
}

fn unknown_key_diagnostic(path: &str, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest_field(key, known) {
        Some(s) => format!("unknown field (did you mean '{}'?)", s),
        None => "unknown field".to_string(),
    };
    Diagnostic::warn(path, message)
}

/// Report keys in a raw config document that no section understands.
pub fn unknown_field_diagnostics(raw: &Value) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let Some(obj) = raw.as_object() else {
        return out;
    };

    for (key, value) in obj {
        if !KNOWN_TOP_LEVEL.contains(&key.as_str()) {
            out.push(unknown_key_diagnostic(key, key, KNOWN_TOP_LEVEL));
            continue;
        }
        let Some((_, fields)) = KNOWN_SECTIONS.iter().find(|(name, _)| *name == key) else {
            continue;
        };
        if let Some(section) = value.as_object() {
            for field in section.keys() {
                if !fields.contains(&field.as_str()) {
                    let path = format!("{}.{}", key, field);
                    out.push(unknown_key_diagnostic(&path, field, fields));
                }
            }
        }
    }
    out
}

/// Validate required settings and cross-field constraints.
///
/// Returns only error-level diagnostics; an empty list means the config can run.
pub fn validate_config(config: &Config) -> Vec<Diagnostic> {
    let mut errors = Vec::new();

    if config.telegram.token.trim().is_empty() {
        errors.push(Diagnostic::error(
            "telegram.token",
            "bot token is required (BANTERBOT_TELEGRAM_TOKEN)",
        ));
    }
    if config.api_key().is_none() {
        errors.push(Diagnostic::error(
            "provider.api_key",
            "API key is required (BANTERBOT_OPENAI_API_KEY)",
        ));
    }
    if config.provider.model.trim().is_empty() {
        errors.push(Diagnostic::error("provider.model", "model must not be empty"));
    }

    let monitor = &config.monitor;
    if monitor.chat_id.trim().is_empty() {
        errors.push(Diagnostic::error(
            "monitor.chat_id",
            "monitored chat id is required (BANTERBOT_CHAT_ID)",
        ));
    } else if monitor.chat_id.trim().parse::<i64>().is_err() {
        errors.push(Diagnostic::error(
            "monitor.chat_id",
            format!("'{}' is not a numeric chat id", monitor.chat_id),
        ));
    }
    if monitor.activity_timeout_secs == 0 {
        errors.push(Diagnostic::error(
            "monitor.activity_timeout_secs",
            "must be greater than zero",
        ));
    }
    if monitor.threshold_min > monitor.threshold_max {
        errors.push(Diagnostic::error(
            "monitor.threshold_min",
            format!(
                "must not exceed threshold_max ({} > {})",
                monitor.threshold_min, monitor.threshold_max
            ),
        ));
    }
    if monitor.recent_context_size == 0 {
        errors.push(Diagnostic::error(
            "monitor.recent_context_size",
            "must be at least 1",
        ));
    }

    let schedule = &config.schedule;
    if schedule.max_offset_minutes > 59 {
        errors.push(Diagnostic::error(
            "schedule.max_offset_minutes",
            "must be at most 59",
        ));
    }
    for (i, post) in schedule.posts.iter().enumerate() {
        if post.hour > 23 || post.minute > 59 {
            errors.push(Diagnostic::error(
                &format!("schedule.posts[{}]", i),
                format!("{:02}:{:02} is not a valid time of day", post.hour, post.minute),
            ));
        }
    }

    let temperature = config.generation.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(Diagnostic::error(
            "generation.temperature",
            format!("{} is outside [0, 2]", temperature),
        ));
    }

    let persona = &config.persona;
    if !persona.comment_template.contains("{context}") {
        errors.push(Diagnostic::error(
            "persona.comment_template",
            "must contain the {context} placeholder",
        ));
    }
    for placeholder in ["{username}", "{message}"] {
        if !persona.mention_template.contains(placeholder) {
            errors.push(Diagnostic::error(
                "persona.mention_template",
                format!("must contain the {} placeholder", placeholder),
            ));
        }
    }
    let fallbacks = [
        ("persona.joke_fallback", &persona.joke_fallback),
        ("persona.comment_fallback", &persona.comment_fallback),
        ("persona.mention_fallback", &persona.mention_fallback),
    ];
    for (path, text) in fallbacks {
        if text.trim().is_empty() {
            errors.push(Diagnostic::error(path, "fallback text must not be empty"));
        }
    }

    errors
}
