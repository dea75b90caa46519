//! Pattern-based error classification for completion backend errors.
//!
//! Checks patterns in priority order: billing > auth > rate_limit > overloaded > timeout > model.
//! Falls back to `Unknown` if no pattern matches.

use crate::error::ProviderError;

type Ctor = fn(String) -> ProviderError;

/// Substring rules, first match wins. Billing precedes auth because 402
/// bodies often mention the account as well.
const RULES: &[(&[&str], Ctor)] = &[
    (
        &[
            "402",
            "payment required",
            "insufficient credits",
            "credit balance",
            "insufficient balance",
            "billing",
        ],
        ProviderError::Billing,
    ),
    (
        &[
            "invalid_api_key",
            "invalid api key",
            "incorrect api key",
            "authentication",
            "unauthorized",
            "forbidden",
            "401",
            "403",
        ],
        ProviderError::Auth,
    ),
    (
        &[
            "rate_limit",
            "rate limit",
            "too many requests",
            "429",
            "exceeded your current quota",
            "quota exceeded",
            "resource_exhausted",
        ],
        ProviderError::RateLimit,
    ),
    (
        &["overloaded", "server is busy", "capacity"],
        ProviderError::Overloaded,
    ),
    (
        &["timeout", "timed out", "deadline exceeded"],
        ProviderError::Timeout,
    ),
    (
        &["model_not_found", "does not exist", "unknown model"],
        ProviderError::ModelNotFound,
    ),
];

/// Classify a backend error message into a `ProviderError`.
pub fn classify_error_message(msg: &str) -> ProviderError {
    let lower = msg.to_lowercase();
    let ctor = RULES
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| lower.contains(p)))
        .map_or(ProviderError::Unknown as Ctor, |(_, ctor)| *ctor);
    ctor(msg.to_string())
}
