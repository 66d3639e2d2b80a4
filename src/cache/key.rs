//! Cache keys

use std::fmt;

use serde::Serialize;

use crate::dataset::Fingerprint;

/// (combined dataset fingerprint, normalized question)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub question: String,
}

impl CacheKey {
    pub fn new(fingerprint: Fingerprint, question: &str) -> Self {
        Self {
            fingerprint,
            question: normalize_question(question),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.fingerprint.short(), self.question)
    }
}

/// Lowercase, single-spaced, without trailing `?`, `.` or `!`
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['?', '.', '!'])
        .trim_end()
        .to_string()
}
