//! Transient-failure classification for retry decisions.
//!
//! This module provides the [`TransientClassifier`] trait and the default
//! keyword-based implementation that decides whether a failed operation is
//! worth retrying.

use std::sync::Arc;

/// Keywords marking an error as likely to succeed on retry.
///
/// Matching is a case-insensitive substring test against the error's
/// `Display` output, so error message wording is part of the contract.
pub const TRANSIENT_KEYWORDS: [&str; 7] = [
    "timeout",
    "connection",
    "network",
    "socket",
    "unavailable",
    "temporary",
    "overloaded",
];

/// Trait for deciding whether a failure is transient.
///
/// Transient failures are eligible for retry; everything else propagates to
/// the caller immediately.
pub trait TransientClassifier: Send + Sync {
    /// Returns `true` if the error message describes a transient failure.
    fn is_transient(&self, message: &str) -> bool;
}

/// Default classifier: matches [`TRANSIENT_KEYWORDS`] as case-insensitive
/// substrings.
///
/// # Example
///
/// ```rust
/// use floodgate_resilience::classifier::{KeywordClassifier, TransientClassifier};
///
/// let classifier = KeywordClassifier;
/// assert!(classifier.is_transient("Connection refused by backend"));
/// assert!(classifier.is_transient("statement timeout"));
/// assert!(!classifier.is_transient("duplicate key value"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl TransientClassifier for KeywordClassifier {
    fn is_transient(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        TRANSIENT_KEYWORDS
            .iter()
            .any(|keyword| lower.contains(keyword))
    }
}

/// A classifier backed by a closure, for callers with their own taxonomy.
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> TransientClassifier for FnClassifier<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_transient(&self, message: &str) -> bool {
        (self.f)(message)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
