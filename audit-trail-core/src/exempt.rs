//! Exemption matching for request paths

use crate::error::AuditError;
use regex::Regex;

/// Compiled set of exemption patterns.
///
/// Patterns are compiled once at startup; requests whose path matches any
/// of them are never audited. Matching uses search semantics against the
/// path with leading slashes stripped, so configured patterns should not
/// include them (e.g. `r"^health"`, not `r"^/health"`).
#[derive(Debug, Default)]
pub struct ExemptionMatcher {
    patterns: Vec<Regex>,
}

impl ExemptionMatcher {
    /// Compile every pattern up front. The first invalid pattern aborts
    /// construction; per-request matching can no longer fail.
    pub fn new<I, S>(patterns: I) -> Result<Self, AuditError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| AuditError::InvalidExemptPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    /// Matcher that exempts nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a request path is exempt from auditing.
    pub fn is_exempt(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.patterns.iter().any(|regex| regex.is_match(path))
    }
}
