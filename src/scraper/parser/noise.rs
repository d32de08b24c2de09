use crate::scraper::{Result, ScraperError};
use fancy_regex::Regex;
use tracing::warn;

/// A configured (pattern, replacement) rule applied before extraction.
///
/// Patterns are compiled with `fancy_regex` so look-around assertions work.
#[derive(Debug, Clone)]
pub struct NoiseRule {
    pattern: Regex,
    replacement: String,
}

impl NoiseRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            ScraperError::Config(format!("invalid noise pattern `{pattern}`: {e}"))
        })?;

        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Build rules from raw `[pattern, replacement]` pairs
    pub fn from_pairs<S: AsRef<str>>(pairs: &[Vec<S>]) -> Result<Vec<Self>> {
        pairs
            .iter()
            .map(|pair| match pair.as_slice() {
                [pattern, replacement] => Self::new(pattern.as_ref(), replacement.as_ref()),
                _ => Err(ScraperError::Config(format!(
                    "noise rule must be a [pattern, replacement] pair, got {} items",
                    pair.len()
                ))),
            })
            .collect()
    }

    /// Replace every match; a matcher failure leaves the input untouched
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        match self
            .pattern
            .try_replacen(input, 0, self.replacement.as_str())
        {
            Ok(out) => out.into_owned(),
            Err(e) => {
                warn!(pattern = self.pattern.as_str(), "noise rule failed: {}", e);
                input.to_string()
            }
        }
    }
}
