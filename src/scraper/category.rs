use crate::scraper::types::Category;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Ordered (pattern, label) table matched against canonical codes
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![(
        Regex::new(r"(?i)^FC2[-_]?(?:PPV[-_]?)?\d+").expect("Invalid fc2 category regex"),
        Category::FC2,
    )]
});

/// Derives category labels from a code
pub struct Classifier;

impl Classifier {
    /// Every label whose pattern matches the code; empty for ordinary codes
    #[must_use]
    pub fn classify(code: &str) -> BTreeSet<Category> {
        RULES
            .iter()
            .filter(|(pattern, _)| pattern.is_match(code))
            .map(|(_, label)| Category::from(*label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fc2_variants() {
        for code in ["FC2-PPV-1234567", "FC2-1234567", "FC2PPV1234567", "fc2_ppv_123"] {
            let cats = Classifier::classify(code);
            assert_eq!(cats.len(), 1, "{code}");
            assert!(cats.contains(&Category::from(Category::FC2)));
        }
    }

    #[test]
    fn test_plain_codes_have_no_category() {
        assert!(Classifier::classify("ABC-1").is_empty());
        assert!(Classifier::classify("").is_empty());
        assert!(Classifier::classify("XFC2-123").is_empty());
    }
}
