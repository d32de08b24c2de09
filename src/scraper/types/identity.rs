use crate::scraper::category::Classifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque classification label derived from a code (e.g. `FC2`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const FC2: &'static str = "FC2";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Structured identity extracted from a filename
///
/// The category is a pure function of the code, so both are only reachable
/// through accessors. An empty code is a valid, unresolved identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    code: String,
    /// Episode marker, a digit run or a single upper-case letter
    pub episode: Option<String>,
    pub is_chinese_subtitle: bool,
    pub is_uncensored: bool,
    pub is_4k: bool,
    pub is_leaked: bool,
    pub is_cracked: bool,
    category: BTreeSet<Category>,
}

impl Identity {
    /// Create an identity for a code; the code is upper-cased and classified
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into().to_uppercase();
        let category = Classifier::classify(&code);
        Self {
            code,
            episode: None,
            is_chinese_subtitle: false,
            is_uncensored: false,
            is_4k: false,
            is_leaked: false,
            is_cracked: false,
            category,
        }
    }

    #[must_use]
    pub fn with_episode(mut self, episode: impl Into<String>) -> Self {
        self.episode = Some(episode.into());
        self
    }

    #[must_use]
    pub fn with_chinese_subtitle(mut self, value: bool) -> Self {
        self.is_chinese_subtitle = value;
        self
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub const fn category(&self) -> &BTreeSet<Category> {
        &self.category
    }

    #[must_use]
    pub fn has_category(&self, label: &str) -> bool {
        self.category.iter().any(|c| c.as_str() == label)
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.code.is_empty()
    }

    #[must_use]
    pub fn episode_is(&self, value: &str) -> bool {
        self.episode.as_deref() == Some(value)
    }

    /// Code with `-` and `_` removed, used for loose comparisons
    #[must_use]
    pub fn clean_id(&self) -> String {
        clean_id(&self.code)
    }

    /// Base name for exported files: the code plus flag suffixes
    #[must_use]
    pub fn file_name_base(&self) -> String {
        let mut base = self.code.clone();
        if self.is_4k {
            base.push_str("-4K");
        }
        if self.is_chinese_subtitle {
            base.push_str("-C");
        }
        if self.is_leaked {
            base.push_str("-LEAK");
        }
        base
    }

    /// Tag labels describing the set flags
    #[must_use]
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::with_capacity(4);
        if self.is_uncensored {
            tags.push("无码");
        }
        if self.is_chinese_subtitle {
            tags.push("中文字幕");
        }
        if self.is_4k {
            tags.push("4K");
        }
        if self.is_leaked {
            tags.push("无码流出");
        }
        tags
    }

    /// Numeric part of an `FC2-PPV-<n>` code
    #[must_use]
    pub fn fc2_id(&self) -> Option<&str> {
        if !self.has_category(Category::FC2) {
            return None;
        }
        let id = self.code.rsplit(['-', '_']).next()?;
        (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
    }
}

/// Strip `-` and `_` separators from a code
#[must_use]
pub fn clean_id(code: &str) -> String {
    code.chars().filter(|c| *c != '-' && *c != '_').collect()
}
