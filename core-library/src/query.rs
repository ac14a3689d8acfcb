//! Saved search definitions.
//!
//! A [`SearchContext`] is what an export folder stores to describe the files
//! it mirrors. Evaluating it is the media repository's job.

use crate::models::{ServiceKey, TagsView};
use serde::{Deserialize, Serialize};

/// Non-tag constraints on a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPredicates {
    /// Maximum number of results, applied after the result set is shuffled
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SystemPredicates {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// A saved search over one file service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub file_service_key: ServiceKey,
    /// Tags every result must carry (current or pending)
    #[serde(default)]
    pub include_tags: Vec<String>,
    /// Tags no result may carry
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub system: SystemPredicates,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            file_service_key: ServiceKey::local_files(),
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            system: SystemPredicates::default(),
        }
    }
}

impl SearchContext {
    pub fn new(file_service_key: ServiceKey) -> Self {
        Self {
            file_service_key,
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.include_tags.push(tag.into());
        self
    }

    pub fn without_tag(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.push(tag.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.system.limit = Some(limit);
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.system.limit
    }

    /// Whether a file with these tags satisfies the tag predicates.
    pub fn matches_tags(&self, tags: &TagsView) -> bool {
        self.include_tags.iter().all(|tag| tags.has_tag(tag))
            && !self.exclude_tags.iter().any(|tag| tags.has_tag(tag))
    }
}
