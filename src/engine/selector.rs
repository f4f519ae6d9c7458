//! Search engine resolution keyed on the search URL

use crate::error::{RankCheckError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The search engine dialects the checker knows how to scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Google,
    Bing,
    Yahoo,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Google => "google",
            ExtractorKind::Bing => "bing",
            ExtractorKind::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered (substring, kind) pairs; the first substring found in the URL wins
#[derive(Debug, Clone)]
pub struct EngineSelector {
    patterns: Vec<(String, ExtractorKind)>,
}

impl Default for EngineSelector {
    fn default() -> Self {
        Self::new()
            .with_pattern("google.", ExtractorKind::Google)
            .with_pattern("bing.", ExtractorKind::Bing)
            .with_pattern("search.yahoo.", ExtractorKind::Yahoo)
    }
}

impl EngineSelector {
    /// A selector with no patterns
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append a pattern; earlier patterns take precedence
    pub fn with_pattern(mut self, substring: &str, kind: ExtractorKind) -> Self {
        self.patterns.push((substring.to_lowercase(), kind));
        self
    }

    pub fn resolve(&self, search_url: &str) -> Result<ExtractorKind> {
        let search_url = search_url.trim();
        if search_url.is_empty() {
            return Err(RankCheckError::InvalidConfiguration(
                "search URL is required".to_string(),
            ));
        }

        let lowered = search_url.to_lowercase();
        self.patterns
            .iter()
            .find(|(substring, _)| lowered.contains(substring.as_str()))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| RankCheckError::UnsupportedEngine(search_url.to_string()))
    }
}
