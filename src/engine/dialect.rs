//! Per-engine query parameters, pagination and result selectors

use crate::engine::selector::ExtractorKind;
use crate::error::{RankCheckError, Result};
use crate::models::RankCheckQuery;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// How a dialect walks through result pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// One request asks for all `maximum_records` results at once
    SingleRequest { count_param: &'static str },
    /// Fixed-size pages addressed by a result offset
    Offset {
        count_param: Option<&'static str>,
        offset_param: &'static str,
        page_size: u32,
        /// Offset of the first result on page 1
        first_index: u32,
    },
}

/// Engine-specific rules for building page URLs and reading result blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub kind: ExtractorKind,
    pub term_param: &'static str,
    pub pagination: Pagination,
    pub block_selector: &'static str,
    pub citation_selector: &'static str,
}

pub const GOOGLE: Dialect = Dialect {
    kind: ExtractorKind::Google,
    term_param: "q",
    pagination: Pagination::SingleRequest { count_param: "num" },
    block_selector: "#search .g",
    citation_selector: "cite",
};

pub const BING: Dialect = Dialect {
    kind: ExtractorKind::Bing,
    term_param: "q",
    // Bing caps results per page, so large scans must paginate
    pagination: Pagination::Offset {
        count_param: Some("count"),
        offset_param: "first",
        page_size: 10,
        first_index: 0,
    },
    block_selector: "#b_results .b_algo",
    citation_selector: "cite",
};

pub const YAHOO: Dialect = Dialect {
    kind: ExtractorKind::Yahoo,
    term_param: "p",
    pagination: Pagination::Offset {
        count_param: None,
        offset_param: "b",
        page_size: 10,
        first_index: 1,
    },
    block_selector: ".searchCenterMiddle .dd.algo",
    citation_selector: ".compTitle span",
};

impl Dialect {
    pub fn for_kind(kind: ExtractorKind) -> Self {
        match kind {
            ExtractorKind::Google => GOOGLE,
            ExtractorKind::Bing => BING,
            ExtractorKind::Yahoo => YAHOO,
        }
    }

    pub fn is_single_request(&self) -> bool {
        matches!(self.pagination, Pagination::SingleRequest { .. })
    }

    /// Build the URL of a 1-based results page
    ///
    /// Existing query parameters of the search URL are kept unless the dialect
    /// overrides them.
    pub fn page_url(&self, query: &RankCheckQuery, page: u32) -> Result<Url> {
        let mut url = query.parsed_search_url()?;

        let mut overrides: Vec<(&str, String)> = vec![(self.term_param, query.term_to_search.clone())];
        match self.pagination {
            Pagination::SingleRequest { count_param } => {
                overrides.push((count_param, query.maximum_records.to_string()));
            }
            Pagination::Offset {
                count_param,
                offset_param,
                page_size,
                first_index,
            } => {
                if let Some(count_param) = count_param {
                    overrides.push((count_param, page_size.to_string()));
                }
                if page > 1 {
                    let offset = (page - 1) * page_size + first_index;
                    overrides.push((offset_param, offset.to_string()));
                }
            }
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !overrides.iter().any(|(name, _)| *name == key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(overrides);

        Ok(url)
    }

    /// Extract result blocks from a page, in document order
    ///
    /// Only blocks holding a citation count. Each citation belongs to its
    /// nearest enclosing block, and a block yields the text of its first
    /// citation.
    pub fn parse_blocks(&self, html: &str) -> Result<Vec<String>> {
        let block_selector = parse_selector(self.block_selector)?;
        let citation_selector = parse_selector(self.citation_selector)?;

        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for cite in document.select(&citation_selector) {
            let block = cite
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| block_selector.matches(ancestor));

            if let Some(block) = block {
                if seen.insert(block.id()) {
                    blocks.push(cite.text().collect::<String>().trim().to_string());
                }
            }
        }

        debug!("Parsed {} {} result blocks", blocks.len(), self.kind);
        Ok(blocks)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RankCheckError::ParseError(format!("invalid selector '{}': {:?}", selector, e)))
}
