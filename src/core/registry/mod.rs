//! Static table of metric sources: which responses to watch and how to pull
//! a value out of them.
//!
//! Adding a metric means adding one `MetricSource` entry here plus its
//! extraction arm; nothing else has to change. Sources are matched
//! first-match-wins, so URL fragments must stay mutually exclusive.

pub mod extractors;

use std::sync::OnceLock;

use serde_json::{Map, Value};

/// Extraction strategy tag. Keeping this a closed enum (instead of boxed
/// closures) keeps the registry itself plain data that can be validated and
/// tested without the interception layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    CartCount,
    FlowSource,
    MarketRank,
}

/// What an extractor produced for one observed response.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Single-column metric.
    Value(f64),
    /// Multi-column metric, one row.
    Record(Map<String, Value>),
    /// Multi-row metric, one row per tracked entity.
    Rows(Vec<Map<String, Value>>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSource {
    pub id: &'static str,
    /// Store table the sink writes into.
    pub table: &'static str,
    /// Column name for `Extracted::Value` writes.
    pub value_key: Option<&'static str>,
    /// URL fragment that selects this source.
    pub url_contains: &'static str,
    /// Require the configured rank keyword in the query string.
    pub requires_keyword: bool,
    pub extraction: Extraction,
}

pub const SOURCES: &[MetricSource] = &[
    MetricSource {
        id: "cart_log",
        table: "shop_cart_log",
        value_key: Some("item_cart_cnt"),
        url_contains: "/cc/item/live/view/top.json",
        requires_keyword: false,
        extraction: Extraction::CartCount,
    },
    MetricSource {
        id: "flow_source",
        table: "shop_flow_source_log",
        value_key: None,
        url_contains: "/flow/v6/live/item/source/v4.json",
        requires_keyword: false,
        extraction: Extraction::FlowSource,
    },
    MetricSource {
        id: "market_rank",
        table: "shop_market_rank_log",
        value_key: None,
        url_contains: "/mc/mq/mkt/item/live/rank.json",
        requires_keyword: true,
        extraction: Extraction::MarketRank,
    },
];

/// Keyword the rank listing URL must carry (query strings arrive
/// percent-encoded, so the comparison key is encoded once up front).
/// Empty keyword disables the filter.
fn rank_keyword_param() -> &'static str {
    static PARAM: OnceLock<String> = OnceLock::new();
    PARAM.get_or_init(|| {
        let keyword = std::env::var("SHOPWATCH_RANK_KEYWORD").unwrap_or_default();
        if keyword.is_empty() {
            String::new()
        } else {
            format!("keyWord={}", urlencoding::encode(&keyword))
        }
    })
}

fn flow_search_label() -> &'static str {
    static LABEL: OnceLock<String> = OnceLock::new();
    LABEL.get_or_init(|| {
        std::env::var("SHOPWATCH_FLOW_SEARCH_LABEL").unwrap_or_else(|_| "search".into())
    })
}

fn flow_cart_label() -> &'static str {
    static LABEL: OnceLock<String> = OnceLock::new();
    LABEL.get_or_init(|| {
        std::env::var("SHOPWATCH_FLOW_CART_LABEL").unwrap_or_else(|_| "cart".into())
    })
}

impl MetricSource {
    pub fn accepts(&self, url: &str) -> bool {
        if !url.contains(self.url_contains) {
            return false;
        }
        if self.requires_keyword {
            let param = rank_keyword_param();
            if !param.is_empty() && !url.contains(param) {
                return false;
            }
        }
        true
    }

    pub fn extract(&self, body: &Value) -> Option<Extracted> {
        match self.extraction {
            Extraction::CartCount => extractors::cart_count(body).map(Extracted::Value),
            Extraction::FlowSource => {
                extractors::flow_source(body, flow_search_label(), flow_cart_label())
                    .map(Extracted::Record)
            }
            Extraction::MarketRank => extractors::market_rank(body).map(Extracted::Rows),
        }
    }
}

/// First source whose matcher accepts the URL.
pub fn match_url(url: &str) -> Option<&'static MetricSource> {
    SOURCES.iter().find(|s| s.accepts(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins_and_ids_are_unique() {
        let mut ids: Vec<&str> = SOURCES.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SOURCES.len());
    }

    #[test]
    fn url_fragments_are_mutually_exclusive() {
        for s in SOURCES {
            let hits = SOURCES
                .iter()
                .filter(|o| s.url_contains.contains(o.url_contains))
                .count();
            assert_eq!(hits, 1, "{} overlaps another source", s.id);
        }
    }

    #[test]
    fn match_url_selects_by_fragment() {
        let url = "https://shop.example.com/api/cc/item/live/view/top.json?dateType=today";
        assert_eq!(match_url(url).map(|s| s.id), Some("cart_log"));
        assert_eq!(match_url("https://shop.example.com/other.json"), None);
    }

    #[test]
    fn rank_keyword_filter_defaults_open() {
        // No SHOPWATCH_RANK_KEYWORD in the test environment: filter is off.
        let url = "https://shop.example.com/mc/mq/mkt/item/live/rank.json?keyWord=anything";
        assert_eq!(match_url(url).map(|s| s.id), Some("market_rank"));
    }
}
