//! Product listing query.
//!
//! Mirrors the four knobs of `GET /api/product/all`. Changing a filter
//! always returns to page 1; paging clamps to `1..=total_pages`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sort order by price. The wire values are the backend's, casing included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSort {
    #[serde(rename = "lowToHigh")]
    LowToHigh,
    #[serde(rename = "HighToLow")]
    HighToLow,
}

impl PriceSort {
    /// Both orders, for building the sort dropdown.
    pub const ALL: [Self; 2] = [Self::LowToHigh, Self::HighToLow];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowToHigh => "lowToHigh",
            Self::HighToLow => "HighToLow",
        }
    }

    /// Dropdown label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowToHigh => "Price: Low to High",
            Self::HighToLow => "Price: High to Low",
        }
    }
}

impl fmt::Display for PriceSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort order: {0}")]
pub struct UnknownSort(String);

impl FromStr for PriceSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lowToHigh" => Ok(Self::LowToHigh),
            "HighToLow" => Ok(Self::HighToLow),
            other => Err(UnknownSort(other.to_owned())),
        }
    }
}

/// Page, search term, category and sort for the product listing.
///
/// Deserializes leniently from the storefront's own query string: blank
/// values and unknown sorts are treated as absent, and pages that are
/// missing, unparseable or below 1 as 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    #[serde(deserialize_with = "lenient_page")]
    page: u32,
    search: String,
    category: String,
    #[serde(deserialize_with = "lenient_sort", skip_serializing_if = "Option::is_none")]
    sort: Option<PriceSort>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            search: String::new(),
            category: String::new(),
            sort: None,
        }
    }
}

fn lenient_sort<'de, D>(deserializer: D) -> Result<Option<PriceSort>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Page number from a query string or JSON body; anything unusable is page 1.
///
/// # Errors
///
/// Only fails if the underlying deserializer does.
pub fn lenient_page<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPage {
        Number(u32),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawPage>::deserialize(deserializer)? {
        Some(RawPage::Number(n)) => n.max(1),
        Some(RawPage::Text(s)) => s.trim().parse::<u32>().map_or(1, |n| n.max(1)),
        Some(RawPage::Other(_)) | None => 1,
    })
}

impl ListingQuery {
    /// First page, no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page (1-based).
    #[must_use]
    pub const fn page(&self) -> u32 {
        if self.page == 0 { 1 } else { self.page }
    }

    /// Search term, trimmed.
    #[must_use]
    pub fn search(&self) -> &str {
        self.search.trim()
    }

    /// Selected category (empty for all).
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.trim()
    }

    /// Selected sort.
    #[must_use]
    pub const fn sort(&self) -> Option<PriceSort> {
        self.sort
    }

    /// Whether any filter is active.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.search().is_empty() || !self.category().is_empty() || self.sort.is_some()
    }

    /// Set the search term and return to page 1.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self.page = 1;
        self
    }

    /// Set the category and return to page 1.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self.page = 1;
        self
    }

    /// Set the sort and return to page 1.
    #[must_use]
    pub const fn with_sort(mut self, sort: Option<PriceSort>) -> Self {
        self.sort = sort;
        self.page = 1;
        self
    }

    /// Jump to `page`, clamped to `1..=total_pages`.
    #[must_use]
    pub fn with_page(mut self, page: u32, total_pages: u32) -> Self {
        self.page = page.clamp(1, total_pages.max(1));
        self
    }

    /// Clear every filter and return to page 1.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// Query for the next page; stays on the last page.
    #[must_use]
    pub fn next_page(&self, total_pages: u32) -> Self {
        self.clone().with_page(self.page().saturating_add(1), total_pages)
    }

    /// Query for the previous page; stays on page 1.
    #[must_use]
    pub fn prev_page(&self) -> Self {
        let mut query = self.clone();
        query.page = self.page().saturating_sub(1).max(1);
        query
    }

    /// Parameters for `GET /api/product/all`, always all four keys.
    #[must_use]
    pub fn to_api_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("search", self.search().to_owned()),
            ("category", self.category().to_owned()),
            ("page", self.page().to_string()),
            (
                "sortByPrice",
                self.sort.map(PriceSort::as_str).unwrap_or_default().to_owned(),
            ),
        ]
    }

    /// Storefront query string for links, omitting defaults.
    ///
    /// Returns an empty string for the unfiltered first page, otherwise
    /// `?key=value&...`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if !self.search().is_empty() {
            parts.push(format!("search={}", urlencoding::encode(self.search())));
        }
        if !self.category().is_empty() {
            parts.push(format!("category={}", urlencoding::encode(self.category())));
        }
        if let Some(sort) = self.sort {
            parts.push(format!("sort={}", sort.as_str()));
        }
        if self.page() > 1 {
            parts.push(format!("page={}", self.page()));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_change_resets_page() {
        let query = ListingQuery::new().with_page(3, 5);
        assert_eq!(query.page(), 3);
        assert_eq!(query.clone().with_search("mug").page(), 1);
        assert_eq!(query.clone().with_category("kitchen").page(), 1);
        assert_eq!(query.with_sort(Some(PriceSort::HighToLow)).page(), 1);
    }

    #[test]
    fn test_next_page_clamps_to_total() {
        let query = ListingQuery::new().with_page(4, 5);
        assert_eq!(query.next_page(5).page(), 5);
        assert_eq!(query.next_page(5).next_page(5).page(), 5);
    }

    #[test]
    fn test_prev_page_stops_at_one() {
        let query = ListingQuery::new();
        assert_eq!(query.prev_page().page(), 1);
        assert_eq!(ListingQuery::new().with_page(2, 3).prev_page().page(), 1);
    }

    #[test]
    fn test_zero_total_pages_stays_on_first() {
        assert_eq!(ListingQuery::new().next_page(0).page(), 1);
        assert_eq!(ListingQuery::new().with_page(9, 0).page(), 1);
    }

    #[test]
    fn test_reset_clears_filters() {
        let query = ListingQuery::new()
            .with_search("mug")
            .with_category("kitchen")
            .with_sort(Some(PriceSort::LowToHigh))
            .with_page(2, 4)
            .reset();
        assert_eq!(query, ListingQuery::new());
        assert!(!query.has_filters());
    }

    #[test]
    fn test_api_pairs_always_carry_every_key() {
        let pairs = ListingQuery::new().with_sort(Some(PriceSort::HighToLow)).to_api_pairs();
        assert_eq!(
            pairs,
            vec![
                ("search", String::new()),
                ("category", String::new()),
                ("page", "1".to_owned()),
                ("sortByPrice", "HighToLow".to_owned()),
            ]
        );
    }

    #[test]
    fn test_query_string_omits_defaults() {
        assert_eq!(ListingQuery::new().to_query_string(), "");
        let query = ListingQuery::new()
            .with_search("red mug")
            .with_sort(Some(PriceSort::LowToHigh))
            .with_page(2, 3);
        assert_eq!(query.to_query_string(), "?search=red%20mug&sort=lowToHigh&page=2");
    }

    #[test]
    fn test_deserialize_is_lenient() {
        let query: ListingQuery =
            serde_json::from_str(r#"{"page":0,"search":"  ","sort":"sideways"}"#).unwrap();
        assert_eq!(query.page(), 1);
        assert_eq!(query.search(), "");
        assert_eq!(query.sort(), None);

        let query: ListingQuery = serde_json::from_str(r#"{"sort":"lowToHigh"}"#).unwrap();
        assert_eq!(query.sort(), Some(PriceSort::LowToHigh));
    }

    #[test]
    fn test_unusable_page_falls_back_to_first() {
        for body in [r#"{"page":"abc"}"#, r#"{"page":""}"#, r#"{"page":-2}"#, r#"{"page":null}"#] {
            let query: ListingQuery = serde_json::from_str(body).unwrap();
            assert_eq!(query.page(), 1, "{body}");
        }
        let query: ListingQuery = serde_json::from_str(r#"{"page":" 3 "}"#).unwrap();
        assert_eq!(query.page(), 3);
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("HighToLow".parse::<PriceSort>().unwrap(), PriceSort::HighToLow);
        assert!("hightolow".parse::<PriceSort>().is_err());
    }
}
