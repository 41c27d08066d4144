//! Identity of a paginated catalog query.

use std::fmt;

/// Identity of one paginated request stream: the page the browsing sequence
/// starts from, the page size, and the normalized search text.
///
/// Two fingerprints are equal only when all three fields match, so a changed
/// search string (or page size) produces a new identity. The coordinator
/// compares fingerprints to decide whether a request continues the current
/// browsing sequence or supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageFingerprint {
    page: u32,
    limit: u32,
    search: Option<String>,
}

impl PageFingerprint {
    /// Builds a fingerprint, normalizing the search text.
    ///
    /// Search text is trimmed and lowercased; blank input collapses to
    /// `None`, so `""`, `"  "` and no search at all name the same stream.
    /// `page` and `limit` are raised to at least 1.
    pub fn new(page: u32, limit: u32, search: Option<&str>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        Self {
            page: page.max(1),
            limit: limit.max(1),
            search,
        }
    }

    /// Fingerprint for a browsing sequence starting at page 1.
    pub fn first_page(limit: u32, search: Option<&str>) -> Self {
        Self::new(1, limit, search)
    }

    /// 1-based page this browsing sequence starts from.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page size. Also the chunk size for full-sync walks.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Normalized search text, if any.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

impl fmt::Display for PageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.search {
            Some(q) => write!(f, "p{}/{} q=\"{}\"", self.page, self.limit, q),
            None => write!(f, "p{}/{}", self.page, self.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_search_normalizes_to_none() {
        let plain = PageFingerprint::new(1, 50, None);
        assert_eq!(plain, PageFingerprint::new(1, 50, Some("")));
        assert_eq!(plain, PageFingerprint::new(1, 50, Some("   ")));
        assert_eq!(plain.search(), None);
    }

    #[test]
    fn test_search_is_trimmed_and_lowercased() {
        let fp = PageFingerprint::new(1, 50, Some("  Dune "));
        assert_eq!(fp.search(), Some("dune"));
        assert_eq!(fp, PageFingerprint::new(1, 50, Some("dune")));
    }

    #[test]
    fn test_any_field_change_is_a_new_identity() {
        let base = PageFingerprint::new(1, 50, Some("dune"));
        assert_ne!(base, PageFingerprint::new(2, 50, Some("dune")));
        assert_ne!(base, PageFingerprint::new(1, 25, Some("dune")));
        assert_ne!(base, PageFingerprint::new(1, 50, Some("foundation")));
    }

    #[test]
    fn test_page_and_limit_raised_to_one() {
        let fp = PageFingerprint::new(0, 0, None);
        assert_eq!(fp.page(), 1);
        assert_eq!(fp.limit(), 1);
    }

    #[test]
    fn test_display_includes_search_when_present() {
        assert_eq!(PageFingerprint::new(1, 50, None).to_string(), "p1/50");
        assert_eq!(
            PageFingerprint::new(1, 50, Some("Dune")).to_string(),
            "p1/50 q=\"dune\""
        );
    }
}
