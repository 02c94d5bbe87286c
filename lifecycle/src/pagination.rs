//! Page sizes and continuation tokens.
//!
//! A continuation token is the decimal row offset at which the next page
//! starts. Callers must treat it as opaque.

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page size honoured; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 200;

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    size: usize,
    offset: usize,
}

impl PageRequest {
    /// Resolve a raw page size and continuation token.
    ///
    /// A non-positive size selects [`DEFAULT_PAGE_SIZE`]; sizes above
    /// [`MAX_PAGE_SIZE`] are clamped. A missing, malformed or negative token
    /// starts at offset 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use accounts_lifecycle::PageRequest;
    ///
    /// let page = PageRequest::new(0, Some("100"));
    /// assert_eq!(page.size(), 50);
    /// assert_eq!(page.offset(), 100);
    ///
    /// let page = PageRequest::new(1_000, Some("garbage"));
    /// assert_eq!(page.size(), 200);
    /// assert_eq!(page.offset(), 0);
    /// ```
    #[must_use]
    pub fn new(page_size: i64, page_token: Option<&str>) -> Self {
        Self {
            size: clamp_page_size(page_size),
            offset: parse_page_token(page_token),
        }
    }

    /// The first page with the default size.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    /// Number of rows in this page.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Zero-based row offset of the first row.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Token for the page following this one.
    #[must_use]
    pub fn next_token(&self) -> String {
        encode_page_token(self.offset.saturating_add(self.size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Apply the default and the cap to a requested page size.
#[must_use]
pub fn clamp_page_size(requested: i64) -> usize {
    if requested <= 0 {
        return DEFAULT_PAGE_SIZE;
    }
    usize::try_from(requested).map_or(MAX_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE))
}

/// Decode a continuation token into a row offset.
#[must_use]
pub fn parse_page_token(token: Option<&str>) -> usize {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0;
    };

    token.parse::<usize>().unwrap_or_else(|_| {
        tracing::warn!(page_token = %token, "Invalid page token, starting from the first page");
        0
    })
}

/// Encode a row offset as a continuation token.
#[must_use]
pub fn encode_page_token(offset: usize) -> String {
    offset.to_string()
}
