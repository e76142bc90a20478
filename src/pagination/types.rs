//! Pagination types and traits

use serde_json::Value;

/// Page number of the next request; starts at 1 for every partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor(u32);

impl PageCursor {
    /// The first page
    pub fn first() -> Self {
        Self(1)
    }

    /// Cursor for an explicit page number (0 is clamped to 1)
    pub fn at(page: u32) -> Self {
        Self(page.max(1))
    }

    /// The page after this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Page number
    pub fn page(self) -> u32 {
        self.0
    }

    /// Whether this is the first page
    pub fn is_first(self) -> bool {
        self.0 == 1
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Decide from a decoded response body whether another page exists
    fn has_more(&self, body: &Value) -> bool;

    /// Cursor to request after `current`
    fn next_cursor(&self, current: PageCursor) -> PageCursor {
        current.next()
    }
}
