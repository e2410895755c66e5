use std::num::IntErrorKind;

/// Every post listing shows this many posts per page.
pub const POSTS_PER_PAGE: i64 = 10;

/// The `?page=` value as the client sent it, before it is clamped against the
/// size of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: i64,
}

impl PageRequest {
    pub fn first() -> Self {
        Self { number: 1 }
    }

    pub fn new(number: i64) -> Self {
        Self { number }
    }

    /// Missing or non-numeric values select the first page. Out-of-range numbers,
    /// including ones too large to parse, resolve to the last page once the total
    /// is known.
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(value) = raw else {
            return Self::first();
        };
        match value.trim().parse::<i64>() {
            Ok(number) => Self::new(number),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Self::new(i64::MAX),
                _ => Self::first(),
            },
        }
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn resolve(&self, total_count: i64, per_page: i64) -> PageWindow {
        let num_pages = num_pages(total_count, per_page);
        let number = if (1..=num_pages).contains(&self.number) {
            self.number
        } else {
            num_pages
        };
        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * per_page,
            limit: per_page,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A resolved page: which rows to fetch and where the page sits in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total_count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_count: i64) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total_count,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<i64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<i64> {
        self.has_next().then(|| self.number + 1)
    }
}

/// An empty listing still has one (empty) page.
fn num_pages(total_count: i64, per_page: i64) -> i64 {
    if total_count <= 0 || per_page <= 0 {
        return 1;
    }
    (total_count + per_page - 1) / per_page
}
