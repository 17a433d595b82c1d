//! Pagination helper.
//!
//! Slices an ordered result set into fixed-size pages. Requests are
//! forgiving: a missing or non-numeric page is page 1, anything out of
//! range lands on the last page, and an empty result still has one page.

use serde::Serialize;

/// Posts per page on public feeds.
pub const PAGE_SIZE: u64 = 10;

/// Computes page boundaries for `count` items.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `?page=` value to a valid page.
    pub fn get_page(&self, requested: Option<&str>) -> PageInfo {
        let last = self.num_pages();
        let number = match requested.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n < 1 => last,
                Ok(n) => (n as u64).min(last),
                // Too large for i64, still a number.
                Err(_) if is_integer(raw) => last,
                Err(_) => 1,
            },
        };

        PageInfo {
            number,
            num_pages: last,
            count: self.count,
            per_page: self.per_page,
            has_next: number < last,
            has_previous: number > 1,
            next_page_number: (number < last).then_some(number + 1),
            previous_page_number: (number > 1).then_some(number - 1),
        }
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(|c| c == '-' || c == '+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Metadata describing one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl PageInfo {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// One page of items together with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    #[serde(flatten)]
    pub info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(object_list: Vec<T>, info: PageInfo) -> Self {
        Self { object_list, info }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            info: self.info,
        }
    }
}
