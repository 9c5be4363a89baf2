//! Pagination: which slice of the messages a list request wants, and what it got back.
//!
//! Query parameters follow the conventions most REST clients already know:
//!
//! - `page`: zero-based page number,
//! - `size`: number of records per page,
//! - `sort`: `property[,property...][,asc|desc]`, repeatable.
//!
//! Nothing here ever fails: values that don't parse are replaced with defaults.
use serde::Serialize;

use crate::config::Pagination;
use crate::http::Query;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `asc` or `desc`, in any case.
    pub fn parse(value: &str) -> Option<Direction> {
        match value.trim().to_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Sort by one property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl ToString) -> Self {
        Self {
            property: property.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl ToString) -> Self {
        Self {
            property: property.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Page request: page number, page size and sort order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pageable {
    page: i64,
    size: i64,
    sort: Vec<Order>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self::new(0, Pagination::default().default_size)
    }
}

impl Pageable {
    /// Request a page. Negative pages are clamped to the first page and
    /// sizes below one to a single record.
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.max(0),
            size: size.max(1),
            sort: vec![],
        }
    }

    /// Add sort orders, applied in sequence.
    pub fn sort(mut self, orders: impl IntoIterator<Item = Order>) -> Self {
        self.sort.extend(orders);
        self
    }

    /// Read `page`, `size` and `sort` from the query string.
    ///
    /// # Example
    ///
    /// ```
    /// use chat_backend::config::Pagination;
    /// use chat_backend::http::Query;
    /// use chat_backend::model::{Order, Pageable};
    ///
    /// let query = Query::parse("page=2&size=10&sort=id,desc");
    /// let pageable = Pageable::from_query(&query, &Pagination::default());
    ///
    /// assert_eq!(pageable.page(), 2);
    /// assert_eq!(pageable.size(), 10);
    /// assert_eq!(pageable.orders(), &[Order::desc("id")]);
    /// ```
    pub fn from_query(query: &Query, defaults: &Pagination) -> Self {
        let page = query.get::<i64>("page").filter(|page| *page >= 0).unwrap_or(0);

        let size = query
            .get::<i64>("size")
            .filter(|size| *size >= 1)
            .unwrap_or(defaults.default_size)
            .min(defaults.max_size);

        let sort = query
            .get_all("sort")
            .into_iter()
            .flat_map(Self::parse_sort)
            .collect::<Vec<_>>();

        Self::new(page, size).sort(sort)
    }

    /// Parse one `sort` value, e.g. `userName,createdAt,desc`.
    ///
    /// The direction, if present, is the last element and applies to all
    /// properties before it.
    fn parse_sort(value: &str) -> Vec<Order> {
        let mut elements = value
            .split(",")
            .map(|element| element.trim())
            .collect::<Vec<_>>();

        let direction = match elements.last() {
            Some(last) if elements.len() > 1 => match Direction::parse(last) {
                Some(direction) => {
                    elements.pop();
                    direction
                }
                None => Direction::default(),
            },
            _ => Direction::default(),
        };

        elements
            .into_iter()
            .filter(|property| !property.is_empty())
            .map(|property| Order {
                property: property.to_string(),
                direction,
            })
            .collect()
    }

    /// Zero-based page number.
    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn orders(&self) -> &[Order] {
        &self.sort
    }

    /// Number of records to skip.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

/// A page of records and the total number of records available.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: Pageable,
    total_elements: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: Pageable, total_elements: i64) -> Self {
        Self {
            content,
            pageable,
            total_elements,
        }
    }

    /// Records on this page.
    pub fn content(&self) -> &[T] {
        &self.content
    }

    /// Records across all pages.
    pub fn total_elements(&self) -> i64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> i64 {
        let size = self.pageable.size();
        (self.total_elements + size - 1) / size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pageable(query: &str) -> Pageable {
        Pageable::from_query(&Query::parse(query), &Pagination::default())
    }

    #[test]
    fn test_defaults() {
        let defaults = pageable("");
        assert_eq!(defaults.page(), 0);
        assert_eq!(defaults.size(), 20);
        assert!(defaults.orders().is_empty());
        assert_eq!(defaults, Pageable::default());
    }

    #[test]
    fn test_malformed_values_use_defaults() {
        let negative = pageable("page=-3&size=zero");
        assert_eq!(negative.page(), 0);
        assert_eq!(negative.size(), 20);

        let garbage = pageable("page=abc&size=0");
        assert_eq!(garbage.page(), 0);
        assert_eq!(garbage.size(), 20);

        let oversized = pageable("page=1&size=100000");
        assert_eq!(oversized.page(), 1);
        assert_eq!(oversized.size(), 2000);
        assert_eq!(oversized.offset(), 2000);
    }

    #[test]
    fn test_sort() {
        assert_eq!(pageable("sort=id,desc").orders(), &[Order::desc("id")]);
        assert_eq!(pageable("sort=id,DESC").orders(), &[Order::desc("id")]);
        assert_eq!(pageable("sort=id").orders(), &[Order::asc("id")]);
        assert_eq!(pageable("sort=id%2Casc").orders(), &[Order::asc("id")]);
        assert_eq!(
            pageable("sort=userName,createdAt,desc&sort=id").orders(),
            &[
                Order::desc("userName"),
                Order::desc("createdAt"),
                Order::asc("id")
            ]
        );
        assert_eq!(
            pageable("sort=userName,message").orders(),
            &[Order::asc("userName"), Order::asc("message")]
        );
        assert!(pageable("sort=&sort=,").orders().is_empty());
    }

    #[test]
    fn test_page() {
        let page = Page::new(vec![1, 2, 3], Pageable::new(0, 3), 7);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.total_elements(), 7);
        assert_eq!(page.content(), &[1, 2, 3]);

        let page = Page::new(vec![7], Pageable::new(2, 3), 6);
        assert_eq!(page.total_pages(), 2);

        let page: Page<i64> = Page::new(vec![], Pageable::default(), 0);
        assert_eq!(page.total_pages(), 0);
        assert!(page.content().is_empty());
    }
}
