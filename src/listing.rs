//! In-memory search, category filter and pagination over an already fetched collection.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A row that can appear on a listing screen.
pub trait Listable {
    /// Display fields matched by the free-text search.
    fn search_fields(&self) -> Vec<&str>;

    /// Foreign key or resolved label used by the category dropdown.
    fn category(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// 1-based
    pub page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Keeps rows matching both the search term and the category.
/// Blank search and category values do not filter.
pub fn filter<T: Listable>(rows: Vec<T>, query: &ListingQuery) -> Vec<T> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let category = query.category.as_deref().filter(|c| !c.is_empty());

    rows.into_iter()
        .filter(|row| match &needle {
            Some(needle) => row
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .filter(|row| match category {
            Some(category) => row.category() == Some(category),
            None => true,
        })
        .collect()
}

pub fn paginate<T>(rows: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total = rows.len();
    let total_pages = total.div_ceil(page_size);

    // an offset that overflows is past the end
    let items = match (page - 1).checked_mul(page_size) {
        Some(offset) => rows.into_iter().skip(offset).take(page_size).collect(),
        None => Vec::new(),
    };

    Page {
        items,
        page,
        page_size,
        total,
        total_pages,
    }
}

pub fn apply<T: Listable>(rows: Vec<T>, query: &ListingQuery, page_size: usize) -> Page<T> {
    paginate(filter(rows, query), query.page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Campus {
        name: &'static str,
        city: &'static str,
        region: &'static str,
    }

    impl Listable for Campus {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name, self.city]
        }

        fn category(&self) -> Option<&str> {
            Some(self.region)
        }
    }

    fn campuses() -> Vec<Campus> {
        vec![
            Campus { name: "Plantel Norte", city: "Monterrey", region: "norte" },
            Campus { name: "Plantel Centro", city: "Querétaro", region: "centro" },
            Campus { name: "Plantel Sur", city: "Mérida", region: "sur" },
            Campus { name: "Campus Cumbres", city: "Monterrey", region: "norte" },
            Campus { name: "Campus Bajío", city: "León", region: "centro" },
        ]
    }

    fn query(search: Option<&str>, category: Option<&str>, page: usize) -> ListingQuery {
        ListingQuery {
            search: search.map(String::from),
            category: category.map(String::from),
            page,
        }
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let rows = filter(campuses(), &query(Some("MONTERREY"), None, 1));
        let names: Vec<_> = rows.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Plantel Norte", "Campus Cumbres"]);

        let rows = filter(campuses(), &query(Some("plantel"), None, 1));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn category_and_search_intersect() {
        let rows = filter(campuses(), &query(Some("campus"), Some("centro"), 1));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Campus Bajío");
    }

    #[test]
    fn category_is_exact_match() {
        let rows = filter(campuses(), &query(None, Some("nort"), 1));
        assert!(rows.is_empty());
    }

    #[test]
    fn blank_search_keeps_everything() {
        let rows = filter(campuses(), &query(Some("   "), Some(""), 1));
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn last_page_is_partial() {
        let first = paginate(campuses(), 1, 2);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total_pages, 3);

        let last = paginate(campuses(), 3, 2);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name, "Campus Bajío");
    }

    #[test]
    fn page_past_the_end_is_empty_and_page_zero_is_first() {
        assert!(paginate(campuses(), 9, 2).items.is_empty());
        let page = paginate(campuses(), 0, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items[0].name, "Plantel Norte");
    }

    #[test]
    fn huge_page_numbers_are_past_the_end() {
        for page in [usize::MAX, (1usize << 63) + 1] {
            let result = paginate(campuses(), page, 10);
            assert!(result.items.is_empty(), "page {page} returned rows");
            assert_eq!(result.page, page);
            assert_eq!(result.total, 5);
        }
    }

    #[test]
    fn total_pages_follow_filtered_length() {
        let page = apply(campuses(), &query(Some("monterrey"), None, 1), 7);
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.len() <= 7);
    }
}
