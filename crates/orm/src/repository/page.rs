use serde::Serialize;

/// A page of results with pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    /// Same metadata, items converted with `f`
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 95, 10, 10);
        assert_eq!(page.total_pages, 10);
        assert!(!page.has_next_page());

        assert_eq!(Page::<u8>::new(vec![], 0, 1, 10).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 100, 1, 10).total_pages, 10);
    }

    #[test]
    fn test_serializes_metadata() {
        let json = serde_json::to_value(Page::new(vec!["a"], 1, 1, 20)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": ["a"], "total": 1, "page": 1, "per_page": 20, "total_pages": 1})
        );
    }
}
