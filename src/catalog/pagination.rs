use crate::catalog::QueryParams;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const MAX_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub size: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current: u64,
    pub total: u64,
    pub total_count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next: Option<u64>,
    pub prev: Option<u64>,
}

impl PageWindow {
    /// `page` below 1 or unparsable becomes 1. `limit`/`perPage` falls back to
    /// the default when unparsable and is clamped otherwise.
    pub fn from_params(params: &QueryParams) -> Self {
        let page = params
            .get("page")
            .and_then(|page| page.parse::<i64>().ok())
            .map_or(1, |page| page.max(1) as u64);
        let size = params
            .first_of(&["limit", "perPage"])
            .and_then(|size| size.parse::<i64>().ok())
            .map_or(DEFAULT_PAGE_SIZE, |size| {
                size.clamp(1, MAX_PAGE_SIZE as i64) as u64
            });
        Self { page, size }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn meta(&self, total_count: u64) -> PaginationMeta {
        let total = total_count.div_ceil(self.size);
        let has_next = self.page < total;
        let has_prev = self.page > 1;
        PaginationMeta {
            current: self.page,
            total,
            total_count,
            per_page: self.size,
            has_next,
            has_prev,
            next: has_next.then_some(self.page + 1),
            prev: has_prev.then(|| self.page - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(pairs: &[(&str, &str)]) -> PageWindow {
        PageWindow::from_params(&QueryParams::from_pairs(pairs))
    }

    #[test]
    fn bad_pages_become_first_page() {
        for raw in ["0", "-3", "abc", "1.5", ""] {
            assert_eq!(window(&[("page", raw)]).page, 1, "page {raw:?}");
        }
        assert_eq!(window(&[("page", "4")]).page, 4);
    }

    #[test]
    fn sizes_default_or_clamp() {
        assert_eq!(window(&[]).size, 12);
        assert_eq!(window(&[("limit", "ten")]).size, 12);
        assert_eq!(window(&[("limit", "0")]).size, 1);
        assert_eq!(window(&[("limit", "-7")]).size, 1);
        assert_eq!(window(&[("limit", "500")]).size, 50);
        assert_eq!(window(&[("perPage", "24")]).size, 24);
    }

    #[test]
    fn third_page_of_thirty() {
        let window = window(&[("page", "3"), ("limit", "12")]);
        assert_eq!(window.skip(), 24);
        let meta = window.meta(30);
        assert_eq!(meta.total, 3);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.next, None);
        assert_eq!(meta.prev, Some(2));
    }

    #[test]
    fn empty_result_has_no_pages() {
        let meta = PageWindow::default().meta(0);
        assert_eq!(meta.total, 0);
        assert!(!meta.has_next && !meta.has_prev);
    }
}
