//! Splitting an ordered collection into listing pages.
//!
//! A listing with `N` items and `K` items per page renders `ceil(N / K)`
//! pages; page `i` holds `items[i*K .. (i+1)*K]`. With the pager disabled
//! there is exactly one page holding the first `K` items. An empty
//! collection still renders one (empty) page so the listing URL exists.

use crate::render::escape_html;
use serde::Serialize;

/// Number of pages for `len` items.
pub fn page_count(len: usize, page_size: usize, pager: bool) -> usize {
    if !pager || len == 0 {
        return 1;
    }
    len.div_ceil(page_size.max(1))
}

/// Split `items` into pages.
pub fn paginate<T>(items: &[T], page_size: usize, pager: bool) -> Vec<&[T]> {
    let size = page_size.max(1);
    if page_count(items.len(), size, pager) == 1 {
        return vec![&items[..items.len().min(size)]];
    }
    items.chunks(size).collect()
}

/// Navigation data handed to the listing template for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub count: usize,
    pub current_page: usize,
    /// Output file of every page, in order.
    pub pages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Pagination {
    /// Navigation for every page of a listing whose pages write `filenames`.
    pub fn for_pages(filenames: &[String]) -> Vec<Self> {
        let count = filenames.len();
        (0..count)
            .map(|index| Self {
                count,
                current_page: index,
                pages: filenames.to_vec(),
                previous: index.checked_sub(1).map(|i| filenames[i].clone()),
                next: filenames.get(index + 1).cloned(),
            })
            .collect()
    }

    /// Minimal pager markup used by the built-in listing template. Links
    /// are relative to the site root.
    pub fn links(&self, baseurl: &str) -> String {
        if self.count <= 1 {
            return String::new();
        }
        let base = baseurl.trim_end_matches('/');
        let href = |page: &str| escape_html(&format!("{base}/{}", page.trim_end_matches("index.html")));

        let mut out = String::new();
        if let Some(previous) = &self.previous {
            out.push_str(&format!("<a rel=\"prev\" href=\"{}\">Previous</a>\n", href(previous)));
        }
        out.push_str("<ul>\n");
        for (i, page) in self.pages.iter().enumerate() {
            if i == self.current_page {
                out.push_str(&format!("<li>{}</li>\n", i + 1));
            } else {
                out.push_str(&format!("<li><a href=\"{}\">{}</a></li>\n", href(page), i + 1));
            }
        }
        out.push_str("</ul>\n");
        if let Some(next) = &self.next {
            out.push_str(&format!("<a rel=\"next\" href=\"{}\">Next</a>\n", href(next)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(25, 10, true), 3);
        assert_eq!(page_count(20, 10, true), 2);
        assert_eq!(page_count(1, 10, true), 1);
        assert_eq!(page_count(0, 10, true), 1);
        assert_eq!(page_count(25, 10, false), 1);
        assert_eq!(page_count(3, 0, true), 3);
    }

    #[test]
    fn test_paginate_slices() {
        let items: Vec<u32> = (0..25).collect();
        let pages = paginate(&items, 10, true);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], &items[0..10]);
        assert_eq!(pages[2], &items[20..25]);
        assert_eq!(pages.len(), page_count(items.len(), 10, true));
    }

    #[test]
    fn test_paginate_without_pager_takes_first_page() {
        let items: Vec<u32> = (0..25).collect();
        let pages = paginate(&items, 10, false);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], &items[0..10]);

        let few = [1, 2];
        assert_eq!(paginate(&few, 10, false), vec![&few[..]]);
    }

    #[test]
    fn test_paginate_empty() {
        let items: Vec<u32> = Vec::new();
        let pages = paginate(&items, 10, true);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_navigation() {
        let files = vec!["blog/index.html".to_string(), "blog/1/index.html".into(), "blog/2/index.html".into()];
        let nav = Pagination::for_pages(&files);
        assert_eq!(nav.len(), 3);

        assert_eq!(nav[0].previous, None);
        assert_eq!(nav[0].next.as_deref(), Some("blog/1/index.html"));
        assert_eq!(nav[1].previous.as_deref(), Some("blog/index.html"));
        assert_eq!(nav[2].next, None);
        assert_eq!(nav[2].current_page, 2);
        assert!(nav.iter().all(|p| p.count == 3 && p.pages == files));
    }

    #[test]
    fn test_serialization_skips_absent_links() {
        let nav = Pagination::for_pages(&["index.html".to_string()]);
        let json = serde_json::to_value(&nav[0]).unwrap();
        assert!(json.get("previous").is_none());
        assert!(json.get("next").is_none());
        assert_eq!(json["count"], 1);
    }

    #[test]
    fn test_links_markup() {
        let files = vec!["blog/index.html".to_string(), "blog/page1.html".into()];
        let nav = Pagination::for_pages(&files);
        let html = nav[0].links("/");
        assert!(html.contains("<li>1</li>"));
        assert!(html.contains("<a href=\"/blog/page1.html\">2</a>"));
        assert!(html.contains("rel=\"next\""));
        assert!(!html.contains("rel=\"prev\""));

        assert!(Pagination::for_pages(&files[..1])[0].links("/").is_empty());
    }
}
