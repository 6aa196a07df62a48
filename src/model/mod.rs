//! Document model: the in-memory layout tree of one page.
//!
//! A parser fills a [`Page`] through the `add_*` methods or
//! [`Page::from_elements`]; the processors mutate it in place and an
//! exporter reads reading order, text and coordinates back out.

mod element;
mod page;

pub use element::{Element, ElementId, ElementKind};
pub use page::Page;
