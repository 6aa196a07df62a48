//! Layout elements: regions, lines, words and glyphs.

use crate::geometry::{Baseline, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable handle of an element within its page's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Id of the element at `index` of a list passed to
    /// [`Page::from_elements`](super::Page::from_elements).
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Arena slot index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a layout element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    /// Block of running text
    TextRegion,
    /// Table made of cells
    TableRegion,
    /// One cell of a table
    TableCell {
        /// Row index (0-based)
        row: u32,
        /// Column index (0-based)
        col: u32,
    },
    /// One line of text
    TextLine,
    /// One word of a line
    Word,
    /// One glyph of a word
    Glyph,
}

impl ElementKind {
    /// Whether this kind sits directly on the page.
    pub fn is_region(&self) -> bool {
        matches!(self, ElementKind::TextRegion | ElementKind::TableRegion)
    }

    /// Whether this kind holds text lines.
    pub fn holds_lines(&self) -> bool {
        matches!(self, ElementKind::TextRegion | ElementKind::TableCell { .. })
    }

    /// Whether this kind carries its own text content.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            ElementKind::TextLine | ElementKind::Word | ElementKind::Glyph
        )
    }

    /// Whether an element of this kind may be a child of `parent`
    /// (`None` meaning the page itself).
    pub fn accepts_parent(&self, parent: Option<&ElementKind>) -> bool {
        match (self, parent) {
            (ElementKind::TextRegion | ElementKind::TableRegion, None) => true,
            (ElementKind::TableCell { .. }, Some(ElementKind::TableRegion)) => true,
            (ElementKind::TextLine, Some(p)) => p.holds_lines(),
            (ElementKind::Word, Some(ElementKind::TextLine)) => true,
            (ElementKind::Glyph, Some(ElementKind::Word)) => true,
            _ => false,
        }
    }

    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::TextRegion => "text region",
            ElementKind::TableRegion => "table region",
            ElementKind::TableCell { .. } => "table cell",
            ElementKind::TextLine => "text line",
            ElementKind::Word => "word",
            ElementKind::Glyph => "glyph",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::TableCell { row, col } => write!(f, "table cell ({}, {})", row, col),
            other => f.write_str(other.label()),
        }
    }
}

/// One node of the layout tree.
///
/// Geometry, text and attributes are public and replaced by value; the
/// hierarchy links are owned by the [`Page`](super::Page) and only change
/// through its methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: ElementId,

    /// Identifier from the layout file (e.g. `"r1_l3"`)
    pub name: String,

    /// Element kind
    pub kind: ElementKind,

    pub(crate) parent: Option<ElementId>,

    pub(crate) children: Vec<ElementId>,

    pub(crate) reading_order: usize,

    /// Boundary polygon (may be invalid as parsed)
    pub polygon: Polygon,

    /// Baseline (text lines only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Baseline>,

    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Opaque attributes carried through unchanged
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Element {
    /// Create a detached element.
    pub fn new(kind: ElementKind, name: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            id: ElementId(0),
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            reading_order: 0,
            polygon,
            baseline: None,
            text: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the parent reference (used with [`Page::from_elements`](super::Page::from_elements)).
    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the baseline.
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the parsed reading order.
    pub fn with_reading_order(mut self, reading_order: usize) -> Self {
        self.reading_order = reading_order;
        self
    }

    /// Add an opaque attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Children in reading order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Position among siblings.
    pub fn reading_order(&self) -> usize {
        self.reading_order
    }

    /// Text content, or an empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Whether the text is missing or blank.
    pub fn has_blank_text(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_parent() {
        let cell = ElementKind::TableCell { row: 0, col: 1 };
        assert!(ElementKind::TextRegion.accepts_parent(None));
        assert!(ElementKind::TextLine.accepts_parent(Some(&ElementKind::TextRegion)));
        assert!(ElementKind::TextLine.accepts_parent(Some(&cell)));
        assert!(cell.accepts_parent(Some(&ElementKind::TableRegion)));
        assert!(!ElementKind::TextLine.accepts_parent(Some(&ElementKind::TableRegion)));
        assert!(!ElementKind::Word.accepts_parent(Some(&ElementKind::TextRegion)));
        assert!(!ElementKind::Glyph.accepts_parent(None));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ElementKind::TextLine.to_string(), "text line");
        assert_eq!(
            ElementKind::TableCell { row: 2, col: 3 }.to_string(),
            "table cell (2, 3)"
        );
    }

    #[test]
    fn test_element_builder() {
        let el = Element::new(ElementKind::Word, "w1", Polygon::rectangle(0.0, 0.0, 5.0, 5.0))
            .with_text("Hello")
            .with_attribute("conf", "0.93");
        assert_eq!(el.text_or_empty(), "Hello");
        assert!(!el.has_blank_text());
        assert_eq!(el.attributes.get("conf").map(String::as_str), Some("0.93"));
        assert!(el.parent().is_none());
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let json = serde_json::to_string(&ElementKind::TableCell { row: 1, col: 0 }).unwrap();
        assert_eq!(json, r#"{"type":"table_cell","row":1,"col":0}"#);
    }
}
