//! Page-level layout tree.

use super::element::{Element, ElementId, ElementKind};
use crate::error::{Error, Result};
use crate::geometry::Polygon;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One scanned page and its layout tree.
///
/// Elements live in an arena addressed by [`ElementId`]; slots are never
/// reused, so ids stay valid (or dangling) across deletions. Every mutating
/// method leaves each sibling list numbered `0..n` in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PageData")]
pub struct Page {
    /// Image width in pixels
    pub image_width: f64,

    /// Image height in pixels
    pub image_height: f64,

    /// Source image file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,

    elements: Vec<Option<Element>>,

    regions: Vec<ElementId>,
}

/// Serialized form of a [`Page`], checked before it becomes one.
#[derive(Deserialize)]
struct PageData {
    image_width: f64,
    image_height: f64,
    #[serde(default)]
    image_filename: Option<String>,
    elements: Vec<Option<Element>>,
    regions: Vec<ElementId>,
}

impl TryFrom<PageData> for Page {
    type Error = Error;

    fn try_from(data: PageData) -> Result<Self> {
        let mut page = Page {
            image_width: data.image_width,
            image_height: data.image_height,
            image_filename: data.image_filename,
            elements: data.elements,
            regions: data.regions,
        };
        page.check_structure()?;
        page.renumber_all();
        Ok(page)
    }
}

impl Page {
    /// Create an empty page with the given image dimensions.
    pub fn new(image_width: f64, image_height: f64) -> Self {
        Self {
            image_width,
            image_height,
            image_filename: None,
            elements: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Set the source image file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.image_filename = Some(filename.into());
        self
    }

    /// Build a page from a flat element list.
    ///
    /// Element `i` of the list gets `ElementId` `i`; parent references use
    /// the same numbering. Siblings are ordered by their parsed reading
    /// order (ties by list position) and then renumbered. Elements whose
    /// parent is missing or of the wrong kind stay in the arena as orphans.
    pub fn from_elements(image_width: f64, image_height: f64, elements: Vec<Element>) -> Self {
        let mut page = Page::new(image_width, image_height);
        page.elements = elements
            .into_iter()
            .enumerate()
            .map(|(i, mut el)| {
                el.id = ElementId(i);
                el.children.clear();
                Some(el)
            })
            .collect();

        for i in 0..page.elements.len() {
            let id = ElementId(i);
            let (kind, parent) = match page.get(id) {
                Some(el) => (el.kind, el.parent),
                None => continue,
            };
            match parent {
                None if kind.accepts_parent(None) => page.regions.push(id),
                Some(p) if p != id => {
                    let accepted = page
                        .get(p)
                        .map_or(false, |parent_el| kind.accepts_parent(Some(&parent_el.kind)));
                    if accepted {
                        if let Some(parent_el) = page.slot_mut(p) {
                            parent_el.children.push(id);
                        }
                    } else {
                        log::debug!("element {} has an invalid parent {}", id, p);
                    }
                }
                _ => log::debug!("element {} is not attached to the tree", id),
            }
        }

        let mut regions = std::mem::take(&mut page.regions);
        page.sort_by_parsed_order(&mut regions);
        page.regions = regions;
        for i in 0..page.elements.len() {
            let id = ElementId(i);
            let mut children = match page.slot_mut(id) {
                Some(el) => std::mem::take(&mut el.children),
                None => continue,
            };
            page.sort_by_parsed_order(&mut children);
            if let Some(el) = page.slot_mut(id) {
                el.children = children;
            }
        }
        page.renumber_all();
        page
    }

    fn sort_by_parsed_order(&self, ids: &mut [ElementId]) {
        ids.sort_by_key(|id| (self.get(*id).map_or(usize::MAX, |el| el.reading_order), *id));
    }

    /// Check the hierarchy links: every element sits in the slot its id
    /// names, every listed child exists, names the list owner as parent,
    /// may be placed there and is listed only once.
    ///
    /// Kinds nest strictly, so a page passing this check has no cycles.
    pub fn check_structure(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidPage(message));
        for (slot, el) in self.elements.iter().enumerate() {
            if let Some(el) = el {
                if el.id.0 != slot {
                    return invalid(format!("element in slot {} carries id {}", slot, el.id));
                }
            }
        }

        let mut listed = vec![false; self.elements.len()];
        let lists = std::iter::once((None, self.regions.as_slice()))
            .chain(self.iter().map(|el| (Some(el), el.children.as_slice())));
        for (owner, list) in lists {
            let owner_id = owner.map(|o| o.id);
            for &id in list {
                let Some(child) = self.get(id) else {
                    return invalid(format!("missing element {} is listed as a child", id));
                };
                if listed[id.0] {
                    return invalid(format!("element {} is listed more than once", id));
                }
                listed[id.0] = true;
                if child.parent != owner_id {
                    return invalid(format!(
                        "element {} is listed under {} but names {} as parent",
                        id,
                        owner_id.map_or_else(|| "the page".to_string(), |o| o.to_string()),
                        child.parent.map_or_else(|| "the page".to_string(), |p| p.to_string())
                    ));
                }
                if !child.kind.accepts_parent(owner.map(|o| &o.kind)) {
                    return invalid(format!(
                        "a {} cannot be placed under {}",
                        child.kind,
                        owner.map_or_else(|| "the page".to_string(), |o| o.kind.to_string())
                    ));
                }
            }
        }
        Ok(())
    }

    // ============================================================
    // Lookup
    // ============================================================

    /// Page bounds polygon `(0,0)-(w,0)-(w,h)-(0,h)`.
    pub fn bounds(&self) -> Result<Polygon> {
        let (w, h) = (self.image_width, self.image_height);
        if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
            return Err(Error::MissingPageBounds(w, h));
        }
        Ok(Polygon::rectangle(0.0, 0.0, w, h))
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f64, f64) {
        (self.image_width, self.image_height)
    }

    /// Number of live elements (including orphans).
    pub fn len(&self) -> usize {
        self.elements.iter().flatten().count()
    }

    /// Check if the page holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slot_mut(id)
    }

    fn slot_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Get an element or fail with [`Error::MissingElement`].
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.get(id)
            .ok_or_else(|| Error::MissingElement(id.to_string()))
    }

    /// Mutable variant of [`Page::element`].
    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.slot_mut(id)
            .ok_or_else(|| Error::MissingElement(id.to_string()))
    }

    /// Whether the id refers to a live element.
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Find a live element by its layout-file name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.iter().find(|el| el.name == name).map(|el| el.id)
    }

    /// Top-level regions in reading order.
    pub fn regions(&self) -> &[ElementId] {
        &self.regions
    }

    /// Children of an element in reading order (empty for unknown ids).
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    /// The sibling list an element belongs to, if it is attached.
    pub fn siblings(&self, id: ElementId) -> Option<&[ElementId]> {
        let el = self.get(id)?;
        let list = match el.parent {
            Some(p) => self.children(p),
            None => self.regions.as_slice(),
        };
        list.contains(&id).then_some(list)
    }

    /// All live elements in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().flatten()
    }

    /// The subtree rooted at `id` in pre-order, `id` first.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) || !seen.insert(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every element reachable from the page, in pre-order.
    pub fn tree_order(&self) -> Vec<ElementId> {
        self.regions
            .iter()
            .flat_map(|&r| self.descendants(r))
            .collect()
    }

    /// Text regions and table cells in tree order.
    pub fn line_containers(&self) -> Vec<ElementId> {
        self.tree_order()
            .into_iter()
            .filter(|&id| self.get(id).map_or(false, |el| el.kind.holds_lines()))
            .collect()
    }

    /// Text lines of one container in reading order.
    pub fn lines_of(&self, container: ElementId) -> Vec<ElementId> {
        self.children(container)
            .iter()
            .copied()
            .filter(|&id| self.kind_of(id) == Some(ElementKind::TextLine))
            .collect()
    }

    /// All text lines reachable from the page, in tree order.
    pub fn lines(&self) -> Vec<ElementId> {
        self.line_containers()
            .into_iter()
            .flat_map(|c| self.lines_of(c))
            .collect()
    }

    /// All reachable elements of a kind matching `pred`, in tree order.
    pub fn elements_where(&self, pred: impl Fn(&ElementKind) -> bool) -> Vec<ElementId> {
        self.tree_order()
            .into_iter()
            .filter(|&id| self.get(id).map_or(false, |el| pred(&el.kind)))
            .collect()
    }

    pub fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.get(id).map(|el| el.kind)
    }

    /// Whether the element's parent reference is dangling or names an
    /// element that cannot contain it.
    pub fn is_orphan(&self, id: ElementId) -> bool {
        let Some(el) = self.get(id) else {
            return false;
        };
        match el.parent {
            None => !el.kind.accepts_parent(None),
            Some(p) => match self.get(p) {
                Some(parent) => {
                    !el.kind.accepts_parent(Some(&parent.kind)) || !parent.children.contains(&id)
                }
                None => true,
            },
        }
    }

    /// All orphaned elements in arena order.
    pub fn orphans(&self) -> Vec<ElementId> {
        self.iter()
            .map(|el| el.id)
            .filter(|&id| self.is_orphan(id))
            .collect()
    }

    // ============================================================
    // Construction
    // ============================================================

    /// Append an element under `parent` (`None` for the page).
    pub fn add_child(&mut self, parent: Option<ElementId>, element: Element) -> Result<ElementId> {
        let len = match parent {
            Some(p) => self.element(p)?.children.len(),
            None => self.regions.len(),
        };
        self.insert_child(parent, len, element)
    }

    /// Append a text region to the page.
    pub fn add_text_region(&mut self, name: impl Into<String>, polygon: Polygon) -> ElementId {
        self.push_region(Element::new(ElementKind::TextRegion, name, polygon))
    }

    /// Append a table region to the page.
    pub fn add_table_region(&mut self, name: impl Into<String>, polygon: Polygon) -> ElementId {
        self.push_region(Element::new(ElementKind::TableRegion, name, polygon))
    }

    fn push_region(&mut self, mut element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        element.id = id;
        element.parent = None;
        element.children.clear();
        element.reading_order = self.regions.len();
        self.elements.push(Some(element));
        self.regions.push(id);
        id
    }

    /// Append a cell to a table region.
    pub fn add_table_cell(
        &mut self,
        table: ElementId,
        row: u32,
        col: u32,
        name: impl Into<String>,
        polygon: Polygon,
    ) -> Result<ElementId> {
        self.add_child(
            Some(table),
            Element::new(ElementKind::TableCell { row, col }, name, polygon),
        )
    }

    /// Append a text line to a text region or table cell.
    pub fn add_line(
        &mut self,
        container: ElementId,
        name: impl Into<String>,
        polygon: Polygon,
    ) -> Result<ElementId> {
        self.add_child(
            Some(container),
            Element::new(ElementKind::TextLine, name, polygon),
        )
    }

    /// Append a word to a text line.
    pub fn add_word(
        &mut self,
        line: ElementId,
        name: impl Into<String>,
        polygon: Polygon,
        text: impl Into<String>,
    ) -> Result<ElementId> {
        self.add_child(
            Some(line),
            Element::new(ElementKind::Word, name, polygon).with_text(text),
        )
    }

    /// Append a glyph to a word.
    pub fn add_glyph(
        &mut self,
        word: ElementId,
        name: impl Into<String>,
        polygon: Polygon,
        text: impl Into<String>,
    ) -> Result<ElementId> {
        self.add_child(
            Some(word),
            Element::new(ElementKind::Glyph, name, polygon).with_text(text),
        )
    }

    // ============================================================
    // Structural mutation
    // ============================================================

    /// Insert an element at `index` of `parent`'s child list.
    pub(crate) fn insert_child(
        &mut self,
        parent: Option<ElementId>,
        index: usize,
        mut element: Element,
    ) -> Result<ElementId> {
        let parent_kind = match parent {
            Some(p) => Some(self.element(p)?.kind),
            None => None,
        };
        if !element.kind.accepts_parent(parent_kind.as_ref()) {
            return Err(Error::Other(format!(
                "a {} cannot be placed under {}",
                element.kind,
                parent_kind.map_or_else(|| "the page".to_string(), |k| k.to_string())
            )));
        }

        let id = ElementId(self.elements.len());
        element.id = id;
        element.parent = parent;
        element.children.clear();
        self.elements.push(Some(element));

        let list = self.sibling_list_mut(parent)?;
        let index = index.min(list.len());
        list.insert(index, id);
        self.renumber(parent);
        Ok(id)
    }

    /// Remove the subtree rooted at `id`; returns the number of elements
    /// removed. The former siblings are renumbered.
    pub(crate) fn remove_subtree(&mut self, id: ElementId) -> Result<usize> {
        let parent = self.element(id)?.parent;
        let attached = self.siblings(id).is_some();
        let doomed = self.descendants(id);

        if attached {
            self.sibling_list_mut(parent)?.retain(|&c| c != id);
            self.renumber(parent);
        }
        for d in &doomed {
            if let Some(slot) = self.elements.get_mut(d.0) {
                *slot = None;
            }
        }
        Ok(doomed.len())
    }

    /// Move `child` to the end of `new_parent`'s child list.
    pub(crate) fn move_child(&mut self, child: ElementId, new_parent: ElementId) -> Result<()> {
        let old_parent = self.element(child)?.parent;
        let kind = self.element(child)?.kind;
        let parent_kind = self.element(new_parent)?.kind;
        if !kind.accepts_parent(Some(&parent_kind)) {
            return Err(Error::Other(format!(
                "a {} cannot be placed under a {}",
                kind, parent_kind
            )));
        }
        if self.siblings(child).is_some() {
            self.sibling_list_mut(old_parent)?.retain(|&c| c != child);
            self.renumber(old_parent);
        }
        self.element_mut(new_parent)?.children.push(child);
        self.element_mut(child)?.parent = Some(new_parent);
        self.renumber(Some(new_parent));
        Ok(())
    }

    /// Replace the order of `parent`'s children with `order`, which must be a
    /// permutation of the current list.
    pub fn reorder_children(&mut self, parent: Option<ElementId>, order: Vec<ElementId>) -> Result<()> {
        let current = self.sibling_list_mut(parent)?;
        let mut expected = current.clone();
        let mut given = order.clone();
        expected.sort();
        given.sort();
        if expected != given {
            return Err(Error::Other(
                "new child order is not a permutation of the current children".to_string(),
            ));
        }
        *current = order;
        self.renumber(parent);
        Ok(())
    }

    fn sibling_list_mut(&mut self, parent: Option<ElementId>) -> Result<&mut Vec<ElementId>> {
        match parent {
            Some(p) => Ok(&mut self.element_mut(p)?.children),
            None => Ok(&mut self.regions),
        }
    }

    /// Renumber one sibling list to `0..n` in list order.
    fn renumber(&mut self, parent: Option<ElementId>) {
        let list = match parent {
            Some(p) => self.children(p).to_vec(),
            None => self.regions.clone(),
        };
        for (order, id) in list.into_iter().enumerate() {
            if let Some(el) = self.slot_mut(id) {
                el.reading_order = order;
            }
        }
    }

    fn renumber_all(&mut self) {
        self.renumber(None);
        for i in 0..self.elements.len() {
            if self.elements[i].is_some() {
                self.renumber(Some(ElementId(i)));
            }
        }
    }

    /// Whether every sibling list is numbered `0..n` in list order.
    pub fn has_contiguous_reading_order(&self) -> bool {
        let contiguous = |list: &[ElementId]| {
            list.iter()
                .enumerate()
                .all(|(i, id)| self.get(*id).map_or(false, |el| el.reading_order == i))
        };
        contiguous(&self.regions) && self.iter().all(|el| contiguous(&el.children))
    }

    // ============================================================
    // Text
    // ============================================================

    /// Reading-order text: line texts joined by newlines, regions separated
    /// by blank lines.
    pub fn plain_text(&self) -> String {
        self.regions
            .iter()
            .map(|&region| {
                self.descendants(region)
                    .into_iter()
                    .filter_map(|id| self.get(id))
                    .filter(|el| el.kind == ElementKind::TextLine)
                    .filter_map(|el| el.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
