//! Removal of layout entities with text bookkeeping.
//!
//! Deleting a word or glyph also removes its text from the enclosing line
//! (and word), so exported text stays consistent with the remaining tree.

use super::options::DeletionLevel;
use crate::error::Result;
use crate::model::{ElementId, ElementKind, Page};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;

fn token_regex() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\S+").ok()).as_ref()
}

/// Outcome of a deletion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Number of elements removed, descendants included
    pub removed: usize,

    /// Elements whose text was rewritten
    pub updated_texts: Vec<ElementId>,
}

impl DeletionReport {
    fn absorb(&mut self, other: DeletionReport) {
        self.removed += other.removed;
        for id in other.updated_texts {
            if !self.updated_texts.contains(&id) {
                self.updated_texts.push(id);
            }
        }
    }
}

/// Remove the subtree rooted at `id`.
///
/// Former siblings are renumbered. Deleting a word removes its text from the
/// line; deleting a glyph removes it from the word and the line.
///
/// # Errors
///
/// [`Error::MissingElement`](crate::Error::MissingElement) if `id` is not a
/// live element.
pub fn delete(page: &mut Page, id: ElementId) -> Result<DeletionReport> {
    let el = page.element(id)?;
    let kind = el.kind;
    let parent = el.parent();
    let text = el.text.clone().unwrap_or_default();
    let attached = page.siblings(id).is_some();

    // Text edits are computed before the element leaves its sibling list.
    let mut edits: Vec<(ElementId, String)> = Vec::new();
    if attached && !text.is_empty() {
        if let Some(parent) = parent {
            let position = same_text_position(page, id, &text);
            match kind {
                ElementKind::Word => {
                    if let Some(updated) = remove_word_text(page, parent, &text, position) {
                        edits.push((parent, updated));
                    }
                }
                ElementKind::Glyph => edits.extend(glyph_edits(page, parent, &text, position)),
                _ => {}
            }
        }
    }

    let removed = page.remove_subtree(id)?;
    let mut report = DeletionReport {
        removed,
        updated_texts: Vec::new(),
    };
    for (target, text) in edits {
        page.element_mut(target)?.text = Some(text);
        report.updated_texts.push(target);
    }
    log::debug!("deleted {} ({} elements)", id, removed);
    Ok(report)
}

/// Delete every element of a level.
pub fn delete_level(page: &mut Page, level: DeletionLevel) -> Result<DeletionReport> {
    let kind_matches = |kind: &ElementKind| match level {
        DeletionLevel::Region => kind.is_region(),
        DeletionLevel::Line => *kind == ElementKind::TextLine,
        DeletionLevel::Word => *kind == ElementKind::Word,
    };
    let targets: Vec<ElementId> = page
        .iter()
        .filter(|el| kind_matches(&el.kind))
        .map(|el| el.id())
        .collect();

    let mut report = DeletionReport::default();
    for id in targets {
        // A target may already be gone with an earlier subtree.
        if page.contains(id) {
            report.absorb(delete(page, id)?);
        }
    }
    log::info!("deleted every {} ({} elements)", level, report.removed);
    Ok(report)
}

/// Erase the text at a level and below while keeping the geometry.
///
/// `Region` and `Line` clear lines, words and glyphs; `Word` clears words and
/// glyphs. Returns the number of elements whose text was erased.
pub fn clear_text(page: &mut Page, level: DeletionLevel) -> usize {
    let targets: Vec<ElementId> = page
        .iter()
        .filter(|el| match level {
            DeletionLevel::Region | DeletionLevel::Line => el.kind.is_text_bearing(),
            DeletionLevel::Word => matches!(el.kind, ElementKind::Word | ElementKind::Glyph),
        })
        .filter(|el| el.text.is_some())
        .map(|el| el.id())
        .collect();
    for &id in &targets {
        if let Some(el) = page.get_mut(id) {
            el.text = None;
        }
    }
    targets.len()
}

/// Number of earlier siblings carrying the same text.
fn same_text_position(page: &Page, id: ElementId, text: &str) -> usize {
    page.siblings(id)
        .unwrap_or(&[])
        .iter()
        .take_while(|&&s| s != id)
        .filter(|&&s| page.get(s).and_then(|el| el.text.as_deref()) == Some(text))
        .count()
}

/// Line text with the `position`-th occurrence of `word` removed.
fn remove_word_text(page: &Page, line: ElementId, word: &str, position: usize) -> Option<String> {
    let line_text = page.get(line)?.text.as_deref()?;
    let span = nth_token(line_text, word, position)?;
    Some(splice(line_text, span, ""))
}

/// New texts for a glyph's word and line.
fn glyph_edits(
    page: &Page,
    word: ElementId,
    glyph: &str,
    position: usize,
) -> Vec<(ElementId, String)> {
    let Some(word_el) = page.get(word) else {
        return Vec::new();
    };
    let Some(old_word) = word_el.text.as_deref() else {
        return Vec::new();
    };
    let Some(span) = old_word.match_indices(glyph).nth(position).map(|(at, s)| at..at + s.len())
    else {
        return Vec::new();
    };
    let new_word = splice(old_word, span, "");
    let mut edits = Vec::new();

    if let Some(line) = word_el.parent() {
        let word_position = same_text_position(page, word, old_word);
        let line_text = page.get(line).and_then(|el| el.text.as_deref());
        if let Some(line_text) = line_text {
            if let Some(span) = nth_token(line_text, old_word, word_position) {
                edits.push((line, splice(line_text, span, &new_word)));
            }
        }
    }
    edits.push((word, new_word));
    edits
}

/// Byte span of the `n`-th whitespace-delimited token equal to `token`,
/// falling back to plain substring matches.
fn nth_token(text: &str, token: &str, n: usize) -> Option<Range<usize>> {
    if let Some(re) = token_regex() {
        if let Some(m) = re
            .find_iter(text)
            .filter(|m| m.as_str() == token)
            .nth(n)
        {
            return Some(m.range());
        }
    }
    text.match_indices(token)
        .nth(n)
        .map(|(at, s)| at..at + s.len())
}

/// Replace `span` of `text` with `replacement`.
///
/// When the removed text was whitespace-delimited, the whitespace around the
/// cut collapses to one space, or to nothing at either end of the text.
fn splice(text: &str, span: Range<usize>, replacement: &str) -> String {
    let (head, tail) = (&text[..span.start], &text[span.end..]);
    if !replacement.is_empty() {
        return format!("{}{}{}", head, replacement, tail);
    }
    let left = head.trim_end();
    let right = tail.trim_start();
    let separated = left.len() != head.len() || right.len() != tail.len();
    if left.is_empty() || right.is_empty() {
        format!("{}{}", left, right)
    } else if separated {
        format!("{} {}", left, right)
    } else {
        format!("{}{}", left, right)
    }
}
