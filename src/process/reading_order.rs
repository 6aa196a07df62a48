//! Reading-order sorting of text lines with gap-based merge and split.
//!
//! Lines of one container are grouped into rows by their vertical
//! centroids, ordered left to right within a row, merged across small
//! horizontal gaps, split at wide word gaps, and finally renumbered.

use super::baseline::{cut_baseline, fit_to_parent, geometry_bounds};
use super::options::{SortOptions, DEFAULT_LINE_HEIGHT};
use crate::error::Result;
use crate::geometry::{convex_hull, is_simple, union_all, BBox, Baseline, Point, Polygon};
use crate::model::{Element, ElementId, ElementKind, Page};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper bound on group/merge/split rounds per container.
const MAX_SORT_ROUNDS: usize = 8;

/// Two lines merged into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// Line that absorbed the other
    pub kept: String,
    /// Line that was removed
    pub removed: String,
}

/// One line split into parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Original line (now the first part)
    pub original: String,
    /// Names of all parts, left to right
    pub parts: Vec<String>,
}

/// Outcome of sorting one page (or container).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SortReport {
    /// Number of containers sorted
    pub containers: usize,
    /// Number of rows found
    pub rows: usize,
    pub merged: Vec<MergeRecord>,
    pub split: Vec<SplitRecord>,
    /// Configuration and geometry warnings
    pub warnings: Vec<String>,
}

impl SortReport {
    fn absorb(&mut self, other: SortReport) {
        self.containers += other.containers;
        self.rows += other.rows;
        self.merged.extend(other.merged);
        self.split.extend(other.split);
        self.warnings.extend(other.warnings);
    }

    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            log::warn!("{}", message);
            self.warnings.push(message);
        }
    }
}

/// Sort key data of one line.
#[derive(Debug, Clone, Copy)]
struct LineInfo {
    id: ElementId,
    /// Position in the container before sorting
    index: usize,
    centroid_y: f64,
    bbox: BBox,
}

/// Vertical centroid of a line: mean y of its baseline if it has one, else
/// of its polygon vertices.
pub fn vertical_centroid(line: &Element) -> Option<f64> {
    line.baseline
        .as_ref()
        .and_then(Baseline::mean_y)
        .or_else(|| line.polygon.vertex_mean().map(|p| p.y))
}

/// Computes reading order within each text container of a page.
#[derive(Debug, Clone, Default)]
pub struct ReadingOrderSorter {
    options: SortOptions,
}

impl ReadingOrderSorter {
    /// Create a sorter; fails on invalid thresholds.
    pub fn new(options: SortOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Sort every text region and table cell of the page.
    pub fn sort_page(&self, page: &mut Page) -> Result<SortReport> {
        let mut report = SortReport::default();
        for container in page.line_containers() {
            report.absorb(self.sort_container(page, container)?);
        }
        Ok(report)
    }

    /// Sort the lines of one container.
    ///
    /// Merging and splitting move line centroids, so rows are regrouped
    /// until a round changes nothing; the final order is then exactly what
    /// a fresh sort of the result would produce.
    pub fn sort_container(&self, page: &mut Page, container: ElementId) -> Result<SortReport> {
        let mut report = SortReport {
            containers: 1,
            ..SortReport::default()
        };

        let mut round = 0;
        loop {
            let (infos, unplaced, others) = Self::line_infos(page, container)?;
            let rows = self.group_rows(infos);
            report.rows = rows.len();

            let (merged_before, split_before) = (report.merged.len(), report.split.len());
            let mut order = Vec::with_capacity(page.children(container).len());
            for row in rows {
                let row = self.merge_row(page, row, &mut report)?;
                for info in row {
                    let parts = self.split_line(page, container, info.id, &mut report)?;
                    order.extend(parts);
                }
            }
            order.extend(unplaced);
            order.extend(others);
            page.reorder_children(Some(container), order)?;

            if report.merged.len() == merged_before && report.split.len() == split_before {
                break;
            }
            round += 1;
            if round >= MAX_SORT_ROUNDS {
                let name = page.element(container)?.name.clone();
                report.warn(format!(
                    "{}: lines still merging or splitting after {} rounds",
                    name, MAX_SORT_ROUNDS
                ));
                break;
            }
            log::debug!("regrouping rows after round {}", round);
        }
        Ok(report)
    }

    /// Sort keys of the container's lines, plus the lines without geometry
    /// and the non-line children, both in their current order.
    fn line_infos(
        page: &Page,
        container: ElementId,
    ) -> Result<(Vec<LineInfo>, Vec<ElementId>, Vec<ElementId>)> {
        let mut infos = Vec::new();
        let mut unplaced = Vec::new();
        let mut others = Vec::new();
        for (index, &id) in page.children(container).iter().enumerate() {
            let el = page.element(id)?;
            if el.kind != ElementKind::TextLine {
                others.push(id);
                continue;
            }
            let bbox = geometry_bounds(&el.polygon, el.baseline.as_ref());
            match (vertical_centroid(el), bbox) {
                (Some(centroid_y), Some(bbox)) => infos.push(LineInfo {
                    id,
                    index,
                    centroid_y,
                    bbox,
                }),
                _ => {
                    log::debug!("line {} has no geometry, keeping it last", el.name);
                    unplaced.push(id);
                }
            }
        }
        Ok((infos, unplaced, others))
    }

    /// Group lines into rows, top to bottom, each row left to right.
    fn group_rows(&self, mut infos: Vec<LineInfo>) -> Vec<Vec<LineInfo>> {
        infos.sort_by(|a, b| {
            a.centroid_y
                .partial_cmp(&b.centroid_y)
                .unwrap_or(Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
                .then(a.index.cmp(&b.index))
        });

        let mut rows: Vec<Vec<LineInfo>> = Vec::new();
        let mut prev_y: Option<f64> = None;
        for info in infos {
            match (rows.last_mut(), prev_y) {
                (Some(row), Some(y)) if info.centroid_y - y <= self.options.vertical_gap => {
                    row.push(info);
                }
                _ => {
                    if let Some(y) = prev_y {
                        log::debug!(
                            "row break at y={:.1} (gap {:.1})",
                            info.centroid_y,
                            info.centroid_y - y
                        );
                    }
                    rows.push(vec![info]);
                }
            }
            prev_y = Some(info.centroid_y);
        }

        for row in &mut rows {
            row.sort_by(|a, b| {
                a.bbox
                    .x0
                    .partial_cmp(&b.bbox.x0)
                    .unwrap_or(Ordering::Equal)
                    .then(a.index.cmp(&b.index))
            });
        }
        rows
    }

    /// Merge adjacent lines of a row whose horizontal gap is below
    /// `merge_gap`.
    fn merge_row(
        &self,
        page: &mut Page,
        row: Vec<LineInfo>,
        report: &mut SortReport,
    ) -> Result<Vec<LineInfo>> {
        let Some(merge_gap) = self.options.merge_gap else {
            return Ok(row);
        };

        let mut out: Vec<LineInfo> = Vec::with_capacity(row.len());
        for info in row {
            if let Some(last) = out.last_mut() {
                let gap = last.bbox.horizontal_gap_to(&info.bbox);
                if gap < merge_gap {
                    let kept = page.element(last.id)?.name.clone();
                    let removed = page.element(info.id)?.name.clone();
                    log::debug!("merging {} and {} (gap {:.1})", kept, removed, gap);
                    let joined = last.bbox.union(&info.bbox);
                    last.bbox = merge_lines(page, last.id, info.id)?.unwrap_or(joined);
                    report.merged.push(MergeRecord { kept, removed });
                    continue;
                }
            }
            out.push(info);
        }
        Ok(out)
    }

    /// Split a line at word gaps wider than `split_gap`; returns the ids of
    /// the resulting lines, left to right.
    fn split_line(
        &self,
        page: &mut Page,
        container: ElementId,
        line_id: ElementId,
        report: &mut SortReport,
    ) -> Result<Vec<ElementId>> {
        let Some(split_gap) = self.options.split_gap else {
            return Ok(vec![line_id]);
        };

        let words: Vec<ElementId> = page
            .children(line_id)
            .iter()
            .copied()
            .filter(|&id| page.kind_of(id) == Some(ElementKind::Word))
            .collect();
        if words.len() < 2 {
            return Ok(vec![line_id]);
        }
        let boxes: Vec<Option<BBox>> = words
            .iter()
            .map(|&w| page.get(w).and_then(|el| el.polygon.bounds()))
            .collect();

        let line = page.element(line_id)?.clone();

        // Partition word indices at qualifying gaps.
        let mut parts: Vec<Vec<usize>> = vec![vec![0]];
        let mut part_x1 = boxes[0].map(|b| b.x1);
        for i in 1..words.len() {
            let gap = match (part_x1, boxes[i]) {
                (Some(x1), Some(b)) => Some(b.x0 - x1),
                _ => None,
            };
            let cut = match gap {
                Some(gap) if gap > split_gap => match self.options.merge_gap {
                    Some(merge_gap) if gap < merge_gap => {
                        report.warn(format!(
                            "{}: word gap {:.1} is both above split_gap {} and below merge_gap {}, not splitting",
                            line.name, gap, split_gap, merge_gap
                        ));
                        false
                    }
                    _ => true,
                },
                _ => false,
            };
            if cut {
                parts.push(vec![i]);
                part_x1 = boxes[i].map(|b| b.x1);
            } else {
                if let Some(last) = parts.last_mut() {
                    last.push(i);
                }
                part_x1 = match (part_x1, boxes[i]) {
                    (Some(x1), Some(b)) => Some(x1.max(b.x1)),
                    (x1, b) => x1.or(b.map(|b| b.x1)),
                };
            }
        }
        if parts.len() == 1 {
            return Ok(vec![line_id]);
        }

        let word_box_union = boxes
            .iter()
            .flatten()
            .copied()
            .reduce(|a, b| a.union(&b));
        let Some(line_box) =
            geometry_bounds(&line.polygon, line.baseline.as_ref()).or(word_box_union)
        else {
            return Ok(vec![line_id]);
        };
        let height = self.options.height_hint.unwrap_or(if line_box.height() > 0.0 {
            line_box.height()
        } else {
            DEFAULT_LINE_HEIGHT
        });
        let texts = part_texts(page, &line, &words, &parts);

        let last_part = parts.len() - 1;
        let mut ids = Vec::with_capacity(parts.len());
        let mut names = Vec::with_capacity(parts.len());
        for (k, part) in parts.iter().enumerate() {
            let part_box = part
                .iter()
                .filter_map(|&i| boxes[i])
                .reduce(|a, b| a.union(&b))
                .unwrap_or(line_box);
            let x_lo = if k == 0 { line_box.x0 } else { part_box.x0 };
            let x_hi = if k == last_part { line_box.x1 } else { part_box.x1 };

            let strip = Polygon::rectangle(x_lo, line_box.top - 1.0, x_hi, line_box.bottom + 1.0);
            let segment = line
                .baseline
                .as_ref()
                .and_then(|b| cut_baseline(b, x_lo, x_hi));
            let polygon = match fit_to_parent(&line.polygon, &strip, segment.as_ref(), height) {
                Ok(p) => p,
                Err(e) => {
                    log::debug!("{}: part {} not re-fitted ({}), using word bounds", line.name, k, e);
                    Polygon::rectangle(x_lo, part_box.top, x_hi, part_box.bottom)
                }
            };
            let text = texts.as_ref().map(|t| t[k].clone());

            let id = if k == 0 {
                let el = page.element_mut(line_id)?;
                el.polygon = polygon;
                if line.baseline.is_some() {
                    el.baseline = segment;
                }
                if texts.is_some() {
                    el.text = text;
                }
                line_id
            } else {
                let mut el = Element::new(
                    ElementKind::TextLine,
                    format!("{}_{}", line.name, k),
                    polygon,
                );
                el.baseline = segment;
                el.text = text;
                el.attributes = line.attributes.clone();
                let position = page
                    .children(container)
                    .iter()
                    .position(|&c| c == line_id)
                    .map_or(usize::MAX, |p| p + k);
                let new_id = page.insert_child(Some(container), position, el)?;
                for &i in part {
                    page.move_child(words[i], new_id)?;
                }
                new_id
            };
            names.push(page.element(id)?.name.clone());
            ids.push(id);
        }

        if texts.is_none() {
            report.warn(format!(
                "{}: word texts do not match the line text, later parts have no text",
                line.name
            ));
        }
        log::debug!("split {} into {} parts", line.name, names.len());
        report.split.push(SplitRecord {
            original: line.name.clone(),
            parts: names,
        });
        Ok(ids)
    }
}

/// Text of each split part: the words' own texts, or the line text's
/// whitespace tokens when they correspond one to one with the words.
fn part_texts(page: &Page, line: &Element, words: &[ElementId], parts: &[Vec<usize>]) -> Option<Vec<String>> {
    let word_texts: Option<Vec<String>> = words
        .iter()
        .map(|&w| page.get(w).and_then(|el| el.text.clone()))
        .collect();
    let tokens: Vec<String> = match word_texts {
        Some(texts) => texts,
        None => {
            let tokens: Vec<String> = line
                .text
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if tokens.len() != words.len() {
                return None;
            }
            tokens
        }
    };
    Some(
        parts
            .iter()
            .map(|part| {
                part.iter()
                    .map(|&i| tokens[i].as_str())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect(),
    )
}

/// Merge `right` into `left`: polygon union, concatenated baselines, words
/// re-parented and texts joined by one space. `right` is removed. Returns
/// the bounds of the merged line, `None` if neither line had geometry.
pub fn merge_lines(page: &mut Page, left: ElementId, right: ElementId) -> Result<Option<BBox>> {
    let a = page.element(left)?.clone();
    let b = page.element(right)?.clone();

    let polygon = merged_polygon(&a.polygon, &b.polygon);
    let baseline = match (a.baseline, b.baseline) {
        (Some(x), Some(y)) => {
            let mut points = x.into_points();
            points.extend(y.into_points());
            points.sort_by(|p, q| p.x.partial_cmp(&q.x).unwrap_or(Ordering::Equal));
            Some(Baseline::new(points))
        }
        (x, y) => x.or(y),
    };
    let text = match (a.text, b.text) {
        (Some(x), Some(y)) => {
            let joined = [x.trim(), y.trim()]
                .into_iter()
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined)
        }
        (x, y) => x.or(y),
    };

    for word in page.children(right).to_vec() {
        page.move_child(word, left)?;
    }
    page.remove_subtree(right)?;

    let bbox = geometry_bounds(&polygon, baseline.as_ref());
    let el = page.element_mut(left)?;
    el.polygon = polygon;
    el.baseline = baseline;
    el.text = text;
    Ok(bbox)
}

/// Union of two line polygons, bridged across the horizontal gap between
/// them; the convex hull when the union stays multi-part.
fn merged_polygon(a: &Polygon, b: &Polygon) -> Polygon {
    let all_points = || -> Vec<Point> { a.points().iter().chain(b.points()).copied().collect() };

    let (simple_a, simple_b) = (is_simple(a), is_simple(b));
    if !simple_a || !simple_b {
        let hull = convex_hull(&all_points());
        if is_simple(&hull) {
            return hull;
        }
        return if simple_a { a.clone() } else { b.clone() };
    }

    let (Some(ba), Some(bb)) = (a.bounds(), b.bounds()) else {
        return convex_hull(&all_points());
    };
    let (left, right) = if ba.x0 <= bb.x0 { (ba, bb) } else { (bb, ba) };

    let mut parts = vec![a.clone(), b.clone()];
    if left.x1 < right.x0 {
        let (mut top, mut bottom) = (left.top.max(right.top), left.bottom.min(right.bottom));
        if top >= bottom {
            top = left.top.min(right.top);
            bottom = left.bottom.max(right.bottom);
        }
        parts.push(Polygon::rectangle(left.x1, top, right.x0, bottom));
    }

    match union_all(&parts) {
        Some(merged) => merged,
        None => {
            log::debug!("merged polygon is multi-part, using the convex hull");
            convex_hull(&all_points())
        }
    }
}
