//! Integration tests for entity deletion.

use layoutfix::process::{clear_text, delete, delete_level};
use layoutfix::{DeletionLevel, ElementId, Page, Polygon};

fn rect(x0: f64, top: f64, x1: f64, bottom: f64) -> Polygon {
    Polygon::rectangle(x0, top, x1, bottom)
}

/// Two regions; the first holds two lines of three words each.
fn sample_page() -> (Page, Vec<ElementId>, Vec<ElementId>) {
    let mut page = Page::new(1000.0, 1000.0);
    let r1 = page.add_text_region("r1", rect(0.0, 0.0, 600.0, 100.0));
    let r2 = page.add_text_region("r2", rect(0.0, 200.0, 600.0, 300.0));
    let mut lines = Vec::new();
    for (i, text) in ["one two three", "four five six"].iter().enumerate() {
        let y = i as f64 * 40.0;
        let line = page
            .add_line(r1, format!("r1_l{}", i), rect(0.0, y, 600.0, y + 20.0))
            .unwrap();
        page.element_mut(line).unwrap().text = Some(text.to_string());
        for (j, word) in text.split(' ').enumerate() {
            let x = j as f64 * 200.0;
            page.add_word(line, format!("r1_l{}_w{}", i, j), rect(x, y, x + 150.0, y + 20.0), word)
                .unwrap();
        }
        lines.push(line);
    }
    (page, vec![r1, r2], lines)
}

#[test]
fn test_delete_keeps_reading_order_contiguous() {
    let (mut page, regions, lines) = sample_page();
    let middle = page.children(lines[0])[1];
    delete(&mut page, middle).unwrap();
    assert!(page.has_contiguous_reading_order());

    delete(&mut page, regions[0]).unwrap();
    assert!(page.has_contiguous_reading_order());
    assert_eq!(page.regions(), &[regions[1]]);
    assert_eq!(page.element(regions[1]).unwrap().reading_order(), 0);
}

#[test]
fn test_delete_middle_word() {
    let (mut page, _, lines) = sample_page();
    let middle = page.children(lines[0])[1];
    let report = delete(&mut page, middle).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(page.element(lines[0]).unwrap().text.as_deref(), Some("one three"));
    assert_eq!(page.plain_text(), "one three\nfour five six");
}

#[test]
fn test_delete_last_word_of_line() {
    let (mut page, _, lines) = sample_page();
    let last = page.children(lines[1])[2];
    delete(&mut page, last).unwrap();
    assert_eq!(page.element(lines[1]).unwrap().text.as_deref(), Some("four five"));
}

#[test]
fn test_delete_level_lines() {
    let (mut page, regions, _) = sample_page();
    let report = delete_level(&mut page, DeletionLevel::Line).unwrap();
    assert_eq!(report.removed, 8);
    assert!(page.children(regions[0]).is_empty());
    assert_eq!(page.len(), 2);
    assert_eq!(page.plain_text(), "");
}

#[test]
fn test_clear_text_region_level() {
    let (mut page, _, _) = sample_page();
    let cleared = clear_text(&mut page, DeletionLevel::Region);
    assert_eq!(cleared, 8);
    assert_eq!(page.len(), 10);
    assert_eq!(page.plain_text(), "");
}
