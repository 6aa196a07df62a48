//! Integration tests for the processing pipeline.

use layoutfix::{
    Baseline, BaselineOptions, BufferOptions, DeletionLevel, Error, Page, Pipeline, Polygon,
    RepairOptions, SortOptions, StepReport,
};

fn rect(x0: f64, top: f64, x1: f64, bottom: f64) -> Polygon {
    Polygon::rectangle(x0, top, x1, bottom)
}

/// One region with a short baseline inside a line that overhangs the region.
fn sample_page() -> Page {
    let mut page = Page::new(1000.0, 1000.0);
    let region = page.add_text_region("r1", rect(0.0, 0.0, 50.0, 100.0));
    let line = page.add_line(region, "r1_l1", rect(0.0, 0.0, 50.0, 20.0)).unwrap();
    let el = page.element_mut(line).unwrap();
    el.baseline = Some(Baseline::from_coords(&[(10.0, 10.0), (40.0, 10.0)]));
    el.text = Some("text".into());
    page
}

#[test]
fn test_extend_then_pseudo_polygons() {
    let mut page = sample_page();
    let report = Pipeline::new()
        .extend_baselines(BaselineOptions::new().with_max_extension(100.0))
        .pseudo_polygons(BaselineOptions::new().with_height_hint(10.0))
        .run(&mut page)
        .unwrap();

    let line = page.find("r1_l1").unwrap();
    let el = page.element(line).unwrap();
    assert_eq!(
        el.baseline,
        Some(Baseline::from_coords(&[(0.0, 10.0), (50.0, 10.0)]))
    );
    let b = el.polygon.bounds().unwrap();
    assert_eq!((b.x0, b.top, b.x1, b.bottom), (0.0, 5.0, 50.0, 15.0));
    assert!(matches!(&report.steps[0], StepReport::Baseline(r) if r.processed == 1));
}

#[test]
fn test_buffer_lines_fitted_to_region() {
    let mut page = sample_page();
    Pipeline::new()
        .buffer_lines(BufferOptions::new(5.0))
        .run(&mut page)
        .unwrap();
    let line = page.find("r1_l1").unwrap();
    let b = page.element(line).unwrap().polygon.bounds().unwrap();
    assert_eq!((b.x0, b.top, b.x1, b.bottom), (0.0, 0.0, 50.0, 25.0));
}

#[test]
fn test_full_pipeline_then_delete_words() {
    let mut page = sample_page();
    let line = page.find("r1_l1").unwrap();
    page.add_word(line, "w1", rect(0.0, 0.0, 40.0, 20.0), "text").unwrap();

    let report = Pipeline::new()
        .repair(RepairOptions::new().with_fit_to_parent(true))
        .sort(SortOptions::new())
        .fit_lines(BaselineOptions::new())
        .delete_level(DeletionLevel::Word)
        .run(&mut page)
        .unwrap();

    assert_eq!(report.steps.len(), 4);
    assert!(matches!(&report.steps[3], StepReport::Deletion(d) if d.removed == 1));
    assert!(page.children(line).is_empty());
    assert_eq!(page.element(line).unwrap().text.as_deref(), Some(""));
}

#[test]
fn test_invalid_options_rejected_up_front() {
    let mut page = sample_page();
    let before = page.clone();
    let result = Pipeline::new()
        .delete_level(DeletionLevel::Word)
        .buffer_lines(BufferOptions::new(f64::INFINITY))
        .run(&mut page);
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(page, before);
}

#[test]
fn test_pipeline_serializes() {
    let pipeline = Pipeline::new()
        .sort(SortOptions::new().with_horizontal_gap(20.0))
        .clear_text(DeletionLevel::Word);
    let json = serde_json::to_string(&pipeline).unwrap();
    let back: Pipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pipeline);
}

#[test]
fn test_separate_lines_after_unclipped_buffer() {
    let mut page = Page::new(1000.0, 1000.0);
    let region = page.add_text_region("r1", rect(0.0, 0.0, 200.0, 200.0));
    let upper = page.add_line(region, "r1_l1", rect(0.0, 0.0, 100.0, 20.0)).unwrap();
    let lower = page.add_line(region, "r1_l2", rect(0.0, 24.0, 100.0, 44.0)).unwrap();

    let report = Pipeline::new()
        .buffer_lines(
            BufferOptions::new(4.0)
                .with_fit_to_parent(false)
                .with_separate_overlaps(false),
        )
        .separate_lines()
        .run(&mut page)
        .unwrap();
    assert!(matches!(&report.steps[1], StepReport::Baseline(r) if r.processed == 1));

    let a = page.element(upper).unwrap().polygon.bounds().unwrap();
    let b = page.element(lower).unwrap().polygon.bounds().unwrap();
    assert!((a.bottom - 22.0).abs() < 1e-9);
    assert!((b.top - 22.0).abs() < 1e-9);
}
