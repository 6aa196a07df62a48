//! Integration tests for batch processing of page files.

use layoutfix::batch::{read_page, write_page};
use layoutfix::{
    BatchOptions, BatchProcessor, DocumentStatus, Error, Page, Polygon, Repairer, SortOptions,
};
use std::path::Path;

fn write_sample(dir: &Path, name: &str, width: f64) -> String {
    let mut page = Page::new(width, 100.0).with_filename(format!("{}.png", name));
    let region = page.add_text_region("r1", Polygon::rectangle(0.0, 0.0, 150.0, 50.0).reversed());
    page.add_line(region, "r1_l1", Polygon::rectangle(0.0, 0.0, 150.0, 20.0))
        .unwrap();
    let path = dir.join(format!("{}.json", name));
    write_page(&path, &page).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_batch_repairs_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<String> = (0..6)
        .map(|i| write_sample(dir.path(), &format!("page{}", i), 200.0))
        .collect();

    let repairer = Repairer::default();
    let processor = BatchProcessor::new(BatchOptions::new().with_workers(3));
    let report = processor
        .run(
            paths.clone(),
            |path| read_page(path),
            |page, _| repairer.repair(page),
            |path, page| write_page(path, page),
        )
        .unwrap();

    assert_eq!(report.committed(), 6);
    for path in &paths {
        let page = read_page(path).unwrap();
        let region = page.regions()[0];
        assert!(page.element(region).unwrap().polygon.signed_area() > 0.0);
    }
}

#[test]
fn test_failing_page_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_sample(dir.path(), "good", 200.0);
    // A page without size cannot be clipped to its bounds.
    let bad = write_sample(dir.path(), "bad", 0.0);
    let bad_before = std::fs::read_to_string(&bad).unwrap();

    let repairer = Repairer::default();
    let report = BatchProcessor::new(BatchOptions::new().with_workers(2))
        .run(
            vec![good.clone(), bad.clone()],
            |path| read_page(path),
            |page, _| repairer.repair(page),
            |path, page| write_page(path, page),
        )
        .unwrap();

    assert_eq!(report.documents[0].status, DocumentStatus::Committed);
    assert!(matches!(report.documents[1].status, DocumentStatus::Failed(_)));
    assert_eq!(std::fs::read_to_string(&bad).unwrap(), bad_before);
}

#[test]
fn test_missing_file_fails_document_only() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_sample(dir.path(), "good", 200.0);
    let missing = dir.path().join("missing.json").to_string_lossy().into_owned();

    let report = BatchProcessor::default()
        .run(
            vec![good, missing.clone()],
            |path| read_page(path),
            |page, _| {
                layoutfix::ReadingOrderSorter::new(SortOptions::new())?.sort_page(page)
            },
            |_, _| Ok(()),
        )
        .unwrap();
    assert_eq!(report.committed(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.get(&missing).is_some());
}

#[test]
fn test_cancellation_from_process_closure() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<String> = (0..4)
        .map(|i| write_sample(dir.path(), &format!("page{}", i), 200.0))
        .collect();

    let processor = BatchProcessor::new(BatchOptions::new().with_workers(1));
    let report = processor
        .run(
            paths,
            |path| read_page(path),
            |_, token| {
                token.cancel();
                token.check("page")
            },
            |_, _| -> layoutfix::Result<()> { Err(Error::Other("must not commit".into())) },
        )
        .unwrap();
    assert_eq!(report.cancelled(), 4);
    assert_eq!(report.committed(), 0);
}

#[test]
fn test_corrupted_page_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "page", 200.0);
    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    // Make the line list its own region as a child.
    value["elements"][1]["children"] = serde_json::json!([0]);
    std::fs::write(&path, value.to_string()).unwrap();

    match read_page(&path) {
        Err(Error::Json(e)) => assert!(e.to_string().contains("Invalid page structure")),
        other => panic!("expected a structure error, got {:?}", other.map(|p| p.len())),
    }
}
