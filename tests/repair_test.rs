//! Integration tests for validation and repair.

use layoutfix::geometry::is_valid;
use layoutfix::process::{IssueKind, RepairOutcome, Severity};
use layoutfix::{
    Baseline, Element, ElementId, ElementKind, Page, Polygon, RepairOptions, Repairer, Validator,
};

fn rect(x0: f64, top: f64, x1: f64, bottom: f64) -> Polygon {
    Polygon::rectangle(x0, top, x1, bottom)
}

/// A page as a parser might deliver it: flat list, parents by index.
fn parsed_page() -> Page {
    let elements = vec![
        // 0: self-intersecting region
        Element::new(
            ElementKind::TextRegion,
            "r1",
            Polygon::from_coords(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]),
        ),
        // 1: region running off the page, counter-clockwise
        Element::new(ElementKind::TextRegion, "r2", rect(100.0, 100.0, 300.0, 180.0).reversed()),
        // 2: collapsed line with a baseline
        Element::new(
            ElementKind::TextLine,
            "r2_l1",
            Polygon::from_coords(&[(110.0, 120.0), (190.0, 120.0), (110.0, 120.0)]),
        )
        .with_parent(ElementId::from_index(1))
        .with_baseline(Baseline::from_coords(&[(110.0, 120.0), (190.0, 120.0)]))
        .with_text("kept"),
        // 3: line whose parent does not exist
        Element::new(ElementKind::TextLine, "lost", rect(0.0, 0.0, 5.0, 5.0))
            .with_parent(ElementId::from_index(99)),
    ];
    Page::from_elements(200.0, 200.0, elements)
}

#[test]
fn test_validator_does_not_mutate() {
    let page = parsed_page();
    let before = page.clone();
    let issues = Validator::new().validate(&page);
    assert_eq!(page, before);

    let has = |name: &str, kind: &IssueKind| {
        issues.iter().any(|i| i.name == name && &i.issue == kind)
    };
    assert!(has("r1", &IssueKind::ZeroArea));
    assert!(has("r2", &IssueKind::ReversedOrientation));
    assert!(has("r2", &IssueKind::OutsidePage));
    assert!(has("r2_l1", &IssueKind::TooFewPoints { distinct: 2 }));
    assert!(has("lost", &IssueKind::Orphaned));
    assert!(issues
        .iter()
        .filter(|i| i.issue == IssueKind::ReversedOrientation)
        .all(|i| i.severity == Severity::Warning));
}

#[test]
fn test_repair_page() {
    let mut page = parsed_page();
    let repairer = Repairer::new(RepairOptions::new().with_height_hint(10.0)).unwrap();
    let report = repairer.repair(&mut page).unwrap();

    let r1 = page.find("r1").unwrap();
    let r1_polygon = &page.element(r1).unwrap().polygon;
    assert!(is_valid(r1_polygon));
    assert!((r1_polygon.area() - 25.0).abs() < 1e-9);

    let r2 = page.find("r2").unwrap();
    let b = page.element(r2).unwrap().polygon.bounds().unwrap();
    assert_eq!((b.x0, b.top, b.x1, b.bottom), (100.0, 100.0, 200.0, 180.0));

    let line = page.find("r2_l1").unwrap();
    assert!(is_valid(&page.element(line).unwrap().polygon));
    assert!(matches!(report.outcome_of("r2_l1"), Some(RepairOutcome::Repaired(_))));

    assert!(matches!(report.outcome_of("lost"), Some(RepairOutcome::Irreparable(_))));
    assert_eq!(report.irreparable().len(), 1);
    assert!(page.find("lost").is_some());

    // Only the orphan is left to complain about.
    let errors: Vec<_> = Validator::new()
        .validate(&page)
        .into_iter()
        .filter(|i| i.is_error())
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].issue, IssueKind::Orphaned);
}

#[test]
fn test_repair_removes_orphans_on_request() {
    let mut page = parsed_page();
    let repairer = Repairer::new(
        RepairOptions::new()
            .with_height_hint(10.0)
            .with_remove_irreparable(true),
    )
    .unwrap();
    let report = repairer.repair(&mut page).unwrap();
    assert_eq!(report.removed, vec!["lost".to_string()]);
    assert!(page.find("lost").is_none());
    assert!(page.orphans().is_empty());
}

#[test]
fn test_structural_only_keeps_reversed_polygons() {
    let mut page = Page::new(100.0, 100.0);
    page.add_text_region("r1", rect(10.0, 10.0, 50.0, 50.0).reversed());
    let before = page.clone();
    let report = Repairer::new(RepairOptions::structural_only())
        .unwrap()
        .repair(&mut page)
        .unwrap();
    assert_eq!(page, before);
    assert_eq!(report.valid_count(), 1);
}
