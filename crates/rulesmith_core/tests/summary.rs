use std::time::Duration;

use pretty_assertions::assert_eq;
use rulesmith_core::{render_report, ConversionResult, RunSummary};

fn sec(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn counts_always_sum_to_total() {
    let results = vec![
        ConversionResult::success("a.yml", "detect:\n".into(), sec(1)),
        ConversionResult::partial("b.yml", "detect:\n".into(), "respond tool error", sec(2)),
        ConversionResult::failed("c.yml", "MCP Error -32000: auth rejected", sec(0)),
    ];
    let summary = RunSummary::from_results(results, sec(3));

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.succeeded + summary.failed, summary.total);
}

#[test]
fn empty_run_is_a_valid_summary() {
    let summary = RunSummary::from_results(Vec::new(), sec(0));
    assert_eq!(summary.total, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert!(summary.success_rate().abs() < f64::EPSILON);
}

#[test]
fn report_lists_items_in_input_order_with_verbatim_errors() {
    rulesmith_logging::initialize_for_tests();

    let results = vec![
        ConversionResult::success("01_first.yml", "detect:\n".into(), sec(1)),
        ConversionResult::failed("02_second.yml", "MCP Error -32000: auth rejected", sec(0)),
        ConversionResult::success("03_third.yml", "detect:\n".into(), sec(1)),
    ];
    let summary = RunSummary::from_results(results, sec(2));
    let report = render_report(&summary, "2026-08-27 12:00:00");

    let first = report.find("01_first.yml").unwrap();
    let second = report.find("02_second.yml").unwrap();
    let third = report.find("03_third.yml").unwrap();
    assert!(first < second && second < third);

    assert!(report.contains("Total rules processed: 3"));
    assert!(report.contains("Successfully converted: 2"));
    assert!(report.contains("Failed conversions: 1"));
    assert!(report.contains("Error: MCP Error -32000: auth rejected"));
    assert!(report.contains("Generated: 2026-08-27 12:00:00"));
}

#[test]
fn partial_results_appear_in_the_errors_section() {
    let results = vec![ConversionResult::partial(
        "x.yml",
        "detect:\n".into(),
        "respond section timed out",
        sec(5),
    )];
    let summary = RunSummary::from_results(results, sec(5));
    let report = render_report(&summary, "now");

    assert!(report.contains("x.yml ... partial"));
    assert!(report.contains("Error: respond section timed out"));
}
