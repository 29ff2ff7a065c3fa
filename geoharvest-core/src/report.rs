// Plain-text summary of a harvest run

use crate::harvest::HarvestSummary;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn format_elapsed(summary: &HarvestSummary) -> String {
    let millis = summary.elapsed().num_milliseconds().max(0);
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

/// Generate a harvest report from a summary
pub fn generate_harvest_report(summary: &HarvestSummary, output: &Path) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  State: {}\n", summary.state.as_str()));
    report.push_str(&format!("  Records written: {}\n", summary.records_written));
    report.push_str(&format!("  URLs fetched: {}\n", summary.urls_fetched));
    report.push_str(&format!(
        "  Clusters expanded: {}\n",
        summary.clusters_expanded
    ));
    report.push_str(&format!("  Peak queue length: {}\n", summary.max_queue_len));
    report.push_str(&format!("  Elapsed: {}\n", format_elapsed(summary)));
    report.push_str(&format!("  Output: {}\n", output.display()));

    report.push_str(&format!("\n## Fields ({})\n", summary.fields.len()));
    if summary.fields.is_empty() {
        report.push_str("  (none)\n");
    }
    for field in &summary.fields {
        report.push_str(&format!("  {}\n", field));
    }

    if let Some(ref error) = summary.error {
        report.push_str("\n## Aborted\n");
        report.push_str(&format!("  {}\n", error));
        report.push_str(&format!(
            "  {} record(s) written before the failure were kept\n",
            summary.records_written
        ));
    }

    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
    report
}
