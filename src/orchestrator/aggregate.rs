//! Deterministic merging of adapter findings into one report.

use crate::core::{AdapterResult, CerberOutput, ToolMetadata, Violation};

use std::cmp::Ordering;
use std::collections::HashSet;

/// Deduplicates and sorts violations.
///
/// Violations with the same source, id, message, path, line and column
/// collapse into the first one seen. The result is ordered by severity
/// (errors first), then path, line, column and id. Applying this to its own
/// output returns it unchanged.
pub fn aggregate_violations<I>(violations: I) -> Vec<Violation>
where
    I: IntoIterator<Item = Violation>,
{
    let all: Vec<Violation> = violations.into_iter().collect();

    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(all.len());
        all.iter().map(|v| seen.insert(v.dedup_key())).collect()
    };

    let mut unique: Vec<Violation> = all
        .into_iter()
        .zip(keep)
        .filter_map(|(violation, keep)| keep.then_some(violation))
        .collect();

    unique.sort_by(compare_violations);
    unique
}

/// The report ordering.
///
/// Source and message only break ties between findings that agree on every
/// ordering key, so the order is total over deduplicated input.
pub fn compare_violations(a: &Violation, b: &Violation) -> Ordering {
    a.severity
        .rank()
        .cmp(&b.severity.rank())
        .then_with(|| a.path.cmp(&b.path))
        .then_with(|| a.line.cmp(&b.line))
        .then_with(|| a.column.cmp(&b.column))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.message.cmp(&b.message))
}

/// Builds the report for a batch of adapter results.
///
/// `metadata.tools` keeps adapter order; violations are aggregated and the
/// summary is computed from the aggregated list.
pub fn build_output(results: &[AdapterResult]) -> CerberOutput {
    let violations =
        aggregate_violations(results.iter().flat_map(|r| r.violations.iter().cloned()));
    let tools = results.iter().map(ToolMetadata::from).collect();
    CerberOutput::new(violations, tools)
}
