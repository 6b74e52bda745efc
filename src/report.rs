//! Markdown rendering of a batch run for the terminal.

use crate::fanout::BatchOutcome;
use crate::fanout::batch::PlanSummary;
use crate::markdown::{escape_cell, escape_inline, sanitize_heading};

pub const NO_QUERIES_NOTICE: &str = "No synthetic queries were generated.";

pub fn format_report(outcome: &BatchOutcome) -> String {
    let mut out = format!(
        "# Query fan-out ({}, {} lookup{})\n\n",
        outcome.mode,
        outcome.total_lookups,
        if outcome.total_lookups == 1 { "" } else { "s" }
    );

    format_rows_section(outcome, &mut out);
    format_plans_section(&outcome.plans, &mut out);
    format_errors_section(outcome, &mut out);

    out
}

fn format_rows_section(outcome: &BatchOutcome, out: &mut String) {
    if outcome.is_empty() {
        if outcome.all_failed() {
            out.push_str(&format!(
                "> {NO_QUERIES_NOTICE} Every lookup failed; see Errors below.\n\n"
            ));
        } else {
            out.push_str(&format!("> {NO_QUERIES_NOTICE}\n\n"));
        }
        return;
    }

    let routed = outcome.variant.has_routing();
    out.push_str(&format!("## Synthetic Queries ({})\n\n", outcome.rows.len()));
    if routed {
        out.push_str("| lookup | query | type | user_intent | routing_format |\n");
        out.push_str("|---|---|---|---|---|\n");
    } else {
        out.push_str("| lookup | query | type | user_intent |\n");
        out.push_str("|---|---|---|---|\n");
    }

    for row in &outcome.rows {
        let q = &row.query;
        out.push_str(&format!(
            "| {} | {} | {} | {} |",
            escape_cell(&row.lookup_query),
            escape_cell(&q.query),
            escape_cell(q.query_type.as_str()),
            escape_cell(&q.user_intent),
        ));
        if routed {
            let format = q.routing_format.as_ref().map_or("", |f| f.as_str());
            out.push_str(&format!(" {} |", escape_cell(format)));
        }
        out.push('\n');
    }
    out.push('\n');

    let invalid = outcome.invalid_rows();
    if invalid > 0 {
        out.push_str(&format!(
            "> Warning: {invalid} row(s) have an empty query.\n\n"
        ));
    }

    let off_list = outcome
        .rows
        .iter()
        .filter(|r| {
            !r.query.query_type.is_known()
                || r.query.routing_format.as_ref().is_some_and(|f| !f.is_known())
        })
        .count();
    if off_list > 0 {
        out.push_str(&format!(
            "> Note: {off_list} row(s) use a type or routing format outside the requested labels.\n\n"
        ));
    }
}

fn format_plans_section(plans: &[PlanSummary], out: &mut String) {
    if plans.is_empty() {
        return;
    }

    out.push_str("---\n\n## Generation Plans\n\n");
    for plan in plans {
        let target = plan
            .target_text()
            .map_or_else(|| "N/A".to_string(), |t| escape_inline(&t));
        let reasoning = if plan.reasoning_for_count.is_empty() {
            "Not provided.".to_string()
        } else {
            escape_inline(&plan.reasoning_for_count)
        };

        out.push_str(&format!("### {}\n\n", sanitize_heading(&plan.lookup_query)));
        out.push_str(&format!("- **Target queries:** {target}\n"));
        out.push_str(&format!("- **Actual generated:** {}\n", plan.generated_count));
        out.push_str(&format!("- **Reasoning:** _{reasoning}_\n"));
        if plan.count_mismatch {
            out.push_str(&format!(
                "\n> Warning: model aimed for {target} queries but generated {}.\n",
                plan.generated_count
            ));
        }
        out.push('\n');
    }
}

fn format_errors_section(outcome: &BatchOutcome, out: &mut String) {
    if outcome.errors.is_empty() {
        return;
    }

    out.push_str("---\n\n## Errors\n\n| lookup | error |\n|---|---|\n");
    for err in &outcome.errors {
        out.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&err.lookup_query),
            escape_cell(&err.error)
        ));
    }
    out.push('\n');
}
