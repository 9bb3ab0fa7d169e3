//! `vitrine stats`: dashboard counts.

use std::fmt::Write as _;

use vitrine_api::RestCollectionClient;
use vitrine_core::{DashboardSummary, summarize};

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(service: &RestCollectionClient, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner(global, "Counting...".into());
    let result = summarize(service).await;
    spinner.finish_and_clear();
    let summary = result?;

    let out = output::render_single(&global.output, &summary, detail, |s| {
        s.projects.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(summary: &DashboardSummary) -> String {
    let mut out = format!(
        "Projects:      {}\n\
         \x20 completed:   {}\n\
         \x20 ongoing:     {}\n\
         Services:      {}\n\
         Testimonials:  {}",
        summary.projects,
        summary.completed,
        summary.ongoing,
        summary.services,
        summary.testimonials,
    );
    if !summary.by_category.is_empty() {
        out.push_str("\n\nBy category:");
        for (name, count) in &summary.by_category {
            let _ = write!(out, "\n  {name:<20} {count}");
        }
    }
    out
}
