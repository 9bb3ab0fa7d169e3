// ── Dashboard summary ──
//
// Headline counts across the three collections. The queries are
// independent and run concurrently; any one failing fails the summary.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use vitrine_api::{CollectionService, Query};

use crate::convert::items_from_records;
use crate::error::CoreError;
use crate::filter::Filter;
use crate::model::ItemStatus;

/// Collection counts shown on the admin overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub projects: usize,
    pub services: usize,
    pub testimonials: usize,
    pub completed: usize,
    pub ongoing: usize,
    /// Projects per category display name, in first-seen order. Projects
    /// without a category are counted under "Uncategorized".
    pub by_category: IndexMap<String, usize>,
}

/// Count projects, services, and testimonials.
pub async fn summarize<S: CollectionService>(service: &S) -> Result<DashboardSummary, CoreError> {
    let all_projects = Query::new("projects");
    let services = Query::new("services");
    let testimonials = Query::new("testimonials");
    let completed = Filter::Status(ItemStatus::Completed).apply_to(Query::new("projects"));
    let ongoing = Filter::Status(ItemStatus::Ongoing).apply_to(Query::new("projects"));

    // The query futures borrow their `Query`, so every query is bound first.
    let (projects, services, testimonials, completed, ongoing) = tokio::join!(
        service.query(&all_projects),
        service.query(&services),
        service.query(&testimonials),
        service.query(&completed),
        service.query(&ongoing),
    );

    let projects = items_from_records(projects?);
    let mut by_category: IndexMap<String, usize> = IndexMap::new();
    for item in &projects {
        let name = item.category_name().unwrap_or("Uncategorized").to_owned();
        *by_category.entry(name).or_default() += 1;
    }

    let summary = DashboardSummary {
        projects: projects.len(),
        services: services?.len(),
        testimonials: testimonials?.len(),
        completed: completed?.len(),
        ongoing: ongoing?.len(),
        by_category,
    };
    debug!(?summary, "dashboard summary");
    Ok(summary)
}
