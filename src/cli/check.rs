//! `check`: build the graph and report what went wrong.

use std::process::ExitCode;

use anyhow::Result;
use assetgraph::graph::RelationQuery;
use assetgraph::log;

use super::build_graph;
use crate::config::SiteConfig;

/// Exit with 0 when clean, 1 when recoverable errors were reported.
/// Structural failures propagate (the caller exits with 2).
pub async fn run_check(config: &SiteConfig) -> Result<ExitCode> {
    let (mut graph, report) = build_graph(config).await?;

    let relations = graph.find_relations(&RelationQuery::new(), true).len();
    let unpopulated = relations - graph.find_relations(&RelationQuery::new(), false).len();
    let initial = graph.assets().filter(|a| a.is_initial()).count();

    report.print();
    log!(
        "check";
        "{} asset(s) ({} initial), {} relation(s) ({} unpopulated), {} error(s), {} warning(s)",
        graph.len(),
        initial,
        relations,
        unpopulated,
        report.error_count(),
        report.warning_count()
    );
    Ok(report.exit_code())
}
