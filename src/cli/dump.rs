//! `dump`: print the graph.

use std::process::ExitCode;

use anyhow::Result;
use assetgraph::transform::{DumpGraph, Transform};

use super::build_graph;
use crate::config::SiteConfig;

pub async fn run_dump(config: &SiteConfig) -> Result<ExitCode> {
    let (mut graph, report) = build_graph(config).await?;
    DumpGraph.apply(&mut graph).await?;
    report.print();
    Ok(report.exit_code())
}
