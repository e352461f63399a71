//! Collected graph events and their terminal rendering.

use std::process::ExitCode;
use std::sync::Arc;

use assetgraph::core::{EventKind, GraphEvent};
use assetgraph::graph::AssetGraph;
use assetgraph::log;
use parking_lot::Mutex;

/// Errors and warnings delivered on a graph's event channel.
#[derive(Debug, Clone, Default)]
pub struct Report {
    events: Arc<Mutex<Vec<GraphEvent>>>,
}

impl Report {
    /// Subscribe to both channels of `graph`.
    pub fn attach(graph: &AssetGraph) -> Self {
        let report = Self::default();
        for kind in [EventKind::Error, EventKind::Warn] {
            let events = Arc::clone(&report.events);
            graph.events().on(kind, move |e| events.lock().push(e.clone()));
        }
        report
    }

    pub fn error_count(&self) -> usize {
        self.count(EventKind::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(EventKind::Warn)
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// Print every event in arrival order.
    pub fn print(&self) {
        for event in self.events.lock().iter() {
            let module = match event.kind {
                EventKind::Error => "error",
                EventKind::Warn => "warning",
            };
            log!(module; "{}", describe(event));
        }
    }

    /// 0 when clean, 1 when recoverable errors were reported.
    pub fn exit_code(&self) -> ExitCode {
        if self.error_count() == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        }
    }
}

/// Message prefixed with its location unless the message already names it.
fn describe(event: &GraphEvent) -> String {
    match event.location() {
        Some(_) if event.url.as_deref().is_some_and(|url| event.message.contains(url)) => {
            event.message.clone()
        }
        Some(location) => format!("{location}: {}", event.message),
        None => event.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgraph::error::{GraphError, ParseFailure};

    #[test]
    fn test_describe() {
        let load = GraphEvent::from_error(&GraphError::Load {
            url: "file:///a.css".into(),
            reason: "missing".into(),
        });
        assert_eq!(describe(&load), "failed to load file:///a.css: missing");

        let cycle = GraphEvent::warn("cycle detected").with_url(Some("file:///b.css"));
        assert_eq!(describe(&cycle), "file:///b.css: cycle detected");

        let parse = GraphEvent::from_error(&GraphError::Parse(
            ParseFailure::new("unterminated block").at(3, 1).with_url(Some("file:///c.css")),
        ));
        assert_eq!(
            describe(&parse),
            "parse error in file:///c.css: unterminated block (line 3, column 1)"
        );
    }

    #[test]
    fn test_counts_and_exit_code() {
        let graph = AssetGraph::new("file:///site/");
        let report = Report::attach(&graph);
        graph.events().emit(GraphEvent::warn("w"));
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.exit_code(), ExitCode::SUCCESS);

        graph.events().emit(GraphEvent::error("e"));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.exit_code(), ExitCode::from(1));
    }
}
