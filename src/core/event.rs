//! Error/warning event channel.
//!
//! A graph owns one [`EventSink`]; every asset added to the graph holds a
//! clone of it, so recoverable failures deep inside an asset operation can be
//! reported without a back-pointer to the graph itself.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::AssetId;
use crate::error::GraphError;
use crate::{debug, log};

/// Channel an event is delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Warn,
}

impl EventKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
        }
    }
}

/// A non-fatal error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEvent {
    pub kind: EventKind,
    pub message: String,
    pub url: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub asset: Option<AssetId>,
}

impl GraphEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(EventKind::Warn, message)
    }

    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            line: None,
            column: None,
            asset: None,
        }
    }

    pub fn with_url(mut self, url: Option<&str>) -> Self {
        self.url = url.map(str::to_owned);
        self
    }

    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Build an error event carrying whatever context `err` has.
    pub fn from_error(err: &GraphError) -> Self {
        let mut event = Self::error(err.to_string()).with_url(err.url());
        if let GraphError::Parse(failure) = err {
            event.line = failure.line;
            event.column = failure.column;
        }
        event
    }

    /// `url:line:column` style location, if any part is known.
    pub fn location(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        Some(match (self.line, self.column) {
            (Some(line), Some(column)) => format!("{url}:{line}:{column}"),
            (Some(line), None) => format!("{url}:{line}"),
            _ => url.to_owned(),
        })
    }
}

impl fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type Listener = Box<dyn FnMut(&GraphEvent) + Send>;

#[derive(Default)]
struct SinkState {
    listeners: Vec<(EventKind, Listener)>,
}

/// Shared, cloneable event dispatcher.
#[derive(Clone, Default)]
pub struct EventSink(Arc<Mutex<SinkState>>);

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to events of `kind`.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: FnMut(&GraphEvent) + Send + 'static,
    {
        self.0.lock().listeners.push((kind, Box::new(listener)));
    }

    pub fn has_listener(&self, kind: EventKind) -> bool {
        self.0.lock().listeners.iter().any(|(k, _)| *k == kind)
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Listeners run without the lock held, so they may subscribe or emit
    /// through a clone of the sink. Events emitted from inside a listener
    /// are not delivered to the listeners currently running.
    ///
    /// Events nobody listens for are written to the terminal log instead
    /// (errors always, warnings only in verbose mode).
    pub fn emit(&self, event: GraphEvent) {
        let mut listeners = std::mem::take(&mut self.0.lock().listeners);
        let mut delivered = false;
        for (kind, listener) in listeners.iter_mut() {
            if *kind == event.kind {
                listener(&event);
                delivered = true;
            }
        }
        {
            let mut state = self.0.lock();
            listeners.append(&mut state.listeners);
            state.listeners = listeners;
        }

        if !delivered {
            match event.kind {
                EventKind::Error => log!("error"; "{}", event),
                EventKind::Warn => debug!("warning"; "{}", event),
            }
        }
    }

    /// Convenience for `emit(GraphEvent::from_error(err))`.
    pub fn emit_error(&self, err: &GraphError) {
        self.emit(GraphEvent::from_error(err));
    }

    /// Whether two handles dispatch to the same listeners.
    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.0.lock().listeners.len();
        f.debug_struct("EventSink")
            .field("listeners", &listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseFailure;

    #[test]
    fn test_emit_by_kind() {
        let sink = EventSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        sink.on(EventKind::Warn, move |e| captured.lock().push(e.message.clone()));

        sink.emit(GraphEvent::warn("cycle"));
        sink.emit(GraphEvent::error("boom"));

        assert_eq!(*seen.lock(), vec!["cycle".to_string()]);
        assert!(sink.has_listener(EventKind::Warn));
        assert!(!sink.has_listener(EventKind::Error));
    }

    #[test]
    fn test_from_parse_error_keeps_position() {
        let err = GraphError::Parse(
            ParseFailure::new("bad token")
                .at(2, 5)
                .with_url(Some("file:///x.css")),
        );
        let event = GraphEvent::from_error(&err);
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.line, Some(2));
        assert_eq!(event.column, Some(5));
        assert_eq!(event.location().as_deref(), Some("file:///x.css:2:5"));
    }

    #[test]
    fn test_clones_share_listeners() {
        let sink = EventSink::new();
        let other = sink.clone();
        assert!(sink.same_channel(&other));
        assert!(!sink.same_channel(&EventSink::new()));
    }

    #[test]
    fn test_listener_can_use_the_sink() {
        let sink = EventSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let inner = sink.clone();
        sink.on(EventKind::Error, move |e| {
            captured.lock().push(e.message.clone());
            inner.emit(GraphEvent::warn("nested"));
            let late = Arc::clone(&captured);
            inner.on(EventKind::Warn, move |e| late.lock().push(e.message.clone()));
        });

        sink.emit(GraphEvent::error("first"));
        sink.emit(GraphEvent::warn("second"));

        assert_eq!(*seen.lock(), vec!["first".to_string(), "second".to_string()]);
        assert!(sink.has_listener(EventKind::Error));
        assert!(sink.has_listener(EventKind::Warn));
    }
}
