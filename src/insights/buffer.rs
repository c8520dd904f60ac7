//! Per-path event buffer.
//!
//! Each page path moves through three states:
//!
//! ```text
//!   Buffering(events) --context--> Ready(events, context) --flush--> Flushed(context)
//!                                        ^                                 |
//!                                        +------------- event ------------+
//! ```
//!
//! Events of a path are only flushed once its page context is known. The
//! context is kept after a flush so later events on the path are ready
//! immediately.

use super::event::{ClientEnvironment, ContentContext, PageContext, TrackedEvent};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum PathState {
    /// No page context yet.
    Buffering(Vec<TrackedEvent>),
    Ready {
        events: Vec<TrackedEvent>,
        page: PageContext,
    },
    Flushed(PageContext),
}

impl PathState {
    pub fn page(&self) -> Option<&PageContext> {
        match self {
            Self::Buffering(_) => None,
            Self::Ready { page, .. } | Self::Flushed(page) => Some(page),
        }
    }

    pub fn events(&self) -> &[TrackedEvent] {
        match self {
            Self::Buffering(events) | Self::Ready { events, .. } => events,
            Self::Flushed(_) => &[],
        }
    }

    fn push(self, event: TrackedEvent, context: Option<PageContext>) -> Self {
        match self {
            Self::Buffering(mut events) => {
                events.push(event);
                match context {
                    Some(page) => Self::Ready { events, page },
                    None => Self::Buffering(events),
                }
            }
            // The first context recorded for a path wins
            Self::Ready { mut events, page } => {
                events.push(event);
                Self::Ready { events, page }
            }
            Self::Flushed(page) => Self::Ready {
                events: vec![event],
                page,
            },
        }
    }
}

/// Buffered state of one page path.
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// URL of the first event tracked on the path.
    pub url: String,
    /// Latest content snapshot.
    pub content: ContentContext,
    pub environment: ClientEnvironment,
    pub state: PathState,
}

/// Events of a path taken out by a flush.
#[derive(Debug, Clone)]
pub struct ReadyPath {
    pub url: String,
    pub content: ContentContext,
    pub environment: ClientEnvironment,
    pub page: PageContext,
    pub events: Vec<TrackedEvent>,
}

/// Path entries in first-touched order.
#[derive(Debug, Default)]
pub struct EventBuffer {
    order: Vec<String>,
    paths: FxHashMap<String, PathEntry>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to `pathname`. Returns whether the path now has a
    /// page context.
    pub fn push(
        &mut self,
        pathname: &str,
        url: &str,
        event: TrackedEvent,
        context: Option<PageContext>,
        content: ContentContext,
        environment: ClientEnvironment,
    ) -> bool {
        let order = &mut self.order;
        let entry = self.paths.entry(pathname.to_owned()).or_insert_with(|| {
            order.push(pathname.to_owned());
            PathEntry {
                url: url.to_owned(),
                content: ContentContext::default(),
                environment: ClientEnvironment::default(),
                state: PathState::Buffering(Vec::new()),
            }
        });

        let state = std::mem::replace(&mut entry.state, PathState::Buffering(Vec::new()));
        entry.state = state.push(event, context);
        entry.content = content;
        entry.environment = environment;
        entry.state.page().is_some()
    }

    /// Take the events of every ready path, in first-touched order. Taken
    /// paths keep their context.
    pub fn drain_ready(&mut self) -> Vec<ReadyPath> {
        let mut ready = Vec::new();
        for pathname in &self.order {
            let Some(entry) = self.paths.get_mut(pathname) else {
                continue;
            };
            if !matches!(&entry.state, PathState::Ready { events, .. } if !events.is_empty()) {
                continue;
            }

            let page = entry.state.page().cloned().unwrap_or_default();
            let state = std::mem::replace(&mut entry.state, PathState::Flushed(page.clone()));
            if let PathState::Ready { events, .. } = state {
                ready.push(ReadyPath {
                    url: entry.url.clone(),
                    content: entry.content.clone(),
                    environment: entry.environment.clone(),
                    page,
                    events,
                });
            }
        }
        ready
    }

    pub fn state(&self, pathname: &str) -> Option<&PathState> {
        self.paths.get(pathname).map(|entry| &entry.state)
    }

    /// Events waiting for a flush, with or without context.
    pub fn pending(&self) -> usize {
        self.paths.values().map(|e| e.state.events().len()).sum()
    }

    /// Events of paths that never received a page context.
    pub fn unattributed(&self) -> usize {
        self.paths
            .values()
            .filter(|e| matches!(e.state, PathState::Buffering(_)))
            .map(|e| e.state.events().len())
            .sum()
    }
}
