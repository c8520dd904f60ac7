//! Visitor insights.
//!
//! [`Tracker`] buffers events per page path and delivers them in batches:
//!
//! - events of a path are held until the path has a page context
//! - a trailing-edge debounced flush (1500 ms by default) sends every ready
//!   path in one batch, in first-touched order
//! - `immediate` events flush synchronously once the visitor id is known
//! - [`Tracker::shutdown`] cancels the pending flush and sends what is left
//!
//! Delivery is fire-and-forget: failures are logged, never retried.

pub mod buffer;
pub mod event;
pub mod session;
pub mod sink;
pub mod visitor;

pub use buffer::{EventBuffer, PathState};
pub use event::{
    ClientEnvironment, ContentContext, EventBatch, InsightsEvent, PageContext, SiteInsightsEvent,
    TrackedEvent,
};
pub use sink::{EventSink, HttpSink, events_endpoint};
pub use visitor::{CookieVisitorSource, VisitorIdSource, parse_cookies};

use crate::{config::SiteConfig, log};
use buffer::ReadyPath;
use chrono::Utc;
use event::{Envelope, transform_events};
use parking_lot::{Mutex, RwLock};
use session::SessionState;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{
    runtime::Handle,
    sync::OnceCell,
    task::{JoinHandle, JoinSet},
};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("visitor id must be resolved before flushing events")]
    VisitorIdUnresolved,

    #[error("failed to send events: {0}")]
    Delivery(#[source] reqwest::Error),

    #[error("insights endpoint responded with status {0}")]
    Status(u16),

    #[error("invalid insights api host `{0}`")]
    InvalidHost(String),
}

/// Where an event was tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Buffer key.
    pub pathname: String,
    /// Absolute URL reported with the events of the path.
    pub url: String,
}

impl Location {
    pub fn new(pathname: &str, url: &str) -> Self {
        Self {
            pathname: pathname.to_owned(),
            url: url.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackOptions {
    /// Flush right away, for events that may precede an unload.
    pub immediate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrackerSettings {
    pub debounce: Duration,
    pub content: ContentContext,
    pub environment: ClientEnvironment,
}

impl TrackerSettings {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.insights.debounce_ms),
            content: ContentContext::from_config(config),
            environment: ClientEnvironment {
                user_agent: config.insights.user_agent.clone(),
                language: config.site.language.clone(),
                ..ClientEnvironment::default()
            },
        }
    }
}

/// HTTP sink when `[insights].enable` is set, `None` (dry run) otherwise.
pub fn sink_from_config(config: &SiteConfig) -> Result<Option<Arc<dyn EventSink>>, InsightsError> {
    let insights = &config.insights;
    if !insights.enable {
        return Ok(None);
    }

    let api_host = insights.api_host.as_deref().unwrap_or_default();
    let endpoint = events_endpoint(api_host, &config.site.organization_id, &config.site.id)?;
    let sink = HttpSink::new(endpoint, DELIVERY_TIMEOUT, &insights.user_agent)?;
    Ok(Some(Arc::new(sink)))
}

/// Cheap to clone handle on a shared event buffer.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    /// `None` computes batches and drops them.
    sink: Option<Arc<dyn EventSink>>,
    visitor_source: Arc<dyn VisitorIdSource>,
    debounce: Duration,
    runtime: Handle,
    content: ContentContext,
    environment: RwLock<ClientEnvironment>,
    buffer: Mutex<EventBuffer>,
    visitor_id: OnceCell<String>,
    session: Mutex<SessionState>,
    /// Pending debounced flush and its generation.
    scheduled: Mutex<Option<(u64, JoinHandle<()>)>>,
    generation: AtomicU64,
    /// In-flight deliveries, awaited by `settle`.
    deliveries: Mutex<JoinSet<()>>,
}

impl Tracker {
    pub fn new(
        settings: TrackerSettings,
        sink: Option<Arc<dyn EventSink>>,
        visitor_source: Arc<dyn VisitorIdSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                sink,
                visitor_source,
                debounce: settings.debounce,
                runtime,
                content: settings.content,
                environment: RwLock::new(settings.environment),
                buffer: Mutex::new(EventBuffer::new()),
                visitor_id: OnceCell::new(),
                session: Mutex::new(SessionState::default()),
                scheduled: Mutex::new(None),
                generation: AtomicU64::new(0),
                deliveries: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Tracker sending to `[insights].api_host` when `[insights].enable` is
    /// set, dry run otherwise.
    pub fn from_config(
        config: &SiteConfig,
        visitor_source: Arc<dyn VisitorIdSource>,
        runtime: Handle,
    ) -> Result<Self, InsightsError> {
        Ok(Self::new(
            TrackerSettings::from_config(config),
            sink_from_config(config)?,
            visitor_source,
            runtime,
        ))
    }

    /// Buffer an event for `location.pathname`.
    ///
    /// Paths without a page context only buffer. Otherwise an `immediate`
    /// event flushes synchronously when the visitor id is known, and any
    /// other event (re)schedules the debounced flush.
    pub fn track(
        &self,
        location: &Location,
        event: InsightsEvent,
        page: Option<PageContext>,
        options: TrackOptions,
    ) {
        let inner = &self.inner;
        let content = inner.content.clone();
        let environment = inner.environment.read().clone();

        let has_context = inner.buffer.lock().push(
            &location.pathname,
            &location.url,
            TrackedEvent::now(event),
            page,
            content,
            environment,
        );
        if !has_context {
            return;
        }

        if options.immediate && inner.visitor_id.initialized() {
            self.cancel_scheduled();
            if let Err(err) = self.flush_now() {
                log!("insights"; "{err}");
            }
        } else {
            self.schedule_flush();
        }
    }

    /// Take every ready path into one batch and start its delivery.
    ///
    /// Returns the number of events in the batch.
    pub fn flush_now(&self) -> Result<usize, InsightsError> {
        let visitor_id = self
            .inner
            .visitor_id
            .get()
            .ok_or(InsightsError::VisitorIdUnresolved)?;

        let batch = self.inner.take_batch(visitor_id);
        let count = batch.events.len();
        if count > 0 {
            self.inner.spawn_delivery(batch);
        }
        Ok(count)
    }

    /// (Re)start the trailing-edge flush timer.
    pub fn schedule_flush(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(&self.inner);

        let mut scheduled = self.inner.scheduled.lock();
        if let Some((_, previous)) = scheduled.take() {
            previous.abort();
        }

        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.debounce).await;

            // Not cancellable past this point
            {
                let mut scheduled = inner.scheduled.lock();
                if matches!(&*scheduled, Some((g, _)) if *g == generation) {
                    scheduled.take();
                }
            }

            let visitor_id = inner.resolve_visitor_id().await;
            let batch = inner.take_batch(&visitor_id);
            if !batch.events.is_empty() {
                inner.spawn_delivery(batch);
            }
        });
        *scheduled = Some((generation, handle));
    }

    fn cancel_scheduled(&self) {
        if let Some((_, handle)) = self.inner.scheduled.lock().take() {
            handle.abort();
        }
    }

    /// Resolve and cache the visitor id.
    pub async fn resolve_visitor_id(&self) -> String {
        self.inner.resolve_visitor_id().await
    }

    pub fn visitor_id(&self) -> Option<String> {
        self.inner.visitor_id.get().cloned()
    }

    /// Wait for every delivery started so far.
    pub async fn settle(&self) {
        let mut deliveries = std::mem::take(&mut *self.inner.deliveries.lock());
        while deliveries.join_next().await.is_some() {}
    }

    /// Unload: cancel the pending flush and, when the visitor id is known,
    /// send everything ready and wait for delivery.
    pub async fn shutdown(&self) {
        self.cancel_scheduled();

        if let Some(visitor_id) = self.inner.visitor_id.get() {
            let batch = self.inner.take_batch(visitor_id);
            if !batch.events.is_empty() {
                self.inner.deliver(batch).await;
            }
        }
        self.settle().await;

        let unattributed = self.unattributed_events();
        if unattributed > 0 {
            log!("insights"; "{unattributed} events never received a page context and were not sent");
        }
    }

    pub fn set_environment(&self, environment: ClientEnvironment) {
        *self.inner.environment.write() = environment;
    }

    pub fn is_sending(&self) -> bool {
        self.inner.sink.is_some()
    }

    pub fn pending_events(&self) -> usize {
        self.inner.buffer.lock().pending()
    }

    pub fn unattributed_events(&self) -> usize {
        self.inner.buffer.lock().unattributed()
    }

    pub fn path_state(&self, pathname: &str) -> Option<PathState> {
        self.inner.buffer.lock().state(pathname).cloned()
    }
}

impl TrackerInner {
    async fn resolve_visitor_id(&self) -> String {
        self.visitor_id
            .get_or_init(|| self.visitor_source.resolve())
            .await
            .clone()
    }

    fn take_batch(&self, visitor_id: &str) -> EventBatch {
        let ready = self.buffer.lock().drain_ready();
        if ready.is_empty() {
            return EventBatch::default();
        }

        let session_id = self.session.lock().touch(Utc::now());
        let events = ready
            .into_iter()
            .flat_map(|path| {
                let ReadyPath {
                    url,
                    content,
                    environment,
                    page,
                    events,
                } = path;
                let envelope = Envelope {
                    url: &url,
                    content: &content,
                    page: &page,
                    environment: &environment,
                    visitor_id,
                    session_id: &session_id,
                };
                transform_events(events, &envelope)
            })
            .collect();

        EventBatch { events }
    }

    fn spawn_delivery(self: &Arc<Self>, batch: EventBatch) {
        let inner = Arc::clone(self);
        let mut deliveries = self.deliveries.lock();
        while deliveries.try_join_next().is_some() {}
        deliveries.spawn_on(async move { inner.deliver(batch).await }, &self.runtime);
    }

    async fn deliver(&self, batch: EventBatch) {
        let count = batch.events.len();
        let Some(sink) = &self.sink else {
            log!("insights"; "dry run, {count} events not sent");
            return;
        };

        match sink.send(&batch).await {
            Ok(()) => log!("insights"; "sent {count} events"),
            Err(err) => log!("insights"; "{count} events lost: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::{
        event::{LinkTarget, SearchResult},
        sink::recording::RecordingSink,
    };
    use futures::future::BoxFuture;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    /// Always resolves the same id, counting resolutions.
    #[derive(Default)]
    struct FixedVisitor {
        resolved: AtomicUsize,
    }

    impl VisitorIdSource for FixedVisitor {
        fn resolve(&self) -> BoxFuture<'_, String> {
            self.resolved.fetch_add(1, Ordering::Relaxed);
            Box::pin(async { "visitor_1".to_owned() })
        }
    }

    struct Fixture {
        tracker: Tracker,
        sink: Arc<RecordingSink>,
        visitor: Arc<FixedVisitor>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::default());
        let visitor = Arc::new(FixedVisitor::default());
        let settings = TrackerSettings {
            debounce: Duration::from_millis(1500),
            content: ContentContext {
                organization_id: "org_1".into(),
                site_id: "site_1".into(),
                space_id: "space_1".into(),
                revision_id: "rev_1".into(),
                ..ContentContext::default()
            },
            environment: ClientEnvironment::default(),
        };
        let tracker = Tracker::new(
            settings,
            Some(sink.clone() as Arc<dyn EventSink>),
            visitor.clone(),
            Handle::current(),
        );
        Fixture {
            tracker,
            sink,
            visitor,
        }
    }

    fn at(path: &str) -> Location {
        Location::new(path, &format!("https://docs.acme.dev{path}"))
    }

    fn query(text: &str) -> InsightsEvent {
        InsightsEvent::SearchTypeQuery { query: text.into() }
    }

    fn sent_types(batch: &EventBatch) -> Vec<&'static str> {
        batch.events.iter().map(|e| e.event.event.name()).collect()
    }

    const IMMEDIATE: TrackOptions = TrackOptions { immediate: true };

    #[tokio::test(start_paused = true)]
    async fn test_no_context_never_sends() {
        let Fixture { tracker, sink, .. } = fixture();

        for text in ["a", "b", "c"] {
            tracker.track(&at("/guide"), query(text), None, TrackOptions::default());
        }
        sleep(Duration::from_secs(10)).await;

        assert!(sink.batches().is_empty());
        assert_eq!(tracker.pending_events(), 3);
        assert_eq!(tracker.unattributed_events(), 3);

        tracker.resolve_visitor_id().await;
        assert_eq!(tracker.flush_now().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_flush_after_context() {
        let Fixture { tracker, sink, .. } = fixture();
        let guide = at("/guide");

        tracker.track(&guide, query("a"), None, TrackOptions::default());
        tracker.track(&guide, InsightsEvent::PageView, Some(PageContext::page("p1")), TrackOptions::default());

        sleep(Duration::from_millis(1400)).await;
        assert!(sink.batches().is_empty());

        sleep(Duration::from_millis(200)).await;
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(sent_types(&batches[0]), ["search_type_query", "page_view"]);
        let location = &batches[0].events[0].location;
        assert_eq!(location.page.as_deref(), Some("p1"));
        assert_eq!(location.url, "https://docs.acme.dev/guide");
        assert_eq!(location.space, "space_1");
        assert_eq!(batches[0].events[0].session.visitor_id, "visitor_1");

        // Context is kept for later events on the path
        assert_eq!(
            tracker.path_state("/guide"),
            Some(PathState::Flushed(PageContext::page("p1")))
        );
        tracker.track(&guide, InsightsEvent::SearchOpen, None, TrackOptions::default());
        sleep(Duration::from_secs(2)).await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(sent_types(&batches[1]), ["search_open"]);
        assert_eq!(batches[1].events[0].location.page.as_deref(), Some("p1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_superseded() {
        let Fixture { tracker, sink, .. } = fixture();
        let page = Some(PageContext::page("p1"));

        tracker.track(&at("/a"), InsightsEvent::PageView, page.clone(), TrackOptions::default());
        sleep(Duration::from_millis(1000)).await;
        tracker.track(&at("/a"), query("x"), page, TrackOptions::default());

        sleep(Duration::from_millis(1000)).await;
        assert!(sink.batches().is_empty());

        sleep(Duration::from_millis(600)).await;
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_with_known_visitor() {
        let Fixture { tracker, sink, .. } = fixture();
        tracker.resolve_visitor_id().await;

        let page = Some(PageContext::page("p1"));
        tracker.track(&at("/a"), InsightsEvent::PageView, page, TrackOptions::default());
        let link = InsightsEvent::LinkClick {
            link: LinkTarget {
                url: "https://acme.dev".into(),
                position: None,
            },
        };
        tracker.track(&at("/a"), link, None, IMMEDIATE);
        tracker.settle().await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(sent_types(&batches[0]), ["page_view", "link_click"]);

        // The debounced flush was cancelled
        sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.batches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_without_visitor_debounces() {
        let Fixture {
            tracker,
            sink,
            visitor,
        } = fixture();

        tracker.track(&at("/a"), InsightsEvent::PageView, Some(PageContext::page("p1")), IMMEDIATE);
        tracker.settle().await;
        assert!(sink.batches().is_empty());
        assert_eq!(tracker.visitor_id(), None);

        sleep(Duration::from_millis(1600)).await;
        assert_eq!(sink.batches().len(), 1);
        assert_eq!(tracker.visitor_id().as_deref(), Some("visitor_1"));

        // Cached for the lifetime of the tracker
        tracker.track(&at("/a"), InsightsEvent::SearchOpen, None, TrackOptions::default());
        sleep(Duration::from_millis(1600)).await;
        assert_eq!(sink.batches().len(), 2);
        assert_eq!(visitor.resolved.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_flush_requires_visitor_id() {
        let Fixture { tracker, .. } = fixture();

        assert!(matches!(
            tracker.flush_now(),
            Err(InsightsError::VisitorIdUnresolved)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_flushed_in_first_touched_order() {
        let Fixture { tracker, sink, .. } = fixture();

        tracker.track(&at("/b"), query("b"), None, TrackOptions::default());
        tracker.track(&at("/a"), query("a"), Some(PageContext::page("pa")), TrackOptions::default());
        let result = InsightsEvent::SearchOpenResult {
            query: "b".into(),
            result: SearchResult {
                page_id: "pa".into(),
                section_id: None,
            },
        };
        tracker.track(&at("/b"), result, Some(PageContext::page("pb")), TrackOptions::default());
        sleep(Duration::from_secs(2)).await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let pages: Vec<_> = batches[0]
            .events
            .iter()
            .map(|e| e.location.page.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(pages, ["pb", "pb", "pa"]);

        // One session for the whole batch
        let session = &batches[0].events[0].session.session_id;
        assert!(batches[0].events.iter().all(|e| &e.session.session_id == session));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending() {
        let Fixture { tracker, sink, .. } = fixture();
        tracker.resolve_visitor_id().await;

        tracker.track(&at("/a"), InsightsEvent::PageView, Some(PageContext::page("p1")), TrackOptions::default());
        tracker.track(&at("/orphan"), InsightsEvent::PageView, None, TrackOptions::default());
        tracker.shutdown().await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events.len(), 1);
        assert_eq!(tracker.unattributed_events(), 1);
    }

    /// Acknowledges each batch after a delay.
    #[derive(Default)]
    struct SlowSink {
        delivered: Mutex<Vec<usize>>,
    }

    impl EventSink for SlowSink {
        fn send<'a>(&'a self, batch: &'a EventBatch) -> BoxFuture<'a, Result<(), InsightsError>> {
            Box::pin(async move {
                sleep(Duration::from_millis(200)).await;
                self.delivered.lock().push(batch.events.len());
                Ok(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_awaits_debounced_delivery() {
        let sink = Arc::new(SlowSink::default());
        let tracker = Tracker::new(
            TrackerSettings {
                debounce: Duration::from_millis(1500),
                ..TrackerSettings::default()
            },
            Some(sink.clone() as Arc<dyn EventSink>),
            Arc::new(FixedVisitor::default()),
            Handle::current(),
        );

        let page = Some(PageContext::page("p1"));
        tracker.track(&at("/a"), InsightsEvent::PageView, page, TrackOptions::default());

        // Debounce fired, delivery still in flight
        sleep(Duration::from_millis(1550)).await;
        assert!(sink.delivered.lock().is_empty());
        assert_eq!(tracker.pending_events(), 0);

        tracker.shutdown().await;
        assert_eq!(*sink.delivered.lock(), [1]);
    }

    #[tokio::test]
    async fn test_dry_run_drops_batches() {
        let tracker = Tracker::new(
            TrackerSettings::default(),
            None,
            Arc::new(FixedVisitor::default()),
            Handle::current(),
        );
        tracker.resolve_visitor_id().await;

        tracker.track(&at("/a"), InsightsEvent::PageView, Some(PageContext::page("p")), TrackOptions::default());
        assert!(!tracker.is_sending());
        assert_eq!(tracker.flush_now().unwrap(), 1);
        assert_eq!(tracker.pending_events(), 0);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut config = SiteConfig::default();
        config.site.id = "s".into();
        config.site.organization_id = "o".into();
        let visitor: Arc<dyn VisitorIdSource> = Arc::new(FixedVisitor::default());

        let tracker = Tracker::from_config(&config, visitor.clone(), Handle::current()).unwrap();
        assert!(!tracker.is_sending());

        config.insights.enable = true;
        config.insights.api_host = Some("https://api.acme.dev".into());
        let tracker = Tracker::from_config(&config, visitor.clone(), Handle::current()).unwrap();
        assert!(tracker.is_sending());

        config.insights.api_host = Some("not a url".into());
        assert!(Tracker::from_config(&config, visitor, Handle::current()).is_err());
    }
}
