//! Replay a capture of insights events through the tracker.
//!
//! One JSON object per line:
//!
//! ```json
//! {"pathname": "/guides/setup", "event": {"type": "page_view"}, "page_context": {"page_id": "p1"}}
//! {"pathname": "/guides/setup", "event": {"type": "link_click", "link": {"url": "https://acme.dev"}}, "immediate": true, "delay_ms": 400}
//! ```
//!
//! `delay_ms` waits before tracking the record, so debouncing behaves as it
//! did when the capture was taken. Blank lines and `#` comments are skipped.

use crate::{
    config::{SiteConfig, cfg},
    insights::{
        CookieVisitorSource, InsightsEvent, Location, PageContext, TrackOptions, Tracker,
        parse_cookies,
    },
    log,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc, time::Duration};
use tokio::runtime::Handle;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayRecord {
    pub pathname: String,
    /// Absolute URL, `{site.url}{pathname}` when omitted.
    #[serde(default)]
    pub url: Option<String>,
    pub event: InsightsEvent,
    #[serde(default)]
    pub page_context: Option<PageContext>,
    #[serde(default)]
    pub immediate: bool,
    #[serde(default)]
    pub delay_ms: u64,
}

/// Parse a JSON-lines capture.
pub fn parse_records(content: &str) -> Result<Vec<ReplayRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", index + 1))
        })
        .collect()
}

/// Track every record in order, then shut the tracker down.
pub async fn replay_records(records: &[ReplayRecord], tracker: &Tracker, base_url: &str) {
    // Resolved up front, as a client does on load
    tracker.resolve_visitor_id().await;

    let base_url = base_url.trim_end_matches('/');
    for record in records {
        if record.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(record.delay_ms)).await;
        }

        let url = record
            .url
            .clone()
            .unwrap_or_else(|| format!("{base_url}{}", record.pathname));
        tracker.track(
            &Location::new(&record.pathname, &url),
            record.event.clone(),
            record.page_context.clone(),
            TrackOptions {
                immediate: record.immediate,
            },
        );
    }

    tracker.shutdown().await;
}

/// `docsite replay FILE [--dry-run] [--cookie HEADER]`
///
/// `cookies` is a `Cookie` header value, consulted for the visitor id when
/// visitor cookie tracking is enabled.
pub fn replay_file(file: &Path, cookies: Option<&str>, runtime: Handle) -> Result<()> {
    let config: Arc<SiteConfig> = cfg();
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let records = parse_records(&content)?;

    let cookies = cookies.map(parse_cookies).unwrap_or_default();
    let visitor = CookieVisitorSource::new(&cookies, config.insights.visitor_cookie_tracking);
    let tracker = Tracker::from_config(&config, Arc::new(visitor), runtime.clone())?;

    log!(
        "insights";
        "replaying {} events ({})",
        records.len(),
        if tracker.is_sending() { "sending" } else { "dry run" }
    );

    let base_url = config.site.url.clone().unwrap_or_default();
    runtime.block_on(replay_records(&records, &tracker, &base_url));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{
        ContentContext, EventSink, TrackerSettings, sink::recording::RecordingSink,
    };

    const CAPTURE: &str = r#"
# search before the page resolves
{"pathname": "/setup", "event": {"type": "search_open"}}
{"pathname": "/setup", "event": {"type": "page_view"}, "page_context": {"page_id": "p1"}}

{"pathname": "/setup", "url": "https://acme.dev/setup?x", "event": {"type": "search_type_query", "query": "tok"}, "delay_ms": 2000}
{"pathname": "/other", "event": {"type": "page_view"}, "delay_ms": 10}
"#;

    #[test]
    fn test_parse_records() {
        let records = parse_records(CAPTURE).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[1].page_context, Some(PageContext::page("p1")));
        assert_eq!(records[2].delay_ms, 2000);
        assert_eq!(records[2].event.name(), "search_type_query");
        assert!(!records[3].immediate);
    }

    #[test]
    fn test_parse_records_reports_line() {
        let err = parse_records("{\"pathname\": \"/a\", \"event\": {\"type\": \"page_view\"}}\n{oops")
            .unwrap_err();

        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_records() {
        let sink = Arc::new(RecordingSink::default());
        let settings = TrackerSettings {
            debounce: Duration::from_millis(1500),
            content: ContentContext::default(),
            ..TrackerSettings::default()
        };
        let tracker = Tracker::new(
            settings,
            Some(sink.clone() as Arc<dyn EventSink>),
            Arc::new(CookieVisitorSource::default()),
            Handle::current(),
        );

        let records = parse_records(CAPTURE).unwrap();
        replay_records(&records, &tracker, "https://docs.acme.dev/").await;

        let batches = sink.batches();
        // Debounced flush during the 2s delay, then the shutdown flush
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].events.len(), 2);
        assert_eq!(batches[0].events[0].location.url, "https://docs.acme.dev/setup");
        assert_eq!(batches[1].events.len(), 1);
        assert_eq!(batches[1].events[0].location.url, "https://docs.acme.dev/setup");

        // `/other` never received a context
        assert_eq!(tracker.unattributed_events(), 1);
    }
}
