//! Event catalogue and wire format.
//!
//! Tracked events are stored as [`TrackedEvent`] (event fields plus the
//! tracking timestamp). At flush time they are wrapped with a session and a
//! location envelope into [`SiteInsightsEvent`], the JSON accepted by the
//! collection API.

use crate::config::SiteConfig;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Catalogue
// ============================================================================

/// An analytics event, without session or location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsightsEvent {
    PageView,
    SearchOpen,
    SearchTypeQuery {
        query: String,
    },
    SearchOpenResult {
        query: String,
        result: SearchResult,
    },
    LinkClick {
        link: LinkTarget,
    },
    ApiClientOpen {
        operation: ApiOperation,
    },
    PagePostFeedback {
        feedback: PageFeedback,
    },
}

impl InsightsEvent {
    /// Wire name of the event type.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::SearchOpen => "search_open",
            Self::SearchTypeQuery { .. } => "search_type_query",
            Self::SearchOpenResult { .. } => "search_open_result",
            Self::LinkClick { .. } => "link_click",
            Self::ApiClientOpen { .. } => "api_client_open",
            Self::PagePostFeedback { .. } => "page_post_feedback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub url: String,
    /// Where the link sits on the page (`content`, `header`...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiOperation {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackRating {
    Good,
    Ok,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFeedback {
    pub rating: FeedbackRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// An event with the time it was tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    #[serde(flatten)]
    pub event: InsightsEvent,
    /// RFC 3339, millisecond precision, UTC.
    pub timestamp: String,
}

impl TrackedEvent {
    pub fn now(event: InsightsEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// Page the events of a path belong to. Known once the page has been
/// resolved; until then the events of the path are held back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default)]
    pub page_id: Option<String>,
}

impl PageContext {
    pub fn page(id: &str) -> Self {
        Self {
            page_id: Some(id.to_owned()),
        }
    }
}

/// Identifiers of the content being viewed, snapshotted per path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentContext {
    pub organization_id: String,
    pub site_id: String,
    pub site_section_id: Option<String>,
    pub site_space_id: Option<String>,
    pub space_id: String,
    pub site_share_key: Option<String>,
    pub revision_id: String,
    pub visitor_auth_claims: BTreeMap<String, serde_json::Value>,
}

impl ContentContext {
    pub fn from_config(config: &SiteConfig) -> Self {
        let site = &config.site;
        Self {
            organization_id: site.organization_id.clone(),
            site_id: site.id.clone(),
            site_section_id: site.site_section_id.clone(),
            site_space_id: site.site_space_id.clone(),
            space_id: site.space_id.clone(),
            site_share_key: site.share_key.clone(),
            revision_id: site.revision_id.clone(),
            visitor_auth_claims: BTreeMap::new(),
        }
    }
}

/// The client the events come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientEnvironment {
    pub user_agent: String,
    pub language: String,
    pub cookies: BTreeMap<String, String>,
    pub referrer: Option<String>,
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    pub session_id: String,
    pub visitor_id: String,
    pub user_agent: String,
    pub language: String,
    pub cookies: BTreeMap<String, String>,
    pub referrer: Option<String>,
    pub visitor_auth_claims: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEnvelope {
    pub url: String,
    pub site_section: Option<String>,
    pub site_space: Option<String>,
    pub space: String,
    pub site_share_key: Option<String>,
    pub revision: String,
    pub page: Option<String>,
}

/// Event as sent to the collection API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInsightsEvent {
    #[serde(flatten)]
    pub event: TrackedEvent,
    pub session: SessionEnvelope,
    pub location: LocationEnvelope,
}

/// Request body of the collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<SiteInsightsEvent>,
}

/// Everything needed to wrap the events of one path.
pub struct Envelope<'a> {
    pub url: &'a str,
    pub content: &'a ContentContext,
    pub page: &'a PageContext,
    pub environment: &'a ClientEnvironment,
    pub visitor_id: &'a str,
    pub session_id: &'a str,
}

/// Wrap tracked events with their session and location.
pub fn transform_events(events: Vec<TrackedEvent>, envelope: &Envelope<'_>) -> Vec<SiteInsightsEvent> {
    let Envelope {
        url,
        content,
        page,
        environment,
        visitor_id,
        session_id,
    } = envelope;

    let session = SessionEnvelope {
        session_id: (*session_id).to_owned(),
        visitor_id: (*visitor_id).to_owned(),
        user_agent: environment.user_agent.clone(),
        language: environment.language.clone(),
        cookies: environment.cookies.clone(),
        referrer: environment.referrer.clone().filter(|r| !r.is_empty()),
        visitor_auth_claims: content.visitor_auth_claims.clone(),
    };
    let location = LocationEnvelope {
        url: (*url).to_owned(),
        site_section: content.site_section_id.clone(),
        site_space: content.site_space_id.clone(),
        space: content.space_id.clone(),
        site_share_key: content.site_share_key.clone(),
        revision: content.revision_id.clone(),
        page: page.page_id.clone(),
    };

    events
        .into_iter()
        .map(|event| SiteInsightsEvent {
            event,
            session: session.clone(),
            location: location.clone(),
        })
        .collect()
}
