//! HTTP server for pages and derived images.
//!
//! Built on `tiny_http`; requests are handled one at a time on the main
//! thread, async work (image fetches, insights delivery) runs on the tokio
//! runtime passed in.
//!
//! | Route                      | Response                                  |
//! |----------------------------|-------------------------------------------|
//! | `/~site/icon?size&theme`   | png or 302, 404 on invalid parameters     |
//! | `/~site/ogimage/{page}`    | 1200×630 png or 302                       |
//! | `/{page}?mode=print`       | rendered page, 404 when unknown           |
//!
//! Page views are tracked through the insights tracker, which is flushed on
//! Ctrl+C before the server exits.

use crate::{
    config::{SiteConfig, cfg},
    content::{Page, PageStore, render_page},
    document::RenderMode,
    graphics::ImageServices,
    insights::{
        ClientEnvironment, CookieVisitorSource, EventSink, InsightsEvent, Location, PageContext,
        TrackOptions, Tracker, TrackerSettings, parse_cookies, sink_from_config,
    },
    log,
    routes::{
        ImageResponse, RouteError,
        icon::{IconOptions, serve_icon},
        ogimage::serve_og_image,
        query_param,
    },
};
use anyhow::{Context, Result, anyhow};
use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{Arc, OnceLock},
};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tokio::runtime::Handle;

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

const ICON_ROUTE: &str = "/~site/icon";
const OGIMAGE_ROUTE: &str = "/~site/ogimage";

// ============================================================================
// Server State
// ============================================================================

struct ServerState {
    store: PageStore,
    services: ImageServices,
    runtime: Handle,
    sink: Option<Arc<dyn EventSink>>,
    /// Created on the first page view, with that visitor's cookies.
    tracker: OnceLock<Tracker>,
}

impl ServerState {
    fn new(config: &SiteConfig, runtime: Handle) -> Result<Self> {
        let store = PageStore::load(&config.build.content)?;
        log!("serve"; "loaded {} pages", store.len());

        Ok(Self {
            store,
            services: ImageServices::from_config(config)?,
            sink: sink_from_config(config)?,
            runtime,
            tracker: OnceLock::new(),
        })
    }

    fn tracker(&self, config: &SiteConfig, environment: &ClientEnvironment) -> &Tracker {
        self.tracker.get_or_init(|| {
            let visitor = CookieVisitorSource::new(
                &environment.cookies,
                config.insights.visitor_cookie_tracking,
            );
            let tracker = Tracker::new(
                TrackerSettings::from_config(config),
                self.sink.clone(),
                Arc::new(visitor),
                self.runtime.clone(),
            );

            let resolving = tracker.clone();
            self.runtime.spawn(async move {
                resolving.resolve_visitor_id().await;
            });
            tracker
        })
    }
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve until Ctrl+C, then flush pending insights events.
pub fn serve_site(runtime: Handle) -> Result<()> {
    let c = cfg();
    let interface: std::net::IpAddr = c.serve.interface.parse()?;

    let state = ServerState::new(&c, runtime.clone())?;
    let (server, addr) = try_bind_port(interface, c.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &state, &cfg()) {
            log!("serve"; "request error: {e:#}");
        }
    }

    if let Some(tracker) = state.tracker.get() {
        runtime.block_on(tracker.shutdown());
    }
    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Routing
// ============================================================================

/// What a request resolves to, before it is written to the socket.
enum Reply {
    Page { html: String, page: Arc<Page> },
    Image(ImageResponse),
    NotFound,
}

/// Resolve a request path and query to a reply.
fn route(state: &ServerState, config: &SiteConfig, path: &str, query: &str) -> Result<Reply> {
    if path == ICON_ROUTE {
        let response =
            IconOptions::from_query(query).and_then(|options| serve_icon(config, &state.services, options));
        return image_reply(response);
    }

    if let Some(rest) = path.strip_prefix(OGIMAGE_ROUTE)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        let page = state.store.get(rest);
        let response = state
            .runtime
            .block_on(serve_og_image(config, &state.services, page.as_deref()));
        return image_reply(response);
    }

    let Some(page) = state.store.get(path) else {
        return Ok(Reply::NotFound);
    };

    let mode = match query_param(query, "mode").as_deref() {
        Some("print") => RenderMode::Print,
        _ if config.build.print => RenderMode::Print,
        _ => RenderMode::Default,
    };
    let html = render_page(&page, config, mode)?;
    Ok(Reply::Page { html, page })
}

fn image_reply(response: Result<ImageResponse, RouteError>) -> Result<Reply> {
    match response {
        Ok(image) => Ok(Reply::Image(image)),
        Err(RouteError::NotFound) => Ok(Reply::NotFound),
        Err(RouteError::Render(err)) => Err(err.context("Failed to render image")),
    }
}

// ============================================================================
// Request Handling
// ============================================================================

fn handle_request(request: Request, state: &ServerState, config: &SiteConfig) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return serve_status(request, 405, "405 Method Not Allowed");
    }

    let url = request.url().to_owned();
    let (raw_path, query) = url.split_once('?').unwrap_or((&url, ""));
    let path = urlencoding::decode(raw_path)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    match route(state, config, &path, query) {
        Ok(Reply::Page { html, page }) => {
            track_page_view(&request, state, config, &page);
            serve_html(request, html)
        }
        Ok(Reply::Image(ImageResponse::Redirect(location))) => serve_redirect(request, &location),
        Ok(Reply::Image(ImageResponse::Png { data, cache_tag })) => {
            serve_png(request, data, &cache_tag)
        }
        Ok(Reply::NotFound) => serve_status(request, 404, "404 Not Found"),
        Err(e) => {
            log!("serve"; "{path}: {e:#}");
            serve_status(request, 500, "500 Internal Server Error")
        }
    }
}

fn header_value<'a>(request: &'a Request, name: &'static str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str())
}

/// Client environment from request headers.
fn client_environment(request: &Request, config: &SiteConfig) -> ClientEnvironment {
    let language = header_value(request, "Accept-Language")
        .and_then(|value| value.split([',', ';']).next())
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(&config.site.language);

    ClientEnvironment {
        user_agent: header_value(request, "User-Agent")
            .unwrap_or(&config.insights.user_agent)
            .to_owned(),
        language: language.to_owned(),
        cookies: header_value(request, "Cookie")
            .map(parse_cookies)
            .unwrap_or_default(),
        referrer: header_value(request, "Referer").map(str::to_owned),
    }
}

fn track_page_view(request: &Request, state: &ServerState, config: &SiteConfig, page: &Page) {
    let environment = client_environment(request, config);
    let tracker = state.tracker(config, &environment);
    tracker.set_environment(environment);

    let pathname = page.pathname();
    let base = config.site.url.as_deref().unwrap_or_default().trim_end_matches('/');
    let location = Location::new(&pathname, &format!("{base}{pathname}"));

    tracker.track(
        &location,
        InsightsEvent::PageView,
        Some(PageContext::page(&page.id)),
        TrackOptions::default(),
    );
}

// ============================================================================
// Response Helpers
// ============================================================================

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("Invalid header {name}: {value}"))
}

/// Serve HTML content.
fn serve_html(request: Request, content: String) -> Result<()> {
    let response = Response::from_string(content)
        .with_header(header("Content-Type", "text/html; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

fn serve_png(request: Request, data: Vec<u8>, cache_tag: &str) -> Result<()> {
    let response = Response::from_data(data)
        .with_header(header("Content-Type", "image/png")?)
        .with_header(header("Cache-Tag", cache_tag)?);
    request.respond(response)?;
    Ok(())
}

fn serve_redirect(request: Request, location: &str) -> Result<()> {
    let response = Response::empty(StatusCode(302)).with_header(header("Location", location)?);
    request.respond(response)?;
    Ok(())
}

/// Plain text status response.
fn serve_status(request: Request, status: u16, body: &'static str) -> Result<()> {
    let response = Response::new(
        StatusCode(status),
        vec![header("Content-Type", "text/plain")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Favicon, ThemedValue};
    use crate::graphics::{
        CachePolicy, CdnResizer, fetch::stub::StubFetcher, svg::png_dimensions,
    };
    use std::fs;
    use tempfile::TempDir;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.site.id = "site_1".into();
        config.site.space_id = "space_1".into();
        config.site.title = "Acme".into();
        config
    }

    fn state(dir: &TempDir, runtime: &tokio::runtime::Runtime) -> ServerState {
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("guides")).unwrap();
        fs::write(content.join("index.json"), r#"{ "id": "home", "title": "Home" }"#).unwrap();
        fs::write(
            content.join("guides/setup.json"),
            r#"{ "id": "setup", "title": "Setup", "description": "Install" }"#,
        )
        .unwrap();

        ServerState {
            store: PageStore::load(&content).unwrap(),
            services: ImageServices::new(
                Arc::new(StubFetcher::new()),
                Arc::new(CdnResizer::new("https://docs.acme.dev")),
                CachePolicy::Unbounded,
                None,
            ),
            runtime: runtime.handle().clone(),
            sink: None,
            tracker: OnceLock::new(),
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_route_pages() {
        let dir = TempDir::new().unwrap();
        let runtime = runtime();
        let state = state(&dir, &runtime);
        let config = config();

        match route(&state, &config, "/guides/setup/", "").unwrap() {
            Reply::Page { html, page } => {
                assert_eq!(page.id, "setup");
                assert!(!html.contains("print-mode"));
            }
            _ => panic!("expected a page"),
        }
        match route(&state, &config, "/guides/setup", "mode=print").unwrap() {
            Reply::Page { html, .. } => assert!(html.contains("print-mode")),
            _ => panic!("expected a page"),
        }
        assert!(matches!(route(&state, &config, "/", "").unwrap(), Reply::Page { .. }));
        assert!(matches!(route(&state, &config, "/missing", "").unwrap(), Reply::NotFound));
    }

    #[test]
    fn test_route_icon() {
        let dir = TempDir::new().unwrap();
        let runtime = runtime();
        let state = state(&dir, &runtime);
        let mut config = config();

        match route(&state, &config, ICON_ROUTE, "size=small&theme=light").unwrap() {
            Reply::Image(ImageResponse::Png { data, cache_tag }) => {
                assert_eq!(png_dimensions(&data), Some((48, 48)));
                assert_eq!(cache_tag, "site:site_1");
            }
            _ => panic!("expected a png"),
        }
        assert!(matches!(
            route(&state, &config, ICON_ROUTE, "size=large").unwrap(),
            Reply::NotFound
        ));

        config.customization.favicon = Favicon::Icon(ThemedValue {
            light: "https://acme.dev/l.png".into(),
            dark: "https://acme.dev/d.png".into(),
        });
        match route(&state, &config, ICON_ROUTE, "theme=dark").unwrap() {
            Reply::Image(ImageResponse::Redirect(url)) => assert_eq!(
                url,
                "https://docs.acme.dev/cdn-cgi/image/width=48,height=48,fit=contain,format=auto/https://acme.dev/d.png"
            ),
            _ => panic!("expected a redirect"),
        }
    }

    #[test]
    fn test_route_ogimage() {
        let dir = TempDir::new().unwrap();
        let runtime = runtime();
        let state = state(&dir, &runtime);
        let config = config();

        match route(&state, &config, "/~site/ogimage/guides/setup", "").unwrap() {
            Reply::Image(ImageResponse::Png { data, cache_tag }) => {
                assert_eq!(png_dimensions(&data), Some((1200, 630)));
                assert_eq!(cache_tag, "site:site_1,space:space_1");
            }
            _ => panic!("expected a png"),
        }
        // Unknown pages still get a card
        assert!(matches!(
            route(&state, &config, "/~site/ogimage/missing", "").unwrap(),
            Reply::Image(ImageResponse::Png { .. })
        ));
        // Not an ogimage route
        assert!(matches!(
            route(&state, &config, "/~site/ogimagex", "").unwrap(),
            Reply::NotFound
        ));
    }
}
