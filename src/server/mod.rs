//! HTTP server
//!
//! Pages are rendered on demand from the content store and cached in memory.
//! Expired pages keep being served while a background task re-renders them.
//! Requests carrying a preview cookie always render from the preview ref and
//! never touch the cache.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{Lookup, PageCache};
use crate::client::ContentClient;
use crate::config::SiteConfig;
use crate::content::{Adjacent, PostNormalizer};
use crate::error::Error;
use crate::generator::Generator;
use crate::helpers::url_for;
use crate::pagination::{adjacent_posts, fetch_listing_page, PaginationController};
use crate::preview::{PreviewResolver, PreviewSession};
use crate::templates::PostSummaryView;
use crate::Spacetraveling;

/// Shared server state
pub struct AppState {
    config: SiteConfig,
    client: Arc<dyn ContentClient>,
    generator: Generator,
    preview: PreviewResolver,
    cache: PageCache,
}

impl AppState {
    pub fn new(config: SiteConfig, client: Arc<dyn ContentClient>) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(&config)?,
            preview: PreviewResolver::new(client.clone()),
            cache: PageCache::new(),
            config,
            client,
        })
    }

    fn preview_session(&self, jar: &CookieJar) -> Option<PreviewSession> {
        PreviewSession::from_jar(jar, &self.config.preview.cookie_name)
    }

    /// Render the page shown when a route cannot be served
    fn error_page(&self, error: AppError, preview: bool) -> Response {
        let (status, html) = match &error {
            AppError::Content(Error::NotFound(_) | Error::MissingField(_)) => {
                tracing::debug!("Rendering not-found state: {}", error);
                (StatusCode::NOT_FOUND, self.generator.render_not_found(preview))
            }
            AppError::Content(Error::Fetch(_)) => {
                tracing::warn!("Content store unavailable: {}", error);
                (StatusCode::BAD_GATEWAY, self.generator.render_fallback())
            }
            _ => return error.into_response(),
        };

        match html {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => AppError::Render(e).into_response(),
        }
    }
}

/// Errors returned by request handlers
#[derive(Debug)]
pub enum AppError {
    Content(Error),
    Render(anyhow::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Content(e) => write!(f, "{}", e),
            AppError::Render(e) => write!(f, "render failed: {}", e),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Content(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Render(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Content(e) => {
                let status = match e {
                    Error::InvalidToken => StatusCode::UNAUTHORIZED,
                    Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::LoadInFlight => StatusCode::CONFLICT,
                    Error::Fetch(_) | Error::MissingField(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            AppError::Render(e) => {
                tracing::error!("Render failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// A cacheable page
#[derive(Debug, Clone)]
enum Route {
    Home,
    Post(String),
}

impl Route {
    fn key(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Post(slug) => format!("/post/{}", slug),
        }
    }

    fn max_age(&self, config: &SiteConfig) -> Duration {
        match self {
            Route::Home => config.revalidate.listing(),
            Route::Post(_) => config.revalidate.post(),
        }
    }

    async fn render(&self, state: &AppState, reference: Option<&str>) -> Result<String, AppError> {
        match self {
            Route::Home => render_home(state, reference).await,
            Route::Post(slug) => render_post(state, slug, reference).await,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, public_dir: &FsPath) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/post/:slug", get(post_handler))
        .route("/api/posts", get(load_more_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(site: &Spacetraveling, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(AppState::new(site.config.clone(), site.client.clone())?);
    let app = router(state, &site.public_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    serve_page(state, Route::Home, &jar).await
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Response {
    serve_page(state, Route::Post(slug), &jar).await
}

/// Serve a page from the cache, or render it for a preview session
async fn serve_page(state: Arc<AppState>, route: Route, jar: &CookieJar) -> Response {
    if let Some(session) = state.preview_session(jar) {
        return match route.render(&state, Some(session.reference.as_str())).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => state.error_page(e, true),
        };
    }

    let key = route.key();
    match state.cache.lookup(&key, route.max_age(&state.config)) {
        Lookup::Fresh(html) => Html(html).into_response(),
        Lookup::Stale { html, refresh } => {
            if refresh {
                spawn_refresh(state.clone(), route);
            }
            Html(html).into_response()
        }
        Lookup::Miss => match route.render(&state, None).await {
            Ok(html) => {
                state.cache.insert(&key, html.clone());
                Html(html).into_response()
            }
            Err(e) => state.error_page(e, false),
        },
    }
}

/// Re-render an expired page in the background
fn spawn_refresh(state: Arc<AppState>, route: Route) {
    tokio::spawn(async move {
        let key = route.key();
        match route.render(&state, None).await {
            Ok(html) => {
                state.cache.insert(&key, html);
                tracing::debug!("Revalidated {}", key);
            }
            Err(AppError::Content(Error::NotFound(_))) => {
                tracing::info!("{} no longer exists, dropping cached page", key);
                state.cache.remove(&key);
            }
            Err(e) => {
                tracing::warn!("Failed to revalidate {}: {}", key, e);
                state.cache.release(&key);
            }
        }
    });
}

async fn render_home(state: &AppState, reference: Option<&str>) -> Result<String, AppError> {
    let pagination = PaginationController::new(state.client.clone(), PostNormalizer::listing())
        .with_ref(reference.map(str::to_string));
    let page = pagination
        .load_initial(state.config.per_page, &state.config.document_type)
        .await?;

    Ok(state.generator.render_home(&page, reference.is_some())?)
}

async fn render_post(
    state: &AppState,
    slug: &str,
    reference: Option<&str>,
) -> Result<String, AppError> {
    let doc_type = &state.config.document_type;
    let raw = state
        .client
        .get_by_uid(doc_type, slug, reference)
        .await?
        .ok_or_else(|| Error::NotFound(slug.to_string()))?;
    let post = PostNormalizer::detail().normalize(&raw)?;

    let adjacent = match adjacent_posts(state.client.as_ref(), doc_type, &raw.id, reference).await
    {
        Ok(adjacent) => adjacent,
        Err(e) => {
            tracing::warn!("Failed to load neighbours of {}: {}", slug, e);
            Adjacent::default()
        }
    };

    Ok(state
        .generator
        .render_post(&post, &adjacent, reference.is_some())?)
}

#[derive(Debug, Deserialize)]
struct LoadMoreParams {
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoadMoreResponse {
    results: Vec<PostSummaryView>,
    next_page: Option<String>,
}

/// Fetch the listing page a cursor points at
async fn load_more_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoadMoreParams>,
) -> Result<Json<LoadMoreResponse>, AppError> {
    let cursor = params
        .cursor
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::InvalidQuery("missing cursor".to_string()))?;

    let timeout = state.config.load_more.timeout();
    let page = tokio::time::timeout(
        timeout,
        fetch_listing_page(state.client.as_ref(), &PostNormalizer::listing(), &cursor),
    )
    .await
    .map_err(|_| Error::Fetch(format!("load more timed out after {:?}", timeout)))??;

    Ok(Json(LoadMoreResponse {
        results: page
            .results
            .iter()
            .map(|post| state.generator.summary_view(post))
            .collect(),
        next_page: page.next_page,
    }))
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<PreviewParams>,
) -> Result<Response, AppError> {
    let redirect = state
        .preview
        .resolve(
            params.token.as_deref().unwrap_or_default(),
            params.document_id.as_deref(),
        )
        .await?;

    let html = state.generator.render_preview_redirect(&redirect.path)?;
    let jar = jar.add(redirect.session.cookie(&state.config.preview));

    Ok((jar, Html(html)).into_response())
}

/// Leave preview mode
async fn exit_preview_handler(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let jar = jar.remove(PreviewSession::removal_cookie(&state.config.preview));
    let home = url_for(&state.config, "/");
    (jar, Redirect::temporary(&home)).into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
