use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::cache::{CacheKey, RecordCache};
use crate::config::Config;
use crate::downloader::{ExportFormat, export_tree};
use crate::flatten::{FlattenedTree, flatten};
use crate::genealogy::{Direction, GenerationMap, extract};
use crate::graph::{StatChart, render_stat_chart};
use crate::loader::{LoadError, RecordSource};
use crate::person::PersonId;
use crate::records::{RecordStore, parse_selection, selection_label};
use crate::session::{RenderContext, SessionStore};
use crate::stats;
use crate::sunburst::{SexColors, render_svg};

const SESSION_COOKIE: &str = "family_tree_session";
pub const MIN_GENERATIONS: u32 = 1;
pub const MAX_GENERATIONS: u32 = 10;
pub const DEFAULT_GENERATIONS: u32 = 3;

pub struct AppState {
    source: RecordSource,
    version: AtomicU64,
    cache: RecordCache,
    sessions: SessionStore,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(source: RecordSource) -> Result<Self, Box<dyn Error>> {
        let mut templates = Handlebars::new();
        templates.register_template_string("home", include_str!("./static/home.html"))?;
        templates.register_template_string("stats", include_str!("./static/stats.html"))?;
        templates.register_template_string("tree", include_str!("./static/tree.html"))?;

        Ok(AppState {
            source,
            version: AtomicU64::new(0),
            cache: RecordCache::new(),
            sessions: SessionStore::new(),
            templates,
        })
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.source, self.version.load(Ordering::SeqCst))
    }

    async fn store(&self) -> Result<Arc<RecordStore>, ApiError> {
        Ok(self.cache.get_or_load(self.cache_key(), &self.source).await?)
    }

    /// Drops the cached store; the next request loads the source again
    pub fn reload(&self) {
        let stale = self.cache_key();
        self.version.fetch_add(1, Ordering::SeqCst);
        self.cache.retire(&stale);
    }

    fn render(&self, template: &str, data: &serde_json::Value) -> Result<Html<String>, ApiError> {
        self.templates
            .render(template, data)
            .map(Html)
            .map_err(|e| ApiError::internal(format!("Failed to render {}: {}", template, e)))
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// An error reported to the browser as `{status: "error", message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(error: LoadError) -> Self {
        ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: format!("Failed to load family data: {}", error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("{} {}", self.status, self.message);
        (
            self.status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.message),
            }),
        )
            .into_response()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// `"[id] name"` selection entry or a bare id
    person: Option<String>,
    direction: Option<String>,
    generations: Option<u32>,
    male_color: Option<String>,
    female_color: Option<String>,
}

/// A tree query checked against the loaded store
struct TreeRequest {
    person: PersonId,
    direction: Direction,
    generations: u32,
    colors: SexColors,
}

impl TreeRequest {
    fn resolve(store: &RecordStore, query: &TreeQuery) -> Result<Self, ApiError> {
        let person = match query.person.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(raw) => {
                let id = parse_selection(raw)
                    .or_else(|| PersonId::parse(raw))
                    .ok_or_else(|| ApiError::bad_request("Invalid person selection"))?;
                if !store.contains(&id) {
                    return Err(ApiError::not_found(format!("No person with id {}", id)));
                }
                id
            }
            None => store
                .iter()
                .next()
                .map(|record| record.id.clone())
                .ok_or_else(|| ApiError::not_found("The family sheet has no people"))?,
        };

        let direction = match query.direction.as_deref() {
            Some(raw) => raw.parse().map_err(ApiError::bad_request)?,
            None => Direction::default(),
        };

        Ok(TreeRequest {
            person,
            direction,
            generations: query
                .generations
                .unwrap_or(DEFAULT_GENERATIONS)
                .clamp(MIN_GENERATIONS, MAX_GENERATIONS),
            colors: SexColors::from_hex(query.male_color.as_deref(), query.female_color.as_deref()),
        })
    }

    fn build(&self, store: &RecordStore) -> (GenerationMap, FlattenedTree) {
        let generations = extract(store, &self.person, self.direction, self.generations);
        let flat = flatten(store, &generations);
        (generations, flat)
    }

    /// Query string that reproduces this request, for export links
    fn query_string(&self) -> String {
        format!(
            "person={}&direction={}&generations={}&male_color={}&female_color={}",
            urlencoding::encode(self.person.as_str()),
            self.direction,
            self.generations,
            urlencoding::encode(&self.colors.male.to_hex()),
            urlencoding::encode(&self.colors.female.to_hex()),
        )
    }
}

/// Returns the session id from the cookie jar, issuing one if absent
fn session(jar: CookieJar) -> (CookieJar, String) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let id = cookie.value().to_string();
        return (jar, id);
    }

    let id = Uuid::new_v4().to_string();
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true);
    (jar.add(cookie), id)
}

pub fn router(state: Arc<AppState>, static_dir: impl AsRef<std::path::Path>) -> Router {
    Router::new()
        .route("/", get(serve_home))
        .route("/stats", get(serve_stats))
        .route("/tree", get(serve_tree))
        .route("/api/people", get(get_people))
        .route("/api/tree", get(get_tree))
        .route("/api/stats", get(get_stats))
        .route("/api/stats/:chart", get(get_stat_chart))
        .route("/api/export/:format", get(export))
        .route("/api/zoom/in", post(zoom_in))
        .route("/api/zoom/out", post(zoom_out))
        .route("/api/reload", post(reload))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let source = RecordSource::detect(&config.source)?;
    let state = Arc::new(AppState::new(source)?);

    // Load once up front so a broken source is reported before serving
    if let Err(e) = state.cache.get_or_load(state.cache_key(), &state.source).await {
        log::error!("{}", e);
        return Err(e.into());
    }

    let app = router(state, &config.static_dir);
    let listener = TcpListener::bind(config.bind.as_str()).await?;
    log::info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_home(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let people = state.store().await?.len();
    state.render(
        "home",
        &serde_json::json!({
            "people": people,
            "source": state.source.to_string(),
        }),
    )
}

async fn serve_stats(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let store = state.store().await?;
    let statistics = stats::compute(&store, chrono::Local::now().date_naive());

    let charts: Vec<serde_json::Value> = StatChart::ALL
        .iter()
        .map(|chart| {
            serde_json::json!({
                "slug": chart.slug(),
                "title": chart.options(&statistics).title,
            })
        })
        .collect();

    state.render(
        "stats",
        &serde_json::json!({
            "total": statistics.total,
            "male": statistics.gender.male,
            "female": statistics.gender.female,
            "unknown_sex": statistics.gender.unknown,
            "ratio": statistics.gender.ratio_label(),
            "living": statistics.living,
            "deceased": statistics.deceased,
            "unknown_age": statistics.unknown_age,
            "average_age": statistics.average_age.map(|age| format!("{:.1}", age)),
            "root_ancestors": statistics.root_ancestors,
            "deepest_lineage": statistics.deepest_lineage,
            "charts": charts,
        }),
    )
}

async fn serve_tree(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TreeQuery>,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let store = state.store().await?;
    let request = TreeRequest::resolve(&store, &query)?;
    let (jar, session_id) = session(jar);
    let context = state.sessions.context(&session_id);

    let (generations, flat) = request.build(&store);
    let svg = render_svg(&flat, &request.colors, &context)
        .map_err(|e| ApiError::internal(format!("Failed to draw tree: {}", e)))?;

    let people: Vec<serde_json::Value> = store
        .iter()
        .map(|record| {
            serde_json::json!({
                "value": selection_label(record),
                "selected": record.id == request.person,
            })
        })
        .collect();
    let directions: Vec<serde_json::Value> = [
        (Direction::Descendants, "Descendants (children)"),
        (Direction::Ancestors, "Ancestors (fathers)"),
        (Direction::Both, "Both (ancestors + descendants)"),
    ]
    .iter()
    .map(|(direction, label)| {
        serde_json::json!({
            "value": direction.to_string(),
            "label": label,
            "checked": *direction == request.direction,
        })
    })
    .collect();

    let selected = store
        .get(&request.person)
        .map(|record| record.display_name().to_string())
        .unwrap_or_default();
    let query_string = request.query_string();
    let exports: Vec<serde_json::Value> = ["png", "pdf", "svg", "csv", "xlsx"]
        .iter()
        .map(|format| {
            serde_json::json!({
                "format": format,
                "href": format!("/api/export/{}?{}", format, query_string),
            })
        })
        .collect();

    let page = state.render(
        "tree",
        &serde_json::json!({
            "people": people,
            "selected_name": selected,
            "selected_id": request.person.as_str(),
            "directions": directions,
            "generations": request.generations,
            "min_generations": MIN_GENERATIONS,
            "max_generations": MAX_GENERATIONS,
            "male_color": request.colors.male.to_hex(),
            "female_color": request.colors.female.to_hex(),
            "zoom_percent": context.percent(),
            "node_count": flat.len(),
            "generation_count": generations.len(),
            "svg": svg,
            "exports": exports,
        }),
    )?;

    Ok((jar, page))
}

async fn get_people(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store().await?;
    Ok(Json(store.selection_options()))
}

#[derive(Serialize)]
struct TreeResponse {
    person: PersonId,
    direction: Direction,
    generations: GenerationMap,
    tree: FlattenedTree,
    colors: SexColors,
    context: RenderContext,
}

async fn get_tree(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TreeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store().await?;
    let request = TreeRequest::resolve(&store, &query)?;
    let (jar, session_id) = session(jar);
    let (generations, tree) = request.build(&store);

    Ok((
        jar,
        Json(TreeResponse {
            person: request.person,
            direction: request.direction,
            generations,
            tree,
            colors: request.colors,
            context: state.sessions.context(&session_id),
        }),
    ))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store().await?;
    Ok(Json(stats::compute(&store, chrono::Local::now().date_naive())))
}

async fn get_stat_chart(
    State(state): State<Arc<AppState>>,
    Path(chart): Path<String>,
) -> Result<Response, ApiError> {
    let chart: StatChart = chart
        .trim_end_matches(".png")
        .parse()
        .map_err(ApiError::not_found)?;
    let store = state.store().await?;
    let statistics = stats::compute(&store, chrono::Local::now().date_naive());

    let png = render_stat_chart(&statistics, chart)
        .map_err(|e| ApiError::internal(format!("Failed to draw chart: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn export(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(format): Path<String>,
    Query(query): Query<TreeQuery>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = format.parse().map_err(ApiError::not_found)?;
    let store = state.store().await?;
    let request = TreeRequest::resolve(&store, &query)?;
    let (_, session_id) = session(jar);
    let context = state.sessions.context(&session_id);

    let (_, flat) = request.build(&store);
    let file = export_tree(&flat, &request.colors, &context, format)
        .map_err(|e| ApiError::internal(format!("Failed to export {}: {}", format.filename(), e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

#[derive(Serialize)]
struct ZoomResponse {
    zoom: f64,
    percent: u32,
    canvas_size: u32,
    font_size: u32,
}

impl From<RenderContext> for ZoomResponse {
    fn from(context: RenderContext) -> Self {
        ZoomResponse {
            zoom: context.zoom,
            percent: context.percent(),
            canvas_size: context.canvas_size(),
            font_size: context.font_size(),
        }
    }
}

async fn zoom_in(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, session_id) = session(jar);
    let context = state.sessions.update(&session_id, RenderContext::zoom_in);
    (jar, Json(ZoomResponse::from(context)))
}

async fn zoom_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, session_id) = session(jar);
    let context = state.sessions.update(&session_id, RenderContext::zoom_out);
    (jar, Json(ZoomResponse::from(context)))
}

async fn reload(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.reload();
    let store = state.store().await?;
    log::info!("reloaded {} people from {}", store.len(), state.source);
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        message: Some(format!("Loaded {} people", store.len())),
    }))
}
