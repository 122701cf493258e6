#![cfg(not(tarpaulin_include))]

use crate::config::Config;
use crate::dashboard::DashboardView;
use crate::downloader::{self, PDF_FILENAME, PDF_MIME, XLSX_FILENAME, XLSX_MIME};
use crate::filter::FilterSelection;
use crate::graph::{self, GraphType};
use crate::i18n::Locale;
use crate::loader;
use crate::login::{self, AuthError, CredentialStore, Session, SessionId, SessionRegistry, StaticCredentials};
use crate::saving::{self, PersistError};
use crate::table::RiskTable;
use axum::{
    Extension, Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use handlebars::Handlebars;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;

/// A spreadsheet a user uploaded in this session
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub table: RiskTable,
}

/// Everything the server remembers about one logged-in browser
#[derive(Debug)]
pub struct UserSession {
    pub session: Session,
    pub locale: Locale,
    pub upload: Option<Upload>,
    /// One-shot message shown on the next dashboard render
    pub flash: Option<String>,
}

impl UserSession {
    pub fn new(session: Session) -> Self {
        UserSession {
            session,
            locale: Locale::default(),
            upload: None,
            flash: None,
        }
    }
}

/// Copy of a session's data taken so the lock is not held while rendering
struct Snapshot {
    username: String,
    locale: Locale,
    upload: Option<Upload>,
    flash: Option<String>,
}

pub struct AppState {
    pub config: Config,
    pub credentials: Box<dyn CredentialStore + Send + Sync>,
    sessions: Mutex<SessionRegistry<UserSession>>,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(
        config: Config,
        credentials: Box<dyn CredentialStore + Send + Sync>,
    ) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string("login", include_str!("./static/login.hbs"))?;
        templates.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;

        Ok(AppState {
            sessions: Mutex::new(SessionRegistry::new(config.session_ttl)),
            config,
            credentials,
            templates,
        })
    }

    pub fn sessions(&self) -> MutexGuard<'_, SessionRegistry<UserSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Login page, with a generic rejection message after a failed attempt.
    pub fn render_login(&self, error: Option<&AuthError>) -> Html<String> {
        let locale = Locale::default();
        let texts = locale.texts();
        self.render(
            "login",
            &json!({
                "t": texts,
                "dir": locale.dir(),
                "lang": locale.code(),
                "error": error.map(|_| texts.login_failed),
            }),
        )
    }

    fn render(&self, name: &str, context: &serde_json::Value) -> Html<String> {
        match self.templates.render(name, context) {
            Ok(page) => Html(page),
            Err(e) => {
                error!("failed to render {} template: {}", name, e);
                Html("<h1>Internal error</h1>".to_string())
            }
        }
    }

    fn snapshot(&self, id: &SessionId, take_flash: bool) -> Option<Snapshot> {
        let mut sessions = self.sessions();
        let entry = sessions.get_mut(&id.0)?;
        Some(Snapshot {
            username: entry.session.username.clone().unwrap_or_default(),
            locale: entry.locale,
            upload: entry.upload.clone(),
            flash: if take_flash { entry.flash.take() } else { None },
        })
    }

    fn update<F: FnOnce(&mut UserSession)>(&self, id: &SessionId, f: F) {
        if let Some(entry) = self.sessions().get_mut(&id.0) {
            f(entry);
        }
    }
}

/// Filter parameters carried on every dashboard, chart and export URL
///
/// `applied` is present once the user has submitted the filter form; until
/// then every category value counts as selected.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub level: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: Vec<String>,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub applied: Option<String>,
}

impl FilterQuery {
    pub fn selection(&self) -> FilterSelection {
        let mut selection = FilterSelection::default();
        if self.applied.is_some() {
            selection = selection
                .with_levels(self.level.iter().cloned())
                .with_types(self.kind.iter().cloned());
        }
        if !self.q.is_empty() {
            selection = selection.with_keyword(self.q.clone());
        }
        selection
    }

    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if self.applied.is_some() {
            parts.push("applied=1".to_string());
        }
        for level in &self.level {
            parts.push(format!("level={}", urlencoding::encode(level)));
        }
        for kind in &self.kind {
            parts.push(format!("type={}", urlencoding::encode(kind)));
        }
        if !self.q.is_empty() {
            parts.push(format!("q={}", urlencoding::encode(&self.q)));
        }
        parts.join("&")
    }
}

#[derive(Deserialize)]
struct LanguageForm {
    locale: String,
}

#[derive(Serialize)]
struct PersistResponse {
    status: String,
    table: Option<String>,
    message: String,
}

/// Start the dashboard server and serve until the process is stopped
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(
        config,
        Box::new(StaticCredentials::default()),
    )?);

    let app = router(state);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router; everything except login requires a session
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload_limit;

    let protected = Router::new()
        .route("/", get(serve_dashboard))
        .route("/language", post(set_language))
        .route("/upload", post(upload_file))
        .route("/charts/pie.png", get(pie_chart))
        .route("/charts/bar.png", get(bar_chart))
        .route("/export/xlsx", get(export_xlsx))
        .route("/export/pdf", get(export_pdf))
        .route("/export/db", post(export_db))
        .route("/admin/tables", get(list_tables))
        .route("/admin/tables/:name", get(show_table))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", post(login::handle_logout))
        .merge(protected)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let Some(snap) = state.snapshot(&id, true) else {
        return Redirect::to("/login").into_response();
    };
    let texts = snap.locale.texts();

    let tables = if state.config.db_path.exists() {
        saving::list_tables(&state.config.db_path).unwrap_or_else(|e| {
            warn!("could not list stored tables: {}", e);
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let locales: Vec<_> = Locale::ALL
        .iter()
        .map(|l| json!({ "code": l.code(), "name": l.native_name(), "active": *l == snap.locale }))
        .collect();

    let mut context = json!({
        "t": texts,
        "dir": snap.locale.dir(),
        "lang": snap.locale.code(),
        "locales": locales,
        "username": snap.username,
        "flash": snap.flash,
        "tables": tables,
        "has_table": false,
    });

    if let Some(upload) = &snap.upload {
        let selection = query.selection();
        let view = DashboardView::build(&upload.table, &selection, texts);
        let options = |values: &[String], chosen: &Option<BTreeSet<String>>| {
            values
                .iter()
                .map(|v| {
                    json!({
                        "value": v,
                        "selected": chosen.as_ref().is_none_or(|set| set.contains(v)),
                    })
                })
                .collect::<Vec<_>>()
        };
        let rows: Vec<Vec<String>> = view
            .filtered
            .rows()
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        context["has_table"] = json!(true);
        context["file_name"] = json!(upload.file_name);
        context["summary"] = json!({
            "total": view.summary.total,
            "high_count": view.summary.high_count,
            "high_percent": view.summary.percent_display(),
        });
        context["level_options"] = json!(options(view.level_options.as_slice(), &selection.risk_levels));
        context["type_options"] = json!(options(view.type_options.as_slice(), &selection.risk_types));
        context["keyword"] = json!(query.q);
        context["columns"] = json!(view.filtered.columns());
        context["rows"] = json!(rows);
        context["has_rows"] = json!(!view.filtered.is_empty());
        context["has_pie"] = json!(view.pie.is_some());
        context["has_bar"] = json!(view.bar.is_some());
        context["query"] = json!(query.to_query_string());
    }

    state.render("dashboard", &context).into_response()
}

async fn set_language(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Form(form): Form<LanguageForm>,
) -> Redirect {
    match form.locale.parse::<Locale>() {
        Ok(locale) => state.update(&id, |s| s.locale = locale),
        Err(e) => warn!("{}", e),
    }
    Redirect::to("/")
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    mut multipart: Multipart,
) -> Redirect {
    let mut received: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
                match field.bytes().await {
                    Ok(bytes) => received = Some((file_name, bytes.to_vec())),
                    Err(e) => warn!("upload interrupted: {}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("malformed upload: {}", e);
                break;
            }
        }
    }

    let outcome = match received {
        Some((file_name, bytes)) if !bytes.is_empty() => {
            loader::load(&bytes).map(|table| Upload { file_name, table })
        }
        _ => Err(loader::LoadError::Empty),
    };

    state.update(&id, |s| match outcome {
        Ok(upload) => {
            info!("{} uploaded {}", s.session.username.as_deref().unwrap_or("?"), upload.file_name);
            s.upload = Some(upload);
        }
        Err(e) => {
            warn!("rejected upload: {}", e);
            s.flash = Some(s.locale.texts().load_failed.to_string());
        }
    });
    Redirect::to("/")
}

/// Filtered table for the current session, or the response to send instead
fn filtered_table(
    state: &AppState,
    id: &SessionId,
    query: &FilterQuery,
) -> Result<(DashboardView, Locale), Response> {
    let snap = state
        .snapshot(id, false)
        .ok_or_else(|| Redirect::to("/login").into_response())?;
    let upload = snap
        .upload
        .ok_or_else(|| (StatusCode::NOT_FOUND, snap.locale.texts().no_file).into_response())?;
    let view = DashboardView::build(&upload.table, &query.selection(), snap.locale.texts());
    Ok((view, snap.locale))
}

async fn pie_chart(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    chart_png(&state, &id, &query, GraphType::Pie)
}

async fn bar_chart(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    chart_png(&state, &id, &query, GraphType::Bar)
}

fn chart_png(state: &AppState, id: &SessionId, query: &FilterQuery, kind: GraphType) -> Response {
    let (view, _) = match filtered_table(state, id, query) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let (chart, options) = match kind {
        GraphType::Pie => (view.pie, state.config.pie),
        GraphType::Bar => (view.bar, state.config.bar),
    };
    let Some(chart) = chart else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match graph::render_png(&chart, &options) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            error!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn attachment(bytes: Vec<u8>, mime: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let (view, _) = match filtered_table(&state, &id, &query) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match downloader::to_xlsx(&view.filtered) {
        Ok(bytes) => attachment(bytes, XLSX_MIME, XLSX_FILENAME),
        Err(e) => {
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let (view, locale) = match filtered_table(&state, &id, &query) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let texts = locale.texts();
    let date_line = format!(
        "{}: {}",
        texts.report_date,
        chrono::Local::now().format("%Y-%m-%d")
    );
    match downloader::to_pdf(&view.filtered, texts.report_title, &date_line) {
        Ok(bytes) => attachment(bytes, PDF_MIME, PDF_FILENAME),
        Err(e) => {
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn export_db(
    State(state): State<Arc<AppState>>,
    Extension(id): Extension<SessionId>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let (view, locale) = match filtered_table(&state, &id, &query) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let texts = locale.texts();
    match saving::persist(&view.filtered, &state.config.db_path) {
        Ok(table) => Json(PersistResponse {
            status: "ok".to_string(),
            table: Some(table),
            message: texts.saved_to_db.to_string(),
        })
        .into_response(),
        Err(e) => {
            error!("persist failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PersistResponse {
                    status: "error".to_string(),
                    table: None,
                    message: format!("{} ({})", texts.persist_failed, e),
                }),
            )
                .into_response()
        }
    }
}

async fn list_tables(State(state): State<Arc<AppState>>) -> Response {
    match saving::list_tables(&state.config.db_path) {
        Ok(tables) => Json(json!({ "tables": tables })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn show_table(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match saving::load_table(&state.config.db_path, &name) {
        Ok(table) => Json(table).into_response(),
        Err(e @ PersistError::InvalidTableName(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
