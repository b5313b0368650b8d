use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use informe::error::ReportError;
use informe::report::aggregate::{
    code_alerts, filter_by_periods, group_by_period, periods_of, summarize, ConsolidatedRecord,
};
use informe::report::csv_export::{
    detailed_csv, detailed_file_name, overview, payment_rows, summarize_by_nature, summary_csv,
    summary_file_name,
};
use informe::report::layout::{
    in2060_file_name, in2060_receipt_layout, simple_receipt_file_name, simple_receipt_layout,
};
use informe::report::pdf::{DocumentRenderer, PdfRenderer};
use informe::report::receipt::{assemble, CodeMapping};
use informe::runtime::orchestrator::ReportContext;
use informe::sources::configs::SourcesConfig;
use informe::types::SourceKind;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct AppState {
    contexts: HashMap<SourceKind, Arc<Mutex<ReportContext>>>,
    renderer: PdfRenderer,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        let status = match &err {
            ReportError::MissingDirectory(_) => StatusCode::NOT_FOUND,
            ReportError::Config(_) => StatusCode::BAD_REQUEST,
            e if e.is_per_file() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("[Report] {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct PeriodQuery {
    periods: Option<String>,
}

#[derive(Deserialize)]
struct CompetenceQuery {
    competences: Option<String>,
}

#[derive(Deserialize)]
struct MappingTarget {
    section: String,
    line: String,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs `work` against the module's context on the blocking pool.
async fn with_context<T, F>(state: &AppState, source: &str, work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut ReportContext) -> ApiResult<T> + Send + 'static,
{
    let kind: SourceKind = source
        .parse()
        .map_err(|e: String| ApiError::new(StatusCode::NOT_FOUND, e))?;
    let context = state.contexts.get(&kind).cloned().ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Source {kind} is not configured"),
        )
    })?;

    tokio::task::spawn_blocking(move || {
        let mut guard = context
            .lock()
            .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        work(&mut guard)
    })
    .await
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
}

fn selected_record(
    context: &mut ReportContext,
    cpf: &str,
    periods: &[String],
) -> ApiResult<ConsolidatedRecord> {
    let record = context.aggregate(cpf)?;
    if record.payments.is_empty() && record.stats.files_processed == 0 {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("No files indexed for {cpf}"),
        ));
    }
    Ok(filter_by_periods(&record, periods))
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn handle_subjects(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    with_context(&state, &source, move |ctx| {
        let subjects = ctx.search_subjects(query.q.as_deref().unwrap_or_default())?;
        Ok(Json(json!({
            "subjects": subjects,
            "notices": ctx.take_notices(),
        })))
    })
    .await
}

async fn handle_subject(
    State(state): State<Arc<AppState>>,
    Path((source, cpf)): Path<(String, String)>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let periods = split_list(query.periods.as_deref());
    with_context(&state, &source, move |ctx| {
        let full = ctx.aggregate(&cpf)?;
        let available = periods_of(&full);
        let record = filter_by_periods(&full, &periods);
        let classes = ctx.settings().income_classes.clone();
        Ok(Json(json!({
            "periods": available,
            "summaries": summarize(&record, &classes),
            "alerts": code_alerts(&record),
            "by_period": group_by_period(&record),
            "record": record,
            "notices": ctx.take_notices(),
        })))
    })
    .await
}

async fn handle_simple_receipt(
    State(state): State<Arc<AppState>>,
    Path((source, cpf)): Path<(String, String)>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Response> {
    let periods = split_list(query.periods.as_deref());
    let renderer = state.renderer.clone();
    with_context(&state, &source, move |ctx| {
        let record = selected_record(ctx, &cpf, &periods)?;
        let bytes = renderer.render(&simple_receipt_layout(&record))?;
        let file_name = simple_receipt_file_name(&cpf, &record.apportionment_period);
        Ok(attachment("application/pdf", &file_name, bytes))
    })
    .await
}

async fn handle_in2060_totals(
    State(state): State<Arc<AppState>>,
    Path((source, cpf)): Path<(String, String)>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let periods = split_list(query.periods.as_deref());
    with_context(&state, &source, move |ctx| {
        let record = selected_record(ctx, &cpf, &periods)?;
        let totals = assemble(&record, ctx.mapping());
        Ok(Json(json!({
            "receipt": totals,
            "notices": ctx.take_notices(),
        })))
    })
    .await
}

async fn handle_in2060_receipt(
    State(state): State<Arc<AppState>>,
    Path((source, cpf)): Path<(String, String)>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Response> {
    let periods = split_list(query.periods.as_deref());
    let renderer = state.renderer.clone();
    with_context(&state, &source, move |ctx| {
        let record = selected_record(ctx, &cpf, &periods)?;
        let totals = assemble(&record, ctx.mapping());
        let bytes = renderer.render(&in2060_receipt_layout(&totals))?;
        let file_name = in2060_file_name(&cpf, &totals.metadata.calendar_year);
        Ok(attachment("application/pdf", &file_name, bytes))
    })
    .await
}

async fn handle_get_mapping(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, |ctx| Ok(Json(ctx.mapping().clone()))).await
}

async fn handle_put_mapping(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Json(mapping): Json<CodeMapping>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, move |ctx| {
        *ctx.mapping_mut() = mapping;
        ctx.save_mapping()?;
        Ok(Json(ctx.mapping().clone()))
    })
    .await
}

async fn handle_set_mapping_code(
    State(state): State<Arc<AppState>>,
    Path((source, code)): Path<(String, String)>,
    Json(target): Json<MappingTarget>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, move |ctx| {
        ctx.mapping_mut().set(&code, &target.section, &target.line)?;
        ctx.save_mapping()?;
        Ok(Json(ctx.mapping().clone()))
    })
    .await
}

async fn handle_remove_mapping_code(
    State(state): State<Arc<AppState>>,
    Path((source, code)): Path<(String, String)>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, move |ctx| {
        ctx.mapping_mut().remove(&code);
        ctx.save_mapping()?;
        Ok(Json(ctx.mapping().clone()))
    })
    .await
}

async fn handle_reset_mapping(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, |ctx| {
        ctx.mapping_mut().reset();
        ctx.save_mapping()?;
        Ok(Json(ctx.mapping().clone()))
    })
    .await
}

async fn handle_clear_mapping(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> ApiResult<Json<CodeMapping>> {
    with_context(&state, &source, |ctx| {
        ctx.mapping_mut().clear();
        ctx.save_mapping()?;
        Ok(Json(ctx.mapping().clone()))
    })
    .await
}

async fn handle_rebuild(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    with_context(&state, &source, |ctx| {
        let index = ctx.rebuild()?;
        Ok(Json(json!({
            "subjects": index.len(),
            "notices": ctx.take_notices(),
        })))
    })
    .await
}

async fn handle_stats(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    with_context(&state, &source, |ctx| {
        let stats = ctx.stats()?;
        Ok(Json(json!(stats)))
    })
    .await
}

async fn handle_competences(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<String>>> {
    with_context(&state, SourceKind::Reinf4010.as_str(), |ctx| {
        Ok(Json(ctx.competences()?))
    })
    .await
}

fn selected_competences(ctx: &ReportContext, selected: Vec<String>) -> ApiResult<Vec<String>> {
    if selected.is_empty() {
        Ok(ctx.competences()?)
    } else {
        Ok(selected)
    }
}

async fn handle_overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompetenceQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let selected = split_list(query.competences.as_deref());
    with_context(&state, SourceKind::Reinf4010.as_str(), move |ctx| {
        let competences = selected_competences(ctx, selected)?;
        let (records, stats) = ctx.collect_records(&competences)?;
        Ok(Json(json!({
            "overview": overview(&competences, &records),
            "failures": stats.failures,
            "notices": ctx.take_notices(),
        })))
    })
    .await
}

enum ExportKind {
    Detailed,
    Summary,
}

async fn export_reinf(state: &AppState, query: CompetenceQuery, kind: ExportKind) -> ApiResult<Response> {
    let selected = split_list(query.competences.as_deref());
    with_context(state, SourceKind::Reinf4010.as_str(), move |ctx| {
        let competences = selected_competences(ctx, selected)?;
        let (records, stats) = ctx.collect_records(&competences)?;
        if !stats.failures.is_empty() {
            tracing::warn!("[Report] Export skipped {} file(s)", stats.failures.len());
        }
        let rows = payment_rows(&records);
        let (file_name, bytes) = match kind {
            ExportKind::Detailed => (detailed_file_name(&competences), detailed_csv(&rows)?),
            ExportKind::Summary => (
                summary_file_name(&competences),
                summary_csv(&summarize_by_nature(&rows))?,
            ),
        };
        Ok(attachment("text/csv; charset=utf-8", &file_name, bytes))
    })
    .await
}

async fn handle_detailed_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompetenceQuery>,
) -> ApiResult<Response> {
    export_reinf(&state, query, ExportKind::Detailed).await
}

async fn handle_summary_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompetenceQuery>,
) -> ApiResult<Response> {
    export_reinf(&state, query, ExportKind::Summary).await
}

async fn handle_health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match SourcesConfig::load_default() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("[Report] {err}");
            std::process::exit(1);
        }
    };

    let contexts = config
        .sources
        .iter()
        .map(|(kind, settings)| {
            tracing::info!(
                "[Report] {} reading from {}",
                kind.label(),
                settings.base_dir.display()
            );
            (
                *kind,
                Arc::new(Mutex::new(ReportContext::new(*kind, settings.clone()))),
            )
        })
        .collect();
    let state = Arc::new(AppState {
        contexts,
        renderer: PdfRenderer::default(),
    });

    let app = Router::new()
        .route("/reinf4010/competences", get(handle_competences))
        .route("/reinf4010/overview", get(handle_overview))
        .route("/reinf4010/export/detailed.csv", get(handle_detailed_csv))
        .route("/reinf4010/export/summary.csv", get(handle_summary_csv))
        .route("/{source}/subjects", get(handle_subjects))
        .route("/{source}/subjects/{cpf}", get(handle_subject))
        .route("/{source}/subjects/{cpf}/receipt.pdf", get(handle_simple_receipt))
        .route("/{source}/subjects/{cpf}/in2060", get(handle_in2060_totals))
        .route("/{source}/subjects/{cpf}/in2060.pdf", get(handle_in2060_receipt))
        .route(
            "/{source}/mapping",
            get(handle_get_mapping).put(handle_put_mapping),
        )
        .route(
            "/{source}/mapping/codes/{code}",
            delete(handle_remove_mapping_code).put(handle_set_mapping_code),
        )
        .route("/{source}/mapping/reset", post(handle_reset_mapping))
        .route("/{source}/mapping/clear", post(handle_clear_mapping))
        .route("/{source}/cache/rebuild", post(handle_rebuild))
        .route("/{source}/stats", get(handle_stats))
        .fallback(handle_health)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("[Report] Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server failed");
}
