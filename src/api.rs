//! REST API for the packing estimation service.
//!
//! Provides HTTP endpoints for communication with the frontend.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::estimator;
use crate::extract::{self, ExtractedDimensions, GeometrySource};
use crate::model::{
    Dimensions, OptimizationInfo, PackingReport, PlacedItem, PlacementSource, ShapeKind,
    ShapeProfile, ShapedItem, ValidationError,
};
use crate::scan::{Complexity, ModelSummary};
use crate::search::{CancelHandle, SearchPolicy};
use crate::shape;
use crate::solver::HeuristicSolver;

#[derive(Clone)]
struct ApiState {
    policy: SearchPolicy,
    solver: HeuristicSolver,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pack-it-in API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// One solid in an estimation request.
///
/// The shape profile may be given explicitly; omitted factors fall back to
/// the defaults of `shape_type`, and a missing `shape_type` means plain
/// rectangular.
#[derive(Deserialize, Clone, Copy, ToSchema)]
pub struct ItemSpec {
    #[schema(value_type = [f64; 3], example = json!([1000.0, 800.0, 600.0]))]
    pub dims: (f64, f64, f64),
    #[serde(default)]
    #[schema(nullable = true)]
    pub shape_type: Option<ShapeKind>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub volume_factor: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub packing_efficiency: Option<f64>,
}

impl ItemSpec {
    fn into_shaped(self) -> Result<ShapedItem, ValidationError> {
        let dimensions = Dimensions::new(self.dims.0, self.dims.1, self.dims.2)?;
        let kind = self.shape_type.unwrap_or(ShapeKind::Rectangular);
        let volume_factor = self
            .volume_factor
            .unwrap_or_else(|| shape::default_volume_factor(kind));
        let packing_efficiency = self
            .packing_efficiency
            .unwrap_or_else(|| shape::packing_efficiency_for(kind));
        let profile = ShapeProfile::new(kind, volume_factor, packing_efficiency)?;
        Ok(ShapedItem::new(dimensions, profile))
    }
}

/// Request structure for the estimation endpoints.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "dims": [1000.0, 800.0, 600.0] },
        "item": { "dims": [200.0, 150.0, 100.0], "shape_type": "cylindrical" }
    })
)]
pub struct EstimateRequest {
    pub container: ItemSpec,
    pub item: ItemSpec,
}

/// Labeled solid for batch requests.
#[derive(Deserialize, Clone, ToSchema)]
pub struct NamedSpec {
    pub name: String,
    pub spec: ItemSpec,
}

/// Batch request: every container is estimated against every item.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "containers": [
            { "name": "euro-box", "spec": { "dims": [600.0, 400.0, 320.0] } }
        ],
        "items": [
            { "name": "can", "spec": { "dims": [100.0, 100.0, 150.0], "shape_type": "cylindrical" } }
        ]
    })
)]
pub struct BatchRequest {
    pub containers: Vec<NamedSpec>,
    pub items: Vec<NamedSpec>,
}

/// One container/item pairing of a batch run.
#[derive(Serialize, ToSchema)]
pub struct BatchEntry {
    pub container: String,
    pub item: String,
    pub report: PackingReport,
}

/// Response structure of the batch endpoint.
#[derive(Serialize, ToSchema)]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
}

/// Request structure for the extraction endpoint.
///
/// `content` is the textual geometry source; `explicit_dims` short-circuits
/// the size analysis while the shape is still classified.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "name": "cylinder_40x40x90.stp",
        "content": "ISO-10303-21;\nHEADER;\n/* ... */"
    })
)]
pub struct ExtractRequest {
    pub name: String,
    pub content: String,
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub explicit_dims: Option<(f64, f64, f64)>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn parse_estimate_request(
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<(ShapedItem, ShapedItem), Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    let container = payload
        .container
        .into_shaped()
        .map_err(|err| container_config_error(err.to_string()))?;
    let item = payload
        .item
        .into_shaped()
        .map_err(|err| validation_error(err.to_string()))?;
    Ok((container, item))
}

fn parse_named_specs(
    specs: Vec<NamedSpec>,
    role: &str,
) -> Result<Vec<(String, ShapedItem)>, Response> {
    specs
        .into_iter()
        .map(|named| {
            let shaped = named.spec.into_shaped().map_err(|err| {
                validation_error(format!("{} '{}': {}", role, named.name, err))
            })?;
            Ok((named.name, shaped))
        })
        .collect()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_estimate,
        handle_estimate_stream,
        handle_estimate_batch,
        handle_extract
    ),
    components(
        schemas(
            ItemSpec,
            EstimateRequest,
            NamedSpec,
            BatchRequest,
            BatchEntry,
            BatchResponse,
            ExtractRequest,
            ErrorResponse,
            PackingReport,
            PlacedItem,
            OptimizationInfo,
            PlacementSource,
            Dimensions,
            ShapeKind,
            ShapeProfile,
            ExtractedDimensions,
            GeometrySource,
            Complexity
        )
    ),
    tags((name = "estimation", description = "Endpoints for packing estimation"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, engine_config: EngineConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        policy: engine_config.search_policy(),
        solver: engine_config.solver(),
    };

    let app = Router::new()
        // API endpoints
        .route("/estimate", post(handle_estimate))
        .route("/estimate_stream", post(handle_estimate_stream))
        .route("/estimate_batch", post(handle_estimate_batch))
        .route("/extract", post(handle_extract))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /estimate");
    println!("   - POST /estimate_stream");
    println!("   - POST /estimate_batch");
    println!("   - POST /extract");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");
    println!("🌐 Web-UI: http://{}:{}", display_host, config.port());

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /estimate endpoint.
///
/// Estimates how many copies of the item fit into the container.
///
/// # Parameters
/// * `payload` - JSON payload with container and item specifications
///
/// # Returns
/// JSON `PackingReport` with counts, volumes and placements
#[utoipa::path(
    post,
    path = "/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Successfully estimated packing", body = PackingReport),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "estimation"
)]
async fn handle_estimate(
    State(state): State<ApiState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (container, item) = match parse_estimate_request(payload) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    println!(
        "📥 New estimate request: container {:?}, item {:?}",
        container.dimensions.as_tuple(),
        item.dimensions.as_tuple()
    );
    let report =
        estimator::estimate_packing_with_config(&container, &item, &state.policy, &state.solver);
    println!(
        "📦 Result: {} objects, {:.2}% efficiency",
        report.max_objects, report.efficiency_percent
    );

    (StatusCode::OK, Json(report)).into_response()
}

/// Handler for POST /estimate_stream endpoint (SSE).
///
/// Streams estimation events in real-time as Server-Sent Events
/// (text/event-stream). The frontend can follow the grid estimate and the
/// individual solver trials without waiting for the final report. A closed
/// stream cancels the remaining search waves.
#[utoipa::path(
    post,
    path = "/estimate_stream",
    request_body = EstimateRequest,
    responses(
        (
            status = 200,
            description = "Streams estimation events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "estimation"
)]
async fn handle_estimate_stream(
    State(state): State<ApiState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (container, item) = match parse_estimate_request(payload) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let policy = state.policy;
    let solver = state.solver;
    let worker_cancel = CancelHandle::new();
    tokio::task::spawn_blocking(move || {
        let callback_cancel = worker_cancel.clone();
        let _ = estimator::estimate_packing_with_progress(
            &container,
            &item,
            &policy,
            &solver,
            &worker_cancel,
            |event| {
                if let Ok(json) = serde_json::to_string(event) {
                    if tx.blocking_send(json).is_err() {
                        // Receiver has closed the stream; stop the search.
                        callback_cancel.cancel();
                    }
                }
            },
        );
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /estimate_batch endpoint.
///
/// Runs the estimation pipeline for every container × item pairing of the
/// request and returns one report per pairing.
#[utoipa::path(
    post,
    path = "/estimate_batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Successfully estimated all pairings", body = BatchResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "estimation"
)]
async fn handle_estimate_batch(
    State(state): State<ApiState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    if payload.containers.is_empty() || payload.items.is_empty() {
        return validation_error("At least one container and one item must be specified");
    }

    let containers = match parse_named_specs(payload.containers, "Container") {
        Ok(containers) => containers,
        Err(response) => return response,
    };
    let items = match parse_named_specs(payload.items, "Item") {
        Ok(items) => items,
        Err(response) => return response,
    };

    println!(
        "📥 New batch request: {} containers × {} items",
        containers.len(),
        items.len()
    );

    let mut results = Vec::with_capacity(containers.len() * items.len());
    for (container_name, container) in &containers {
        for (item_name, item) in &items {
            let report = estimator::estimate_packing_with_config(
                container,
                item,
                &state.policy,
                &state.solver,
            );
            results.push(BatchEntry {
                container: container_name.clone(),
                item: item_name.clone(),
                report,
            });
        }
    }

    println!("📦 Batch finished: {} reports", results.len());
    (StatusCode::OK, Json(BatchResponse { results })).into_response()
}

/// Handler for POST /extract endpoint.
///
/// Scans the submitted geometry content and extracts canonical dimensions
/// plus a shape profile, tagged with the extraction path that produced
/// them.
#[utoipa::path(
    post,
    path = "/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Successfully extracted dimensions", body = ExtractedDimensions),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "estimation"
)]
async fn handle_extract(
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let summary = ModelSummary::from_content(&payload.name, &payload.content);
    let extracted = extract::extract(&summary, payload.explicit_dims);
    (StatusCode::OK, Json(extracted)).into_response()
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/estimate", "/estimate_stream", "/estimate_batch", "/extract"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["EstimateRequest", "PackingReport", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn item_spec_defaults_to_rectangular() {
        let json = r#"{ "dims": [100.0, 80.0, 60.0] }"#;
        let spec: ItemSpec = serde_json::from_str(json).expect("Should parse valid JSON");
        let shaped = spec.into_shaped().expect("Should validate");
        assert_eq!(shaped.profile.shape_type, ShapeKind::Rectangular);
        assert_eq!(shaped.profile.volume_factor, 1.0);
        assert_eq!(shaped.profile.packing_efficiency, 1.0);
    }

    #[test]
    fn item_spec_derives_factors_from_shape_type() {
        let json = r#"{ "dims": [100.0, 100.0, 150.0], "shape_type": "cylindrical" }"#;
        let spec: ItemSpec = serde_json::from_str(json).expect("Should parse valid JSON");
        let shaped = spec.into_shaped().expect("Should validate");
        assert_eq!(shaped.profile.shape_type, ShapeKind::Cylindrical);
        assert!((shaped.profile.volume_factor - 0.785).abs() < 1e-9);
        assert!((shaped.profile.packing_efficiency - 0.7).abs() < 1e-9);
    }

    #[test]
    fn item_spec_explicit_factor_overrides_default() {
        let json = r#"{
            "dims": [100.0, 100.0, 150.0],
            "shape_type": "cylindrical",
            "volume_factor": 0.5
        }"#;
        let spec: ItemSpec = serde_json::from_str(json).expect("Should parse valid JSON");
        let shaped = spec.into_shaped().expect("Should validate");
        assert!((shaped.profile.volume_factor - 0.5).abs() < 1e-9);
        assert!((shaped.profile.packing_efficiency - 0.7).abs() < 1e-9);
    }

    #[test]
    fn item_spec_rejects_invalid_dimensions() {
        let json = r#"{ "dims": [0.0, 80.0, 60.0] }"#;
        let spec: ItemSpec = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(spec.into_shaped().is_err());
    }

    #[test]
    fn item_spec_rejects_invalid_factor() {
        let json = r#"{ "dims": [100.0, 80.0, 60.0], "packing_efficiency": 1.5 }"#;
        let spec: ItemSpec = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(spec.into_shaped().is_err());
    }

    #[test]
    fn estimate_request_parses_nested_specs() {
        let json = r#"{
            "container": { "dims": [1000.0, 800.0, 600.0] },
            "item": { "dims": [200.0, 150.0, 100.0], "shape_type": "spherical" }
        }"#;
        let request: EstimateRequest =
            serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.item.shape_type, Some(ShapeKind::Spherical));
        assert_eq!(request.container.shape_type, None);
    }

    #[test]
    fn extract_request_defaults_explicit_dims_to_none() {
        let json = r#"{ "name": "part.stp", "content": "" }"#;
        let request: ExtractRequest =
            serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.explicit_dims, None);
    }
}
