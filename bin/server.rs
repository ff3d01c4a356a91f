// Listing Insights - Web Server
// JSON report API plus a static dashboard page

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use listing_insights::reports::{self, GroupDimension, PriceQuery};
use listing_insights::{
    export_listings_csv, run_report, Dataset, InsightsConfig, InsightsError, ReportKind,
    ReportParams,
};

/// JSON API and web dashboard for a listings dataset
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: <config dir>/listing-insights/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long)]
    addr: Option<String>,
}

/// Shared application state
///
/// Only the configuration is shared; every request reads a fresh snapshot.
#[derive(Clone)]
struct AppState {
    config: Arc<InsightsConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn status_for(err: &InsightsError) -> StatusCode {
    match err {
        InsightsError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        InsightsError::EmptyResult(_) | InsightsError::InvalidSelection(_) => StatusCode::NOT_FOUND,
    }
}

fn error_response(err: InsightsError) -> Response {
    if err.is_advisory() {
        warn!("{}", err);
    } else {
        error!("{}", err);
    }
    (
        status_for(&err),
        Json(ApiResponse::<()>::err(err.to_string())),
    )
        .into_response()
}

fn respond<T: Serialize>(result: Result<T, InsightsError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Read the configured source and run `f` over it, both off the async runtime
async fn with_snapshot<T, F>(state: &AppState, f: F) -> Result<T, InsightsError>
where
    T: Send + 'static,
    F: FnOnce(Dataset) -> Result<T, InsightsError> + Send + 'static,
{
    let source = state.config.data_source();
    tokio::task::spawn_blocking(move || f(source.snapshot()?))
        .await
        .map_err(|e| InsightsError::DataUnavailable(format!("snapshot task failed: {}", e)))?
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    since: Option<NaiveDate>,
    dimension: Option<String>,
    listing_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleQuery {
    n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    neighbourhood: String,
    room_type: String,
    #[serde(default = "default_bedrooms")]
    bedrooms: i32,
}

fn default_bedrooms() -> i32 {
    1
}

#[derive(Serialize)]
struct OptionsResponse {
    neighbourhoods: Vec<String>,
    room_types: Vec<String>,
    dimensions: Vec<&'static str>,
    reports: Vec<&'static str>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/reports/:name - Run one catalog report
async fn get_report(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let params = match build_params(&state.config, query) {
        Ok(params) => params,
        Err(e) => return error_response(e),
    };
    let kind = match name.parse::<ReportKind>() {
        Ok(kind) => kind,
        Err(e) => return error_response(e),
    };

    let result = with_snapshot(&state, move |data| run_report(kind, &data, &params)).await;
    respond(result)
}

fn build_params(config: &InsightsConfig, query: ReportQuery) -> Result<ReportParams, InsightsError> {
    let dimension = match query.dimension.as_deref() {
        Some(d) => d.parse::<GroupDimension>()?,
        None => GroupDimension::RoomType,
    };
    Ok(ReportParams {
        since: query.since.unwrap_or(config.recent_since),
        dimension,
        listing_id: query.listing_id,
    })
}

/// GET /api/listings/sample-ids - Random listing ids that have reviews
async fn get_sample_ids(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Response {
    let n = query.n.unwrap_or(state.config.sample_size);
    let result = with_snapshot(&state, move |data| {
        let points = reports::cumulative_reviews(&data.reviews);
        reports::sample_listing_ids(&points, n, &mut rand::rng())
    })
    .await;
    respond(result)
}

/// GET /api/options - Selector values for the dashboard
async fn get_options(State(state): State<AppState>) -> Response {
    let result = with_snapshot(&state, |data| {
        Ok(OptionsResponse {
            neighbourhoods: reports::neighbourhood_options(&data.listings),
            room_types: reports::room_type_options(&data.listings),
            dimensions: GroupDimension::ALL.iter().map(|d| d.as_str()).collect(),
            reports: ReportKind::ALL.iter().map(|k| k.name()).collect(),
        })
    })
    .await;
    respond(result)
}

/// GET /api/suggest - Price suggestion for a neighbourhood and room type
async fn get_suggestion(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Response {
    let query = PriceQuery {
        neighbourhood: query.neighbourhood,
        room_type: query.room_type,
        bedrooms: query.bedrooms,
    };
    let result =
        with_snapshot(&state, move |data| reports::suggest_price(&data.listings, &query)).await;
    respond(result)
}

/// GET /api/export - The listings snapshot as a CSV download
async fn export_csv(State(state): State<AppState>) -> Response {
    let result = with_snapshot(&state, |data| export_listings_csv(&data.listings)).await;

    match result {
        Ok(text) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"listings.csv\"",
                ),
            ],
            text,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/reports/:name", get(get_report))
        .route("/listings/sample-ids", get(get_sample_ids))
        .route("/options", get(get_options))
        .route("/suggest", get(get_suggestion))
        .route("/export", get(export_csv))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🌐 Listing Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cli = Cli::parse();
    let mut config = InsightsConfig::load(cli.config.as_deref())?;
    if let Some(addr) = cli.addr {
        config.server_addr = addr;
    }

    let source = config.data_source();
    println!("✓ Data source: {}", source.describe());

    let addr = config.server_addr.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/reports/revenue-by-area", addr);
    println!("   UI:  http://{}", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&InsightsError::DataUnavailable("gone".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&InsightsError::EmptyResult("none".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&InsightsError::InvalidSelection("bad".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_params_from_query() {
        let config = InsightsConfig::default();
        let params = build_params(
            &config,
            ReportQuery {
                dimension: Some("neighbourhood_group".into()),
                listing_id: Some(7),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(params.dimension, GroupDimension::NeighbourhoodGroup);
        assert_eq!(params.since, config.recent_since);
        assert_eq!(params.listing_id, Some(7));

        let err = build_params(
            &config,
            ReportQuery {
                dimension: Some("host".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.is_advisory());
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::try_parse_from(["insights-server", "--config", "berlin.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("berlin.toml")));
        assert!(cli.addr.is_none());
    }

    fn state_for(dir: &std::path::Path) -> AppState {
        let listings = dir.join("listings.csv");
        let reviews = dir.join("reviews.csv");
        std::fs::write(
            &listings,
            "id,name,host_id,host_name,neighbourhood_group,neighbourhood,room_type,price,\
minimum_nights,number_of_reviews,reviews_per_month,availability_365,number_of_reviews_ltm\n\
9,Loft,90,Ana,Central,Mitte,Entire home/apt,80,2,3,0.5,120,1\n",
        )
        .unwrap();
        std::fs::write(&reviews, "listing_id,date\n9,2025-02-01\n9,2025-03-01\n").unwrap();

        AppState {
            config: Arc::new(InsightsConfig {
                listings_csv: listings,
                reviews_csv: Some(reviews),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_snapshot_work_runs_in_blocking_task() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path());

        let ids = with_snapshot(&state, |data| {
            let points = reports::cumulative_reviews(&data.reviews);
            reports::sample_listing_ids(&points, 10, &mut rand::rng())
        })
        .await
        .unwrap();
        assert_eq!(ids, vec![9]);
    }

    #[tokio::test]
    async fn test_snapshot_failure_skips_work() {
        let state = AppState {
            config: Arc::new(InsightsConfig {
                listings_csv: PathBuf::from("/nonexistent/listings.csv"),
                ..Default::default()
            }),
        };

        let err = with_snapshot(&state, |_| -> Result<(), InsightsError> {
            panic!("work must not run without a snapshot")
        })
        .await
        .unwrap_err();
        assert_eq!(status_for(&err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_envelope() {
        let body = serde_json::to_value(ApiResponse::<()>::err("no data".into())).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "no data");
        assert!(body.get("data").is_none());
    }
}
