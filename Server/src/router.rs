use std::{path::PathBuf, sync::Arc};

use axum::{http::Request, routing::get, Router};
use dash_loop::ManifestEngine;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::{DefaultMakeSpan, TraceLayer}};
use tracing::instrument;

use crate::handlers::{crossdomain, dash};
use crate::types::AppState;

#[instrument(skip_all)]
pub fn create_router(engine: Arc<ManifestEngine>, base_dir: PathBuf) -> Router {
    let app_state = AppState {
        engine,
        base_dir: Arc::new(base_dir),
    };

    Router::new()
        .route("/crossdomain.xml", get(crossdomain::fetch_crossdomain))
        // Dash endpoints
        .route("/:manifest_name", get(dash::fetch_dash_mpd))
        .route("/:repr_id/:fragment", get(dash::fetch_dash_segment))
        .layer(
            // Browser players are usually served from another origin
            CorsLayer::permissive()
        )
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new())
                        .on_request(
                        |request: &Request<axum::body::Body>, _span: &tracing::Span| {
                            // Fragment requests are too frequent to log individually
                            if request.uri().path().ends_with(".mpd") {
                                tracing::info!(
                                    "Received request for endpoint: {}",
                                    request.uri().path()
                                );
                            }
                        })
                )
        )
        .with_state(app_state)
}
