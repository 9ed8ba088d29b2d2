use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::instrument;

use crate::{
    auth,
    auth::dto::{HealthResponse, TestEmailResponse},
    error::ApiError,
    state::AppState,
};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .route("/health", get(health))
                .route("/test-email", get(test_email)),
        )
        .fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        timestamp: timestamp(),
        email_configured: state.mailer.is_configured(),
    })
}

#[instrument(skip(state))]
async fn test_email(State(state): State<AppState>) -> Result<Json<TestEmailResponse>, ApiError> {
    let Some(email_user) = state.mailer.sender() else {
        return Err(ApiError::EmailNotConfigured);
    };
    if !state.mailer.test_connection().await {
        return Err(ApiError::EmailSendFailed);
    }
    Ok(Json(TestEmailResponse {
        message: "Email configuration is working!".into(),
        email_user,
        timestamp: timestamp(),
    }))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
