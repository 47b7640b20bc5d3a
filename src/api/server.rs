//! HTTP Server - serves the cached course tree to the browser
//!
//! Builds the axum router, binds the listener and runs until Ctrl+C or SIGTERM.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::routes::{
    clear_cache_handler, courses_handler, folder_handler, status_handler, AppState,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/courses", get(courses_handler))
        .route("/folder/:folder_id", get(folder_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .route("/status", get(status_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `address` and serve until a shutdown signal arrives
pub async fn serve(address: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %address, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::drive::DriveError;
    use crate::sync::{SyncOptions, TreeCacheSync};
    use crate::testing::{file_entry, folder_entry, FakeLister};
    use reqwest::StatusCode;
    use serde_json::Value;
    use std::sync::Arc;

    async fn spawn_app(lister: &Arc<FakeLister>, root: Option<&str>) -> String {
        let state = AppState {
            sync: Arc::new(TreeCacheSync::new(lister.clone(), SyncOptions::default())),
            config: Arc::new(Config {
                root_folder_id: root.map(String::from),
                ..Config::default()
            }),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn course_lister() -> Arc<FakeLister> {
        Arc::new(
            FakeLister::new()
                .folder(
                    "R",
                    vec![
                        folder_entry("S", "Subject"),
                        file_entry("D", "Doc", "application/pdf"),
                    ],
                )
                .folder("S", vec![file_entry("V", "Video", "video/mp4")]),
        )
    }

    async fn get_json(url: &str) -> (StatusCode, Value) {
        let response = reqwest::get(url).await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_courses_returns_full_tree() {
        let lister = course_lister();
        let base = spawn_app(&lister, Some("R")).await;

        let (status, body) = get_json(&format!("{}/courses", base)).await;
        assert_eq!(status, StatusCode::OK);

        let courses = body["courses"].as_array().unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0]["id"], "D");
        assert!(courses[0].get("embedUrl").is_none());
        assert!(courses[0].get("children").is_none());
        assert_eq!(courses[1]["id"], "S");
        assert_eq!(
            courses[1]["children"][0]["embedUrl"],
            "https://drive.google.com/file/d/V/preview"
        );
    }

    #[tokio::test]
    async fn test_courses_without_root_is_500() {
        let lister = course_lister();
        let base = spawn_app(&lister, None).await;

        let (status, body) = get_json(&format!("{}/courses", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert_eq!(lister.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic_500() {
        let lister = Arc::new(
            FakeLister::new().failing("R", DriveError::Forbidden("secret-token-detail".into())),
        );
        let base = spawn_app(&lister, Some("R")).await;

        let (status, body) = get_json(&format!("{}/courses", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains("secret-token-detail"));
    }

    #[tokio::test]
    async fn test_degraded_tree_is_still_200() {
        let lister = Arc::new(
            FakeLister::new()
                .folder("R", vec![folder_entry("S1", "a"), folder_entry("S2", "b")])
                .folder("S1", vec![file_entry("F", "f", "text/plain")])
                .failing("S2", DriveError::Network("reset".into())),
        );
        let base = spawn_app(&lister, Some("R")).await;

        let (status, body) = get_json(&format!("{}/courses", base)).await;
        assert_eq!(status, StatusCode::OK);
        let s2 = &body["courses"][1];
        assert_eq!(s2["id"], "S2");
        assert_eq!(s2["children"], serde_json::json!([]));
        assert_eq!(s2["degraded"], true);
        assert!(body["courses"][0].get("degraded").is_none());
    }

    #[tokio::test]
    async fn test_folder_contents() {
        let lister = course_lister();
        let base = spawn_app(&lister, Some("R")).await;

        let (status, body) = get_json(&format!("{}/folder/S", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contents"][0]["id"], "V");

        let (status, body) = get_json(&format!("{}/folder/missing", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let lister = course_lister();
        let base = spawn_app(&lister, Some("R")).await;
        let client = reqwest::Client::new();

        get_json(&format!("{}/courses", base)).await;
        get_json(&format!("{}/courses", base)).await;
        assert_eq!(lister.calls_for("R"), 1);

        let response = client
            .post(format!("{}/cache/clear", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert!(body["message"].is_string());

        get_json(&format!("{}/courses", base)).await;
        assert_eq!(lister.calls_for("R"), 2);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let lister = course_lister();
        let base = spawn_app(&lister, Some("R")).await;

        get_json(&format!("{}/courses", base)).await;
        let (status, body) = get_json(&format!("{}/status", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["upstream"], "healthy");
        assert_eq!(body["cache"]["misses"], 1);
        assert!(body["recentErrors"].as_array().unwrap().is_empty());
    }
}
