//! API route definitions
//!
//! - /api/v1/health - liveness and run status
//! - /api/v1/snapshot - full pipeline snapshot for rendering
//! - /api/v1/start, /api/v1/stop - run control
//! - /api/v1/parameter - tilt adjustment

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};
use crate::types::SensorKind;

/// Create the command and snapshot routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/snapshot", get(handlers::get_snapshot))
        .route("/start", post(handlers::post_start))
        .route("/stop", post(handlers::post_stop))
        .route("/parameter", post(handlers::post_parameter))
        .with_state(state)
}

/// Mock ingestion endpoints at the paths the sensors post to
pub fn ingest_routes() -> Router {
    Router::new()
        .route(SensorKind::TfLuna.endpoint(), post(handlers::ingest_distance))
        .route(SensorKind::Mpu.endpoint(), post(handlers::ingest_orientation))
        .route(SensorKind::Imx477.endpoint(), post(handlers::ingest_image_quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::pipeline::{PipelineScheduler, PipelineStore};
    use crate::transport::StubTransport;
    use crate::types::RunMode;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        let mut config = SimConfig::default();
        config.transport.latency_min_ms = 0;
        config.transport.latency_max_ms = 1;
        let store = PipelineStore::new(config.parameter.bound_deg);
        let scheduler =
            PipelineScheduler::new(store.clone(), Arc::new(StubTransport::accepting()), &config);
        ApiState {
            store,
            scheduler,
            default_mode: RunMode::SingleBatch,
            step_deg: config.parameter.step_deg,
            transport: "stub".to_string(),
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_routes_health() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = json_body(response).await;
        assert_eq!(v["data"]["status"], "ok");
        assert_eq!(v["data"]["running"], false);
    }

    #[tokio::test]
    async fn test_api_routes_snapshot_starts_empty() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/snapshot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = json_body(response).await;
        assert_eq!(v["data"]["packets"], serde_json::json!([]));
        assert!(v["data"]["dashboard"]["distance_m"].is_null());
        assert_eq!(v["data"]["tripod_frame"], 3);
    }

    #[tokio::test]
    async fn test_api_routes_start_with_empty_body_uses_default_mode() {
        let state = create_test_state();
        let app = api_routes(state.clone());

        let response = app.oneshot(post_json("/start", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = json_body(response).await;
        assert_eq!(v["data"]["outcome"], "started");
        assert_eq!(v["data"]["mode"], "single_batch");
        assert!(state.scheduler.wait_for_idle(std::time::Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_api_routes_start_twice_reports_already_running() {
        let state = create_test_state();
        let app = api_routes(state.clone());

        let first = app
            .clone()
            .oneshot(post_json("/start", r#"{"mode":"recurring"}"#))
            .await
            .unwrap();
        assert_eq!(json_body(first).await["data"]["mode"], "recurring");

        let second = app
            .clone()
            .oneshot(post_json("/start", r#"{"mode":"single_batch"}"#))
            .await
            .unwrap();
        assert_eq!(json_body(second).await["data"]["outcome"], "already_running");

        let stop = app.clone().oneshot(post_json("/stop", "")).await.unwrap();
        assert_eq!(json_body(stop).await["data"]["outcome"], "stopped");
        let again = app.oneshot(post_json("/stop", "")).await.unwrap();
        assert_eq!(json_body(again).await["data"]["outcome"], "already_stopped");
    }

    #[tokio::test]
    async fn test_api_routes_start_rejects_unknown_mode() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(post_json("/start", r#"{"mode":"forever"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_api_routes_parameter_is_clamped() {
        let state = create_test_state();
        let app = api_routes(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/parameter", r#"{"delta": 40.0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = json_body(response).await;
        assert_eq!(v["data"]["tilt_deg"], 15.0);
        assert_eq!(v["data"]["step_deg"], 0.5);

        let bad = app
            .oneshot(post_json("/parameter", r#"{"delta": "up"}"#))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.store.snapshot().tilt_deg, 15.0);
    }

    #[tokio::test]
    async fn test_ingest_routes_accept_and_reject() {
        let good = r#"{"id_project":1,"distancia_cm":200,"distancia_m":2.0,"fuerza_senal":5100,
            "temperatura":51.2,"event":true,"timestamp":"2026-01-01 12:00:00"}"#;
        let response = ingest_routes()
            .oneshot(post_json("/tfluna/sensor", good))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ingest_routes()
            .oneshot(post_json("/imx477/sensor", good))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
