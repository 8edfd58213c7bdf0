//! HTTP server for the advisory endpoint and the form UI.

use advisor_core::{AdvisorError, AdvisorService, RawAdvisoryRequest};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Application state shared across handlers.
#[derive(Debug)]
pub struct AppState {
    pub advisor: AdvisorService,
}

#[derive(Debug, Serialize)]
struct PredictionResponse {
    prediction: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::Validation(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message,
                    error: None,
                },
            ),
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    message: "Prediction failed.".to_string(),
                    error: Some(error),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/v1/predictions/predict", post(predict))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C.
pub async fn run(advisor: AdvisorService, addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState { advisor }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawAdvisoryRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(raw) = payload.map_err(|rejection| {
        warn!("Rejected prediction body: {}", rejection.body_text());
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let request = raw.validate().inspect_err(|e| warn!("Invalid prediction request: {}", e))?;

    let advisory = state.advisor.advise(&request).await.map_err(|e| {
        error!("Prediction failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(PredictionResponse {
        prediction: advisory.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{
        WeatherProvider, WeatherSnapshot,
        model::RainDetection,
        strategy::{AdvisoryStrategy, FallbackStrategy, RulesStrategy},
    };
    use advisor_core::model::{Advisory, AdvisoryInput};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Debug)]
    struct CountingWeather {
        calls: Arc<AtomicUsize>,
        snapshot: Option<WeatherSnapshot>,
    }

    #[async_trait]
    impl WeatherProvider for CountingWeather {
        async fn fetch(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<WeatherSnapshot, AdvisorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.snapshot
                .clone()
                .ok_or_else(|| AdvisorError::UpstreamUnavailable("connection refused".into()))
        }
    }

    #[derive(Debug)]
    struct BrokenGenerator;

    #[async_trait]
    impl AdvisoryStrategy for BrokenGenerator {
        async fn advise(&self, _input: &AdvisoryInput) -> Result<Advisory, AdvisorError> {
            Err(AdvisorError::GenerativeUnavailable("timed out".into()))
        }
    }

    fn test_app(
        snapshot: Option<WeatherSnapshot>,
        strategy: Box<dyn AdvisoryStrategy>,
    ) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let weather = CountingWeather {
            calls: calls.clone(),
            snapshot,
        };
        let advisor = AdvisorService::new(Box::new(weather), strategy);

        (router(Arc::new(AppState { advisor })), calls)
    }

    fn clear_day() -> Option<WeatherSnapshot> {
        Some(WeatherSnapshot::new(22.0, 50.0, "Clear", RainDetection::Strict))
    }

    async fn post_predict(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/predictions/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predict_returns_rule_advisory() {
        let (app, calls) = test_app(clear_day(), Box::new(RulesStrategy::default()));

        let (status, body) = post_predict(
            app,
            r#"{"crop":"wheat","soilMoisture":20,"latitude":12.9,"longitude":77.6}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let prediction = body["prediction"].as_str().unwrap();
        assert!(prediction.contains("Needed immediately"));
        assert!(prediction.contains("Disease Risk: Low"));
        assert!(prediction.contains("nitrogen"));
        assert!(prediction.contains("No stress detected"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn predict_accepts_form_strings() {
        let (app, _) = test_app(clear_day(), Box::new(RulesStrategy::default()));

        let (status, body) = post_predict(
            app,
            r#"{"crop":"Tomato","soilMoisture":"75","latitude":"12.9","longitude":"77.6"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let prediction = body["prediction"].as_str().unwrap();
        assert!(prediction.contains("phosphorus"));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_without_fetching_weather() {
        let bodies = [
            r#"{"soilMoisture":20,"latitude":12.9,"longitude":77.6}"#,
            r#"{"crop":"wheat","latitude":12.9,"longitude":77.6}"#,
            r#"{"crop":"wheat","soilMoisture":20,"longitude":77.6}"#,
            r#"{"crop":"wheat","soilMoisture":20,"latitude":12.9}"#,
        ];

        for body in bodies {
            let (app, calls) = test_app(clear_day(), Box::new(RulesStrategy::default()));
            let (status, json) = post_predict(app, body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["message"], "Please provide all required fields.");
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (app, calls) = test_app(clear_day(), Box::new(RulesStrategy::default()));
        let (status, json) = post_predict(app, "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid request body"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_outage_is_internal_error() {
        let (app, _) = test_app(None, Box::new(RulesStrategy::default()));

        let (status, json) = post_predict(
            app,
            r#"{"crop":"wheat","soilMoisture":20,"latitude":12.9,"longitude":77.6}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Prediction failed.");
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("connection refused"));
    }

    #[tokio::test]
    async fn generative_failure_is_invisible_to_callers() {
        let strategy = FallbackStrategy::new(BrokenGenerator, RulesStrategy::default());
        let (app, _) = test_app(clear_day(), Box::new(strategy));

        let (status, body) = post_predict(
            app,
            r#"{"crop":"durian","soilMoisture":45,"latitude":1.3,"longitude":103.8}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let prediction = body["prediction"].as_str().unwrap();
        for marker in ["- Watering:", "- Disease Risk:", "- Fertilizer:", "- Stress:"] {
            assert!(prediction.contains(marker));
        }
        assert!(prediction.contains("balanced nutrients"));
    }

    #[tokio::test]
    async fn index_serves_form() {
        let (app, _) = test_app(clear_day(), Box::new(RulesStrategy::default()));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Crop Health Advisor"));
        assert!(html.contains("/api/v1/predictions/predict"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_app(clear_day(), Box::new(RulesStrategy::default()));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
