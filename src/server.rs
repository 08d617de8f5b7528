use crate::messages;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use woundlens::{
    AnalysisEngine, AnalysisEngineResult, AnalysisEngineState, AnalysisError, AnalysisRequest,
    App, ImagePayload, Tab, record::parse_age, report, samples,
};

pub struct ServerState {
    pub engine: AnalysisEngine,
    pub app: Mutex<App>,
    pub report_dir: PathBuf,
}

type SharedState = State<Arc<ServerState>>;

fn error_status(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::AnalysisFailed(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::NoJsonFound | AnalysisError::MalformedResponse(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

async fn post_analyze(
    State(state): SharedState,
    Json(payload): Json<messages::AnalyzeRequest>,
) -> impl IntoResponse {
    let image = match ImagePayload::from_path(&payload.image_path) {
        Ok(image) => image,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };
    let age = payload.age.as_deref().and_then(parse_age);

    let mut app = state.app.lock().unwrap();
    if let Err(busy) = app.state_mut().start_analysis() {
        log::debug!("Engine is still processing");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": busy.to_string() })),
        );
    }

    match state.engine.schedule_analysis(AnalysisRequest { image, age }) {
        Some(id) => {
            log::info!("Scheduled analysis #{id}");
            (StatusCode::OK, Json(json!({ "status": "scheduled", "id": id })))
        }
        None => {
            let message = "Analysis engine is not running".to_string();
            app.state_mut().analysis_failed(message.clone());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
        }
    }
}

async fn get_result(State(state): SharedState) -> impl IntoResponse {
    match state.engine.try_poll_response() {
        AnalysisEngineResult::Success(response) => {
            let mut app = state.app.lock().unwrap();
            match app.finish_analysis(response.request, response.outcome) {
                Ok(record) => {
                    let body = messages::AnalysisResponse {
                        id: response.id,
                        duration: response.duration,
                        result: record.clone(),
                    };
                    (
                        StatusCode::OK,
                        Json(json!({ "status": "success", "response": body })),
                    )
                }
                Err(e) => (
                    error_status(&e),
                    Json(json!({ "status": "error", "message": e.to_string() })),
                ),
            }
        }
        AnalysisEngineResult::Empty(AnalysisEngineState::Processing) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": AnalysisEngineState::Processing.as_str() })),
        ),
        AnalysisEngineResult::Empty(idle) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": idle.as_str(), "message": "No pending analysis" })),
        ),
        AnalysisEngineResult::Error(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": e })),
        ),
    }
}

async fn get_state(State(state): SharedState) -> impl IntoResponse {
    let app = state.app.lock().unwrap();
    Json(json!(app.state()))
}

async fn get_history(State(state): SharedState) -> impl IntoResponse {
    let mut app = state.app.lock().unwrap();
    app.state_mut().select_tab(Tab::History);
    Json(json!(app.history().entries()))
}

async fn get_history_entry(
    State(state): SharedState,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let mut app = state.app.lock().unwrap();
    match app.view_history_entry(index) {
        Some(record) => (StatusCode::OK, Json(json!(record))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No history entry at index {index}") })),
        ),
    }
}

async fn get_samples(State(state): SharedState) -> impl IntoResponse {
    state.app.lock().unwrap().state_mut().select_tab(Tab::Samples);
    Json(json!(samples::sample_results()))
}

async fn post_report(State(state): SharedState, Path(index): Path<usize>) -> impl IntoResponse {
    let record = {
        let mut app = state.app.lock().unwrap();
        app.state_mut().select_tab(Tab::Report);
        app.history().select_by_index(index).cloned()
    };
    let Some(record) = record else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No history entry at index {index}") })),
        );
    };

    let dir = state.report_dir.clone();
    match tokio::task::spawn_blocking(move || report::export_report(&record, &dir)).await {
        Ok(Ok(path)) => (
            StatusCode::OK,
            Json(json!(messages::ReportResponse { path })),
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Welcome to Woundlens!" }))
        .route("/analyze", post(post_analyze))
        .route("/results", get(get_result))
        .route("/state", get(get_state))
        .route("/history", get(get_history))
        .route("/history/{index}", get(get_history_entry))
        .route("/samples", get(get_samples))
        .route("/report/{index}", post(post_report))
        .with_state(state)
}

pub async fn serve(
    addr: String,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    log::info!("Starting the server");
    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use std::{sync::mpsc, time::Duration};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use woundlens::{
        Analyzer, ConfigError, HistoryStore, InferenceModel, InferenceRequest, InferenceResponse,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("gate closed")]
    struct GateClosed;

    /// Returns `reply` each time the test opens the gate.
    struct GatedModel {
        gate: mpsc::Receiver<()>,
        reply: &'static str,
    }

    impl InferenceModel for GatedModel {
        type Error = GateClosed;

        fn run(&mut self, _request: InferenceRequest<'_>) -> Result<InferenceResponse, GateClosed> {
            self.gate.recv().map_err(|_| GateClosed)?;
            Ok(InferenceResponse {
                text: self.reply.to_string(),
            })
        }
    }

    // fields drop in order: the gate closes before the engine joins its worker
    struct Fixture {
        gate: mpsc::Sender<()>,
        state: Arc<ServerState>,
        image_path: PathBuf,
        _temp: TempDir,
    }

    fn fixture(reply: &'static str) -> Fixture {
        let temp = TempDir::new().unwrap();
        let image_path = temp.path().join("wound.png");
        std::fs::write(&image_path, [0x89, b'P', b'N', b'G']).unwrap();

        let (gate, gate_rx) = mpsc::channel();
        let model = GatedModel {
            gate: gate_rx,
            reply,
        };
        let state = Arc::new(ServerState {
            engine: AnalysisEngine::new(Analyzer::new(model)),
            app: Mutex::new(App::new(HistoryStore::load(temp.path().join("history.json")))),
            report_dir: temp.path().to_path_buf(),
        });
        Fixture {
            gate,
            state,
            image_path,
            _temp: temp,
        }
    }

    async fn call(
        state: &Arc<ServerState>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn poll_until_done(state: &Arc<ServerState>) -> (StatusCode, Value) {
        for _ in 0..500 {
            let (status, body) = call(state, "GET", "/results", None).await;
            if status != StatusCode::ACCEPTED {
                return (status, body);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("analysis never finished");
    }

    #[tokio::test]
    async fn analysis_is_scheduled_polled_and_recorded() {
        let fx = fixture(r#"{"type":"Burn","stage":"Inflammatory","severity":40}"#);
        let submit = json!({ "image_path": fx.image_path, "age": "8" });

        let (status, body) = call(&fx.state, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "idle");

        let (status, body) = call(&fx.state, "POST", "/analyze", Some(submit.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "scheduled");

        // one submission at a time
        let (status, _) = call(&fx.state, "POST", "/analyze", Some(submit)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&fx.state, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "processing");
        let (_, body) = call(&fx.state, "GET", "/state", None).await;
        assert_eq!(body["busy"], true);

        fx.gate.send(()).unwrap();
        let (status, body) = poll_until_done(&fx.state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let result = &body["response"]["result"];
        assert_eq!(result["type"], "Burn");
        assert_eq!(result["severity"], 40);
        assert_eq!(result["ageGroup"], "Child");
        assert_eq!(fx.state.app.lock().unwrap().history().len(), 1);

        // the result is handed out once
        let (status, _) = call(&fx.state, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&fx.state, "GET", "/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        let (status, body) = call(&fx.state, "GET", "/history/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "Inflammatory");
        let (status, _) = call(&fx.state, "GET", "/history/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&fx.state, "POST", "/report/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = call(&fx.state, "GET", "/state", None).await;
        assert_eq!(body["busy"], false);
        assert_eq!(body["tab"], "report");
    }

    #[tokio::test]
    async fn unusable_reply_is_unprocessable_and_not_recorded() {
        let fx = fixture("I cannot assess this image.");
        let submit = json!({ "image_path": fx.image_path });

        let (status, _) = call(&fx.state, "POST", "/analyze", Some(submit.clone())).await;
        assert_eq!(status, StatusCode::OK);
        fx.gate.send(()).unwrap();
        let (status, body) = poll_until_done(&fx.state).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");

        {
            let app = fx.state.app.lock().unwrap();
            assert!(app.history().is_empty());
            assert!(app.state().last_error().is_some());
            assert!(!app.state().is_busy());
        }

        // the failure frees the app for a resubmission
        let (status, _) = call(&fx.state, "POST", "/analyze", Some(submit)).await;
        assert_eq!(status, StatusCode::OK);
        fx.gate.send(()).unwrap();
        let (status, _) = poll_until_done(&fx.state).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn non_image_path_is_rejected_before_scheduling() {
        let fx = fixture("{}");
        let submit = json!({ "image_path": fx.image_path.with_extension("txt") });

        let (status, body) = call(&fx.state, "POST", "/analyze", Some(submit)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(!fx.state.app.lock().unwrap().state().is_busy());
        let (status, _) = call(&fx.state, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn analysis_errors_map_to_statuses() {
        let missing = ConfigError::MissingCredential("GEMINI_API_KEY");
        let missing = AnalysisError::Configuration(missing);
        assert_eq!(error_status(&missing), StatusCode::SERVICE_UNAVAILABLE);
        let failed = AnalysisError::AnalysisFailed("connection refused".into());
        assert_eq!(error_status(&failed), StatusCode::BAD_GATEWAY);
        assert_eq!(
            error_status(&AnalysisError::NoJsonFound),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let malformed = serde_json::from_str::<Value>("{").unwrap_err();
        assert_eq!(
            error_status(&AnalysisError::MalformedResponse(malformed)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
