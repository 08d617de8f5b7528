use crate::analyzer::Analyzer;
use crate::error::AnalysisError;
use crate::model::InferenceModel;
use crate::payload::ImagePayload;
use crate::record::AnalysisCore;
use std::{
    sync::{Arc, Mutex, mpsc},
    thread::JoinHandle,
    time::{Duration, Instant},
};

type EngineReceiver = Arc<Mutex<mpsc::Receiver<AnalysisEngineResponse>>>;

/// Represents the current state of the analysis engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisEngineState {
    /// Ready to accept a new submission.
    Idle,
    /// An analysis is in flight.
    Processing,
}

impl AnalysisEngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisEngineState::Idle => "idle",
            AnalysisEngineState::Processing => "processing",
        }
    }
}

/// One user submission: the image and the optional age.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub image: ImagePayload,
    pub age: Option<u32>,
}

struct AnalysisEngineRequest {
    id: u32,
    request: AnalysisRequest,
}

/// Completed analysis with its telemetry. The request is handed back so the
/// caller can attach the image and age to the record.
pub struct AnalysisEngineResponse {
    pub id: u32,
    pub start_time: Instant,
    pub duration: Duration,
    pub request: AnalysisRequest,
    pub outcome: Result<AnalysisCore, AnalysisError>,
}

/// Result type returned when polling for analysis results.
pub enum AnalysisEngineResult {
    Success(AnalysisEngineResponse),
    /// No result available yet, with current engine state.
    Empty(AnalysisEngineState),
    Error(String),
}

/// Runs an [`Analyzer`] on a dedicated thread so async callers never block on the
/// endpoint. There is no cancellation: a hung request keeps the engine busy.
pub struct AnalysisEngine {
    state: Arc<Mutex<AnalysisEngineState>>,
    req_tx: Option<mpsc::Sender<AnalysisEngineRequest>>,
    rep_rx: EngineReceiver,
    worker_handle: Option<JoinHandle<()>>,
    id_counter: Mutex<u32>,
}

impl AnalysisEngine {
    /// Moves the analyzer onto a new worker thread.
    pub fn new<M>(mut analyzer: Analyzer<M>) -> Self
    where
        M: InferenceModel + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<AnalysisEngineRequest>();
        let (rep_tx, rep_rx) = mpsc::channel::<AnalysisEngineResponse>();
        let state = Arc::new(Mutex::new(AnalysisEngineState::Idle));

        let worker_handle = std::thread::spawn({
            let state = state.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Starting analysis #{}", req.id);

                    *state.lock().unwrap() = AnalysisEngineState::Processing;
                    let start_time = Instant::now();

                    let outcome = analyzer.analyze(&req.request.image, req.request.age);

                    match &outcome {
                        Ok(_) => log::debug!("Analysis #{} completed", req.id),
                        Err(e) => log::error!("Analysis #{} failed: {e}", req.id),
                    }

                    // response and Idle become visible together
                    let mut guard = state.lock().unwrap();
                    let _ = rep_tx.send(AnalysisEngineResponse {
                        id: req.id,
                        start_time,
                        duration: start_time.elapsed(),
                        request: req.request,
                        outcome,
                    });
                    *guard = AnalysisEngineState::Idle;
                }
            }
        });

        Self {
            state,
            req_tx: Some(req_tx),
            rep_rx: Arc::new(Mutex::new(rep_rx)),
            worker_handle: Some(worker_handle),
            id_counter: Mutex::new(0),
        }
    }

    pub fn state(&self) -> AnalysisEngineState {
        *self.state.lock().unwrap()
    }

    /// Attempts to retrieve a completed analysis without blocking.
    pub fn try_poll_response(&self) -> AnalysisEngineResult {
        let state = self.state.lock().unwrap();
        match self.rep_rx.lock().unwrap().try_recv() {
            Ok(response) => AnalysisEngineResult::Success(response),
            Err(mpsc::TryRecvError::Empty) => AnalysisEngineResult::Empty(*state),
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Response channel disconnected");
                AnalysisEngineResult::Error("Response channel disconnected".to_string())
            }
        }
    }

    /// Queues a submission and returns its id.
    pub fn schedule_analysis(&self, request: AnalysisRequest) -> Option<u32> {
        let tx = self.req_tx.as_ref()?;
        let id = {
            let mut counter = self.id_counter.lock().unwrap();
            let id = *counter;
            *counter = counter.wrapping_add(1);
            id
        };
        // flag the engine busy before the worker picks the request up
        *self.state.lock().unwrap() = AnalysisEngineState::Processing;
        tx.send(AnalysisEngineRequest { id, request }).ok()?;
        Some(id)
    }

    /// Closes the request channel and waits for the worker to drain.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InferenceRequest, InferenceResponse};
    use crate::record::WoundType;

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    struct CannedModel(&'static str);

    impl InferenceModel for CannedModel {
        type Error = Never;

        fn run(&mut self, _request: InferenceRequest<'_>) -> Result<InferenceResponse, Never> {
            Ok(InferenceResponse {
                text: self.0.to_string(),
            })
        }
    }

    /// Answers only after the test releases it.
    struct GatedModel(mpsc::Receiver<()>);

    impl InferenceModel for GatedModel {
        type Error = Never;

        fn run(&mut self, _request: InferenceRequest<'_>) -> Result<InferenceResponse, Never> {
            let _ = self.0.recv();
            Ok(InferenceResponse {
                text: r#"{"type":"Cut"}"#.to_string(),
            })
        }
    }

    fn request(age: Option<u32>) -> AnalysisRequest {
        AnalysisRequest {
            image: ImagePayload::new(vec![1, 2, 3], "image/png").unwrap(),
            age,
        }
    }

    fn wait_for(engine: &AnalysisEngine) -> AnalysisEngineResponse {
        for _ in 0..500 {
            if let AnalysisEngineResult::Success(response) = engine.try_poll_response() {
                return response;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("engine did not respond");
    }

    #[test]
    fn runs_analysis_and_returns_request() {
        let model = CannedModel(r#"{"type":"Burn","severity":12}"#);
        let engine = AnalysisEngine::new(Analyzer::new(model));
        assert_eq!(engine.state(), AnalysisEngineState::Idle);

        let id = engine.schedule_analysis(request(Some(40))).unwrap();
        let response = wait_for(&engine);
        assert_eq!(response.id, id);
        assert_eq!(response.request.age, Some(40));
        let core = response.outcome.unwrap();
        assert_eq!(core.wound_type, WoundType::Burn);
        assert_eq!(core.severity, 12);
    }

    #[test]
    fn failures_do_not_stop_the_worker() {
        let engine = AnalysisEngine::new(Analyzer::new(CannedModel("no json here")));

        engine.schedule_analysis(request(None)).unwrap();
        assert!(matches!(wait_for(&engine).outcome, Err(AnalysisError::NoJsonFound)));

        let second = engine.schedule_analysis(request(None)).unwrap();
        let response = wait_for(&engine);
        assert_eq!(response.id, second);
        assert!(response.outcome.is_err());
    }

    #[test]
    fn engine_is_idle_once_the_response_is_visible() {
        let (gate, gate_rx) = mpsc::channel();
        let engine = AnalysisEngine::new(Analyzer::new(GatedModel(gate_rx)));

        engine.schedule_analysis(request(None)).unwrap();
        assert!(matches!(
            engine.try_poll_response(),
            AnalysisEngineResult::Empty(AnalysisEngineState::Processing)
        ));
        gate.send(()).unwrap();
        wait_for(&engine);
        assert_eq!(engine.state(), AnalysisEngineState::Idle);

        // a submission right after reading the result stays busy until answered
        engine.schedule_analysis(request(None)).unwrap();
        for _ in 0..20 {
            assert!(matches!(
                engine.try_poll_response(),
                AnalysisEngineResult::Empty(AnalysisEngineState::Processing)
            ));
            std::thread::sleep(Duration::from_millis(5));
        }
        gate.send(()).unwrap();
        assert!(wait_for(&engine).outcome.is_ok());
        assert!(matches!(
            engine.try_poll_response(),
            AnalysisEngineResult::Empty(AnalysisEngineState::Idle)
        ));
    }

    #[test]
    fn poll_without_request_is_empty() {
        let engine = AnalysisEngine::new(Analyzer::new(CannedModel("{}")));
        assert!(matches!(
            engine.try_poll_response(),
            AnalysisEngineResult::Empty(AnalysisEngineState::Idle)
        ));
    }
}
