//! Wound photo assessment over a multimodal inference endpoint.
//!
//! The [`Analyzer`] sends an image and an age-aware prompt to an
//! [`InferenceModel`], then normalizes the untrusted reply into an
//! [`AnalysisCore`]. Completed assessments become [`AnalysisResult`] records
//! kept in a bounded [`HistoryStore`] and can be exported as PDF reports.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod gemini;
pub mod history;
pub mod model;
pub mod normalize;
pub mod payload;
pub mod prompt;
pub mod record;
pub mod report;
pub mod samples;
pub mod state;

pub use analyzer::Analyzer;
pub use config::Config;
pub use engine::{
    AnalysisEngine, AnalysisEngineResponse, AnalysisEngineResult, AnalysisEngineState,
    AnalysisRequest,
};
pub use error::{AnalysisError, ConfigError, HistoryError, PayloadError, ReportError};
pub use gemini::GeminiModel;
pub use history::{HISTORY_CAPACITY, HistoryStore};
pub use model::{InferenceModel, InferenceRequest, InferenceResponse};
pub use payload::ImagePayload;
pub use record::{AgeGroup, AnalysisCore, AnalysisResult, HealingStage, WoundType};
pub use state::{App, AppState, Tab};
