use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use woundlens::AnalysisResult;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    pub image_path: PathBuf,
    /// Free-form age field; non-numeric values are treated as absent.
    #[serde(default)]
    pub age: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub id: u32,
    pub duration: Duration,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub path: PathBuf,
}
