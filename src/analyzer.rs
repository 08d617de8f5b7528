use crate::error::AnalysisError;
use crate::model::{InferenceModel, InferenceRequest};
use crate::normalize::normalize_response;
use crate::payload::ImagePayload;
use crate::prompt::build_prompt;
use crate::record::AnalysisCore;

/// Prompt, one model call, then defensive normalization of the reply.
///
/// The analyzer never touches persistent storage.
pub struct Analyzer<M: InferenceModel> {
    model: M,
}

impl<M: InferenceModel> Analyzer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn analyze(
        &mut self,
        image: &ImagePayload,
        age: Option<u32>,
    ) -> Result<AnalysisCore, AnalysisError> {
        self.model.check_configured()?;

        let request = InferenceRequest {
            prompt: build_prompt(age),
            image,
        };
        let response = self
            .model
            .run(request)
            .map_err(|e| AnalysisError::AnalysisFailed(Box::new(e)))?;

        normalize_response(&response.text).inspect_err(|e| {
            log::warn!("Could not normalize model reply: {e}");
            log::debug!("Raw reply: {}", response.text);
        })
    }
}
