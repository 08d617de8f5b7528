use crate::error::ConfigError;
use crate::payload::ImagePayload;

/// A single multimodal request: instruction text plus one inline image.
pub struct InferenceRequest<'a> {
    pub prompt: String,
    pub image: &'a ImagePayload,
}

/// Free-form text returned by the model. Untrusted.
pub struct InferenceResponse {
    pub text: String,
}

/// Trait for multimodal models that can assess a wound image.
///
/// Implementors perform exactly one attempt per call; retries are left to the user.
pub trait InferenceModel {
    /// The error type that can be returned during inference.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Checked before any request is sent. Defaults to always ready.
    fn check_configured(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Runs inference on the given request and returns the raw reply.
    fn run(&mut self, request: InferenceRequest<'_>) -> Result<InferenceResponse, Self::Error>;
}
