//! Client for the Gemini `generateContent` endpoint.

use crate::config::{API_KEY_VAR, Config};
use crate::error::ConfigError;
use crate::model::{InferenceModel, InferenceRequest, InferenceResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

pub struct GeminiModel {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiModel {
    /// Builds the client. Must not be called from inside an async runtime.
    pub fn new(config: &Config) -> Result<Self, GeminiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

impl InferenceModel for GeminiModel {
    type Error = GeminiError;

    fn check_configured(&self) -> Result<(), ConfigError> {
        match &self.api_key {
            Some(_) => Ok(()),
            None => Err(ConfigError::MissingCredential(API_KEY_VAR)),
        }
    }

    fn run(&mut self, request: InferenceRequest<'_>) -> Result<InferenceResponse, Self::Error> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &request.image.mime_type,
                            data: request.image.to_base64(),
                        },
                    },
                ],
            }],
        };

        log::debug!("Sending {} image bytes to {}", request.image.bytes.len(), self.model);
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Status { status, body });
        }

        let reply: GenerateContentResponse = response.json()?;
        Ok(InferenceResponse {
            text: reply.into_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ImagePayload;

    #[test]
    fn request_body_matches_wire_format() {
        let image = ImagePayload::new(vec![1, 2, 3], "image/png").unwrap();
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [
                    Part::Text { text: "describe" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
    }

    #[test]
    fn reply_text_joins_first_candidate_parts() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"type\":"},{"text":"\"Cut\"}"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.into_text(), r#"{"type":"Cut"}"#);

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_text(), "");
    }

    #[test]
    fn missing_key_is_reported_before_sending() {
        let config = Config::from_lookup(|_| None).unwrap();
        let model = GeminiModel::new(&config).unwrap();
        assert!(matches!(
            model.check_configured(),
            Err(ConfigError::MissingCredential(_))
        ));
    }
}
