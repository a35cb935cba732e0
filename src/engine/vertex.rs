//! Vertex AI Gemini client.
//!
//! Calls `generateContent` with function declarations and maps the
//! candidate's text and `functionCall` parts back into a [`ModelTurn`].

use super::{
    EngineError, FunctionCall, GenerateRequest, ModelTurn, ReasoningEngine, Turn,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Settings for the Vertex AI client.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// Gemini on Vertex AI.
pub struct VertexEngine {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
}

impl VertexEngine {
    pub fn new(config: &VertexConfig, access_token: String) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))?;

        let endpoint = endpoint_url(&config.project_id, &config.location, &config.model);
        info!("Vertex AI endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            access_token,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Build the JSON body for `generateContent`.
    pub fn build_request_body(&self, request: &GenerateRequest<'_>) -> Value {
        let contents: Vec<Value> = request.turns.iter().map(turn_to_content).collect();

        let mut body = json!({
            "systemInstruction": {
                "parts": [{"text": request.system_instruction}]
            },
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature
            }
        });

        if !request.tools.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": request.tools }]);
        }

        body
    }

    /// Parse a `generateContent` response.
    pub fn parse_response(body: &Value) -> Result<ModelTurn, EngineError> {
        let Some(candidate) = body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            let reason = body
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates in response");
            return Err(EngineError::InvalidResponse(reason.to_string()));
        };

        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array);

        let Some(parts) = parts else {
            let finish_reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(EngineError::InvalidResponse(format!(
                "candidate has no content (finishReason: {})",
                finish_reason
            )));
        };

        let mut turn = ModelTurn::default();
        for part in parts {
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::InvalidResponse("functionCall missing name".to_string())
                    })?;
                turn.function_calls.push(FunctionCall {
                    name: name.to_string(),
                    args: call.get("args").cloned().unwrap_or_else(|| json!({})),
                });
                if turn.signature.is_none() {
                    turn.signature = part
                        .get("thoughtSignature")
                        .and_then(Value::as_str)
                        .map(String::from);
                }
                continue;
            }

            // Thought summaries are not part of the answer.
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }

            if let Some(text) = part.get("text").and_then(Value::as_str) {
                turn.text.push_str(text);
            }
        }

        Ok(turn)
    }
}

#[async_trait]
impl ReasoningEngine for VertexEngine {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelTurn, EngineError> {
        let body = self.build_request_body(&request);
        debug!(
            "Sending generateContent request with {} turns",
            request.turns.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    EngineError::Connect(self.endpoint.clone())
                } else {
                    EngineError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EngineError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(EngineError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Regional endpoint for a publisher model; `global` has no region prefix.
pub fn endpoint_url(project_id: &str, location: &str, model: &str) -> String {
    let host = if location == "global" {
        "aiplatform.googleapis.com".to_string()
    } else {
        format!("{}-aiplatform.googleapis.com", location)
    };
    format!(
        "https://{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        host, project_id, location, model
    )
}

fn turn_to_content(turn: &Turn) -> Value {
    match turn {
        Turn::User(text) => json!({
            "role": "user",
            "parts": [{"text": text}]
        }),
        Turn::Model {
            text,
            calls,
            signature,
        } => {
            let mut parts = Vec::new();
            if !text.is_empty() {
                parts.push(json!({"text": text}));
            }
            for (i, call) in calls.iter().enumerate() {
                let mut part = json!({
                    "functionCall": {"name": call.name, "args": call.args}
                });
                // The signature rides on the first call only.
                if i == 0 {
                    if let Some(signature) = signature {
                        part["thoughtSignature"] = json!(signature);
                    }
                }
                parts.push(part);
            }
            if parts.is_empty() {
                parts.push(json!({"text": ""}));
            }
            json!({"role": "model", "parts": parts})
        }
        Turn::FunctionResponses(responses) => {
            let parts: Vec<Value> = responses
                .iter()
                .map(|r| {
                    json!({
                        "functionResponse": {"name": r.name, "response": r.response}
                    })
                })
                .collect();
            json!({"role": "user", "parts": parts})
        }
    }
}

/// Resolve the OAuth access token for Vertex AI.
///
/// Uses `explicit` when given, otherwise asks the gcloud CLI.
pub async fn resolve_access_token(explicit: Option<&str>) -> Result<String, EngineError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    debug!("No access token configured, asking gcloud");
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| EngineError::Auth(format!("failed to run gcloud: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Auth(format!(
            "gcloud auth print-access-token failed: {}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(EngineError::Auth("gcloud returned an empty token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FunctionDeclaration, FunctionResponse};

    fn engine() -> VertexEngine {
        VertexEngine::new(
            &VertexConfig {
                project_id: "proj".to_string(),
                location: "us-central1".to_string(),
                model: "gemini-2.5-pro".to_string(),
                temperature: 0.2,
                timeout_seconds: 30,
            },
            "token".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("proj", "us-central1", "gemini-2.5-pro"),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/proj/locations/us-central1/publishers/google/models/gemini-2.5-pro:generateContent"
        );
        assert!(endpoint_url("proj", "global", "m").starts_with("https://aiplatform.googleapis.com/"));
    }

    #[test]
    fn test_build_request_body() {
        let turns = vec![
            Turn::User("Review PR #1 in acme/widgets".to_string()),
            Turn::Model {
                text: String::new(),
                calls: vec![FunctionCall {
                    name: "get_pull_request".to_string(),
                    args: json!({"owner": "acme"}),
                }],
                signature: Some("sig".to_string()),
            },
            Turn::FunctionResponses(vec![FunctionResponse {
                name: "get_pull_request".to_string(),
                response: json!({"content": "{}"}),
            }]),
        ];
        let tools = vec![FunctionDeclaration {
            name: "get_pull_request".to_string(),
            description: "d".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let body = engine().build_request_body(&GenerateRequest {
            system_instruction: "You are a QA Engineer",
            turns: &turns,
            tools: &tools,
        });

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a QA Engineer");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "get_pull_request"
        );
        assert_eq!(body["contents"][1]["parts"][0]["thoughtSignature"], "sig");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["name"],
            "get_pull_request"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "get_pull_request"
        );
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"pr_accessed\": "},
                    {"text": "true}"}
                ]},
                "finishReason": "STOP"
            }]
        });

        let turn = VertexEngine::parse_response(&body).unwrap();
        assert_eq!(turn.text, "{\"pr_accessed\": true}");
        assert!(turn.function_calls.is_empty());
    }

    #[test]
    fn test_parse_function_call_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "get_pull_request_files",
                                      "args": {"owner": "acme", "repo": "widgets", "pull_number": 3}},
                     "thoughtSignature": "abc"}
                ]}
            }]
        });

        let turn = VertexEngine::parse_response(&body).unwrap();
        assert_eq!(turn.function_calls.len(), 1);
        assert_eq!(turn.function_calls[0].args["pull_number"], 3);
        assert_eq!(turn.signature.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = VertexEngine::parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_explicit_token_skips_gcloud() {
        let token = tokio_test::block_on(resolve_access_token(Some("  ya29.token \n"))).unwrap();
        assert_eq!(token, "ya29.token");
    }
}
