use serde::{Deserialize, Serialize};

/// Opaque API secret used to authenticate against the chat endpoint.
///
/// The value is never printed: `Debug` shows a redacted marker and there is
/// no `Display` impl. Call [`Credential::expose`] only where the raw key has
/// to leave the process (the request header).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret value for the transport header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A model offered by the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "model")]
    pub id: String,
    #[serde(default)]
    pub description: String,
}

impl Model {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Body of a single streaming chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: String,
    pub stream: bool,
}

impl ChatRequest {
    /// Streaming request for `prompt` against `model`.
    pub fn streaming(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-key");
        let shown = format!("{:?}", credential);
        assert!(!shown.contains("super-secret-key"));
        assert_eq!(credential.expose(), "super-secret-key");
    }

    #[test]
    fn test_credential_blank_is_empty() {
        assert!(Credential::new("   ").is_empty());
        assert!(!Credential::new("k").is_empty());
    }

    #[test]
    fn test_model_wire_format() {
        let models: Vec<Model> = serde_json::from_str(
            r#"[{"model":"gpt-4o","description":"OpenAI flagship"},{"model":"bare"}]"#,
        )
        .unwrap();
        assert_eq!(models[0], Model::new("gpt-4o", "OpenAI flagship"));
        assert_eq!(models[1].description, "");

        let json = serde_json::to_value(&models[0]).unwrap();
        assert_eq!(json["model"], "gpt-4o");
    }

    #[test]
    fn test_chat_request_body() {
        let body = serde_json::to_value(ChatRequest::streaming("hi", "m1")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"prompt": "hi", "model": "m1", "stream": true})
        );
    }
}
