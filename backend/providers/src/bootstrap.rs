//! Credential bootstrap.
//!
//! Resolves a working API key before any chat surface starts: the configured
//! key is tried first, then the prompter is asked until it supplies a key the
//! catalog accepts or gives up.

use async_trait::async_trait;
use tracing::{info, warn};

use qchat_core::{ChatError, Credential, Model, ModelCatalog};

pub const INVALID_KEY_MESSAGE: &str = "Invalid API Key. Please check your key and try again.";

/// Asks the user for an API key.
#[async_trait]
pub trait KeyPrompter: Send + Sync {
    /// `None` or an empty answer means the user declined.
    async fn request_key(&self) -> Option<String>;

    async fn report_invalid(&self, message: &str);
}

/// A validated credential plus the catalog fetched with it.
#[derive(Debug)]
pub struct BootstrapOutcome {
    pub credential: Credential,
    pub models: Vec<Model>,
}

pub async fn bootstrap(
    catalog: &dyn ModelCatalog,
    prompter: &dyn KeyPrompter,
    initial_key: Option<Credential>,
) -> Result<BootstrapOutcome, ChatError> {
    let mut candidate = initial_key.filter(|c| !c.is_empty());

    loop {
        let credential = match candidate.take() {
            Some(credential) => credential,
            None => {
                let answer = prompter.request_key().await.unwrap_or_default();
                let answer = answer.trim();
                if answer.is_empty() {
                    warn!("No API key provided");
                    return Err(ChatError::CredentialRequired);
                }
                Credential::new(answer)
            }
        };

        if catalog.validate_credential(&credential).await {
            let models = catalog.list_models(&credential).await;
            if models.is_empty() {
                warn!("Model catalog is empty");
            }
            info!(models = models.len(), "API key accepted");
            return Ok(BootstrapOutcome { credential, models });
        }

        warn!("API key rejected");
        prompter.report_invalid(INVALID_KEY_MESSAGE).await;
    }
}
