//! Request handling for the UI boundary

use std::sync::Arc;

use keystore::{CredentialStore, OPENAI_API_KEY};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{UiEvent, UiRequest};
use crate::config::{Config, LlmConfig};
use crate::llm::{LlmClient, LlmError, create_client};
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::prompts::PromptLoader;
use crate::surface::HostSurface;

/// Builds an LLM client from config and an API key
pub type ClientFactory = Box<dyn Fn(&LlmConfig, &str) -> Result<Arc<dyn LlmClient>, LlmError> + Send + Sync>;

/// One UI connection: a credential store plus the means to run the pipeline
pub struct Session {
    config: Config,
    store: Box<dyn CredentialStore>,
    factory: ClientFactory,
}

impl Session {
    pub fn new(config: Config, store: Box<dyn CredentialStore>) -> Self {
        debug!("Session::new: called");
        Self {
            config,
            store,
            factory: Box::new(create_client),
        }
    }

    /// Replace how LLM clients are constructed
    pub fn with_client_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&LlmConfig, &str) -> Result<Arc<dyn LlmClient>, LlmError> + Send + Sync + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    /// Handle one request, sending its events to `events`
    pub async fn handle<S: HostSurface>(
        &mut self,
        request: UiRequest,
        surface: &mut S,
        events: &mpsc::Sender<UiEvent>,
    ) -> Option<PipelineOutcome> {
        match request {
            UiRequest::VerifyApiKey { key } => {
                let event = self.verify_api_key(&key);
                if events.send(event).await.is_err() {
                    debug!("handle: event receiver closed");
                }
                None
            }
            UiRequest::StartGeneration { plan_text } => self.start_generation(&plan_text, surface, events).await,
        }
    }

    /// Validate the key format and store it
    ///
    /// Only the format is checked; no request is made to the service.
    pub fn verify_api_key(&mut self, key: &str) -> UiEvent {
        debug!(len = key.len(), "verify_api_key: called");
        match self.store.set(OPENAI_API_KEY, key) {
            Ok(()) => {
                info!("API key verified and stored");
                UiEvent::VerifySuccess
            }
            Err(e) if e.is_format_error() => {
                info!("API key rejected: bad format");
                UiEvent::VerifyFail
            }
            Err(e) => {
                warn!(error = %e, "Failed to store API key");
                UiEvent::VerifyFail
            }
        }
    }

    /// Run the pipeline for a plan
    ///
    /// Every path ends with exactly one `success` or `error` status.
    pub async fn start_generation<S: HostSurface>(
        &self,
        plan_text: &str,
        surface: &mut S,
        events: &mpsc::Sender<UiEvent>,
    ) -> Option<PipelineOutcome> {
        debug!(len = plan_text.len(), "start_generation: called");
        let Some(api_key) = self.api_key() else {
            warn!("Generation requested without an API key");
            send(events, UiEvent::error("API key is not set. Verify an API key first.")).await;
            return None;
        };

        let llm = match (self.factory)(&self.config.llm, &api_key) {
            Ok(llm) => llm,
            Err(e) => {
                warn!(error = %e, "Failed to create LLM client");
                send(events, UiEvent::error(format!("Could not create model client: {}", e))).await;
                return None;
            }
        };

        let prompts = PromptLoader::new(self.config.prompts.dir.as_deref());
        let pipeline = Pipeline::new(llm, &self.config, prompts);
        pipeline.run(plan_text, surface, events).await.ok()
    }

    /// Stored key, else the configured environment variable
    fn api_key(&self) -> Option<String> {
        match self.store.get(OPENAI_API_KEY) {
            Ok(Some(key)) => return Some(key),
            Ok(None) => debug!("api_key: nothing stored"),
            Err(e) => warn!(error = %e, "Failed to read credential store"),
        }
        std::env::var(&self.config.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

async fn send(events: &mpsc::Sender<UiEvent>, event: UiEvent) {
    if events.send(event).await.is_err() {
        debug!("send: event receiver closed");
    }
}
