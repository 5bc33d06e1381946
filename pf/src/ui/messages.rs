//! UI boundary message types
//!
//! JSON objects tagged by `type`. Over the bridge each message is a single
//! line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

/// Messages from the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiRequest {
    /// Validate and store an API key
    VerifyApiKey { key: String },

    /// Run the pipeline over a plan
    StartGeneration {
        #[serde(rename = "planText", alias = "payload")]
        plan_text: String,
    },
}

/// Progress of a generation request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Processing,
    Success,
    Error,
}

/// Messages to the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    VerifySuccess,

    VerifyFail,

    GenerationStatus { message: String, status: GenerationStatus },
}

impl UiEvent {
    pub fn processing(message: impl Into<String>) -> Self {
        UiEvent::GenerationStatus {
            message: message.into(),
            status: GenerationStatus::Processing,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        UiEvent::GenerationStatus {
            message: message.into(),
            status: GenerationStatus::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        UiEvent::GenerationStatus {
            message: message.into(),
            status: GenerationStatus::Error,
        }
    }

    /// Final event of a generation request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UiEvent::GenerationStatus {
                status: GenerationStatus::Success | GenerationStatus::Error,
                ..
            }
        )
    }
}
