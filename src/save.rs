//! Persistence of code-editor documents to the backing API.
//!
//! The relay never saves on its own. External schedulers (a save-point room
//! watcher, an operator hitting the admin route) decide when; this module
//! only knows how: read the replica's text and `PUT` it to the repository
//! file endpoint.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::classify::RoomClass;
use crate::document::DocumentRegistry;

#[derive(Debug, Error)]
pub enum SaveError {
    /// The room id does not name a saveable file.
    #[error("room is not save-eligible: {0}")]
    NotEligible(String),
    /// The API answered with a non-2xx status.
    #[error("save rejected: {status} {status_text}")]
    Http { status: u16, status_text: String },
    /// The request never completed.
    #[error("save request failed: {0}")]
    Network(String),
}

/// Repository file a room id resolves to.
///
/// Save eligibility is stricter than admission: `repo-7` is a valid room
/// but carries no file path, so there is nothing to save it as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub repository_id: u64,
    pub file_path: String,
}

impl SaveTarget {
    pub fn parse(room_id: &str) -> Option<SaveTarget> {
        match RoomClass::parse(room_id) {
            RoomClass::CodeEditor {
                repository_id,
                file_path,
            } if !file_path.is_empty() => Some(SaveTarget {
                repository_id,
                file_path,
            }),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct SaveRequest<'a> {
    #[serde(rename = "filePath")]
    file_path: &'a str,
    content: &'a str,
    source: &'static str,
}

/// Outbound save client. Holds a reqwest client and the API base URL; no
/// room or document lock is ever held across the HTTP call.
pub struct SaveTrigger {
    client: Client,
    api_base_url: String,
}

impl SaveTrigger {
    pub fn new(api_base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Save the current content of a code-editor room's document.
    ///
    /// Reads whatever the replica holds at this moment (the empty string if
    /// no document exists yet) and issues the `PUT`. Failures are surfaced
    /// to the caller and not retried.
    pub async fn save_room(
        &self,
        documents: &DocumentRegistry,
        room_id: &str,
    ) -> Result<(), SaveError> {
        let target =
            SaveTarget::parse(room_id).ok_or_else(|| SaveError::NotEligible(room_id.to_string()))?;
        let content = documents.read_text(room_id).await;

        let url = format!(
            "{}/repositories/{}/files/content",
            self.api_base_url, target.repository_id
        );
        let response = self
            .client
            .put(&url)
            .json(&SaveRequest {
                file_path: &target.file_path,
                content: &content,
                source: "yjs-collaboration",
            })
            .send()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SaveError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        Ok(())
    }
}
