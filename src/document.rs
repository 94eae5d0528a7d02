//! Server-side CRDT replicas for code-editor rooms.
//!
//! Each code-editor room mirrors the updates it relays into a local yrs
//! document, so the current file content can be read back for saves without
//! asking any client. Replicas are created lazily on the first inbound
//! message and destroyed together with their room.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;
use yrs::updates::decoder::Decode;
use yrs::{GetString, ReadTxn, StateVector, Transact};

/// Name of the Y.Text root the editor clients write into.
const TEXT_ROOT_NAME: &str = "monaco-content";

struct DocumentReplica {
    doc: yrs::Doc,
    /// Most recent encoded document state, refreshed after every applied
    /// update.
    state: Vec<u8>,
}

impl DocumentReplica {
    fn new() -> Self {
        let doc = yrs::Doc::new();
        doc.get_or_insert_text(TEXT_ROOT_NAME);
        Self {
            doc,
            state: Vec::new(),
        }
    }
}

/// Snapshot of a replica's bookkeeping, for status and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub exists: bool,
    pub content_length: usize,
    pub state_size: usize,
}

/// Owner of all CRDT replicas, keyed by room id.
///
/// This registry is the only component that creates or drops yrs handles.
pub struct DocumentRegistry {
    documents: RwLock<HashMap<String, DocumentReplica>>,
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Create the replica for a room if it does not exist yet. Idempotent.
    pub async fn ensure(&self, room_id: &str) {
        let mut documents = self.documents.write().await;
        documents
            .entry(room_id.to_string())
            .or_insert_with(DocumentReplica::new);
    }

    /// Apply an incoming update to the room's replica, creating it on first
    /// use.
    ///
    /// Never fails from the caller's point of view: awareness frames and
    /// other non-update traffic share the wire with sync updates, so bytes
    /// that don't decode as an update are skipped with a debug log. On a
    /// successful apply the stored state snapshot is refreshed.
    pub async fn apply_update(&self, room_id: &str, update: &[u8]) {
        let mut documents = self.documents.write().await;
        let replica = documents
            .entry(room_id.to_string())
            .or_insert_with(DocumentReplica::new);

        let decoded = match yrs::Update::decode_v1(update) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(room_id, "skipping non-update frame: {}", e);
                return;
            }
        };

        let mut txn = replica.doc.transact_mut();
        txn.apply_update(decoded);
        replica.state = txn.encode_state_as_update_v1(&StateVector::default());
    }

    /// Current text content of the room's document, or the empty string if
    /// the room has no replica.
    pub async fn read_text(&self, room_id: &str) -> String {
        let documents = self.documents.read().await;
        match documents.get(room_id) {
            Some(replica) => {
                let text = replica.doc.get_or_insert_text(TEXT_ROOT_NAME);
                let txn = replica.doc.transact();
                text.get_string(&txn)
            }
            None => String::new(),
        }
    }

    pub async fn info(&self, room_id: &str) -> DocumentInfo {
        let documents = self.documents.read().await;
        match documents.get(room_id) {
            Some(replica) => {
                let text = replica.doc.get_or_insert_text(TEXT_ROOT_NAME);
                let txn = replica.doc.transact();
                DocumentInfo {
                    exists: true,
                    content_length: text.get_string(&txn).len(),
                    state_size: replica.state.len(),
                }
            }
            None => DocumentInfo {
                exists: false,
                content_length: 0,
                state_size: 0,
            },
        }
    }

    /// Drop the room's replica and forget its snapshot. Idempotent.
    pub async fn destroy(&self, room_id: &str) {
        let mut documents = self.documents.write().await;
        if documents.remove(room_id).is_some() {
            debug!(room_id, "destroyed document replica");
        }
    }

    /// Drop every replica. Used by force cleanup and shutdown.
    pub async fn destroy_all(&self) {
        let mut documents = self.documents.write().await;
        let count = documents.len();
        documents.clear();
        if count > 0 {
            debug!(count, "destroyed all document replicas");
        }
    }

    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Total bytes held in state snapshots across all replicas.
    pub async fn snapshot_bytes(&self) -> usize {
        let documents = self.documents.read().await;
        documents.values().map(|r| r.state.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yrs::Text;

    /// Encode an update that appends `content` to an empty document.
    fn text_update(content: &str) -> Vec<u8> {
        let doc = yrs::Doc::new();
        let text = doc.get_or_insert_text(TEXT_ROOT_NAME);
        let mut txn = doc.transact_mut();
        text.push(&mut txn, content);
        txn.encode_update_v1()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let registry = DocumentRegistry::new();
        registry.ensure("repo-1-a.ts").await;
        registry.ensure("repo-1-a.ts").await;
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_apply_update_and_read_text() {
        let registry = DocumentRegistry::new();
        registry.apply_update("repo-1-a.ts", &text_update("hello")).await;

        assert_eq!(registry.read_text("repo-1-a.ts").await, "hello");
        let info = registry.info("repo-1-a.ts").await;
        assert!(info.exists);
        assert_eq!(info.content_length, 5);
        assert!(info.state_size > 0);
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_a_silent_noop() {
        let registry = DocumentRegistry::new();
        registry.apply_update("repo-1-a.ts", &[0xff, 0x00, 0x13]).await;

        // The replica exists (created lazily) but holds no content.
        let info = registry.info("repo-1-a.ts").await;
        assert!(info.exists);
        assert_eq!(info.content_length, 0);
        assert_eq!(registry.read_text("repo-1-a.ts").await, "");
    }

    #[tokio::test]
    async fn test_read_text_of_unknown_room_is_empty() {
        let registry = DocumentRegistry::new();
        assert_eq!(registry.read_text("repo-9-b.ts").await, "");
        assert!(!registry.info("repo-9-b.ts").await.exists);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let registry = DocumentRegistry::new();
        registry.ensure("repo-1-a.ts").await;
        registry.destroy("repo-1-a.ts").await;
        registry.destroy("repo-1-a.ts").await;
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_destroy_all() {
        let registry = DocumentRegistry::new();
        registry.ensure("repo-1-a.ts").await;
        registry.ensure("repo-2-b.ts").await;
        registry.apply_update("repo-2-b.ts", &text_update("x")).await;
        assert!(registry.snapshot_bytes().await > 0);

        registry.destroy_all().await;
        assert_eq!(registry.count().await, 0);
        assert_eq!(registry.snapshot_bytes().await, 0);
    }
}
