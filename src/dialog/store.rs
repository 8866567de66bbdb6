//! Persisted-state stores for dialog stacks
//!
//! The stack blob is the only shared mutable resource in the system. Every
//! blob carries an optimistic-concurrency version: a save must name the
//! version it loaded, and a mismatch fails with `VersionConflict` so the
//! turn can be re-loaded and retried instead of clobbering newer state.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{StoreError, StoreResult};
use super::stack::DialogStack;
use super::turn::ConversationId;

/// A loaded stack blob with its concurrency token
#[derive(Debug, Clone)]
pub struct PersistedStack {
    /// The deserialized stack
    pub stack: DialogStack,

    /// Version to present on the next save
    pub version: u64,

    /// When the blob was written
    pub saved_at: DateTime<Utc>,
}

/// On-disk / in-store representation of one conversation's state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StackDocument {
    version: u64,
    saved_at: DateTime<Utc>,
    stack: DialogStack,
}

/// Read/write contract for persisted dialog stacks
///
/// A missing conversation loads as `None` and saves with expected
/// version 0.
pub trait ConversationStore {
    /// Load the persisted stack for a conversation, if any
    fn load(&self, conversation: &ConversationId) -> StoreResult<Option<PersistedStack>>;

    /// Save a stack, succeeding only if `expected_version` matches the
    /// version currently on record; returns the new version
    fn save(
        &self,
        conversation: &ConversationId,
        stack: &DialogStack,
        expected_version: u64,
    ) -> StoreResult<u64>;
}

fn decode_document(data: &[u8]) -> StoreResult<PersistedStack> {
    let doc: StackDocument = serde_json::from_slice(data)?;
    Ok(PersistedStack {
        stack: doc.stack,
        version: doc.version,
        saved_at: doc.saved_at,
    })
}

fn encode_document(stack: &DialogStack, version: u64) -> StoreResult<Vec<u8>> {
    let doc = StackDocument {
        version,
        saved_at: Utc::now(),
        stack: stack.clone(),
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

/// In-process store backed by a hash map
///
/// Distinct conversations never contend; the lock is held only for the
/// map access itself, not across load-process-save.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, (u64, Vec<u8>)>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self, conversation: &ConversationId) -> StoreResult<Option<PersistedStack>> {
        let blobs = self.blobs.read();
        match blobs.get(conversation.as_str()) {
            Some((_, data)) => Ok(Some(decode_document(data)?)),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        conversation: &ConversationId,
        stack: &DialogStack,
        expected_version: u64,
    ) -> StoreResult<u64> {
        let mut blobs = self.blobs.write();
        let actual = blobs
            .get(conversation.as_str())
            .map(|(version, _)| *version)
            .unwrap_or(0);
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                conversation: conversation.to_string(),
                expected: expected_version,
                actual,
            });
        }
        let next = actual + 1;
        let data = encode_document(stack, next)?;
        blobs.insert(conversation.to_string(), (next, data));
        Ok(next)
    }
}

/// Filesystem store: one JSON document per conversation
///
/// Writes go through a temp file and rename so a crash never leaves a
/// torn blob. A store-wide mutex holds the version check and the write
/// together, so in-process writers serialize; cross-process writers
/// still need an external lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Injective: every rejected byte (including '%' itself) is
    // percent-encoded, so distinct ids never share a blob file.
    fn blob_path(&self, conversation: &ConversationId) -> PathBuf {
        let mut safe = String::with_capacity(conversation.as_str().len());
        for byte in conversation.as_str().bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                    safe.push(byte as char)
                }
                other => safe.push_str(&format!("%{other:02X}")),
            }
        }
        self.root.join(format!("{safe}.json"))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> StoreResult<()> {
        let temp_path = path.with_extension("tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path)?;

        if let Some(parent) = path.parent() {
            let dir = OpenOptions::new().read(true).open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }
}

impl ConversationStore for FileStore {
    fn load(&self, conversation: &ConversationId) -> StoreResult<Option<PersistedStack>> {
        let path = self.blob_path(conversation);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        Ok(Some(decode_document(&data)?))
    }

    fn save(
        &self,
        conversation: &ConversationId,
        stack: &DialogStack,
        expected_version: u64,
    ) -> StoreResult<u64> {
        let _guard = self.write_lock.lock();
        let actual = self.load(conversation)?.map(|p| p.version).unwrap_or(0);
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                conversation: conversation.to_string(),
                expected: expected_version,
                actual,
            });
        }
        let next = actual + 1;
        let data = encode_document(stack, next)?;
        self.write_atomic(&self.blob_path(conversation), &data)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::stack::Frame;
    use crate::dialog::turn::DialogId;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_stack() -> DialogStack {
        let mut stack = DialogStack::new();
        stack.push(Frame::new(DialogId::from("flow"), &json!({"step": 1})).unwrap());
        stack.push(Frame::waiting(DialogId::from("prompt"), &json!({"attempts": 0})).unwrap());
        stack
    }

    #[test]
    fn memory_store_roundtrips_structurally() {
        let store = MemoryStore::new();
        let id = ConversationId::new("conv-1");
        let stack = sample_stack();

        let v1 = store.save(&id, &stack, 0).unwrap();
        assert_eq!(v1, 1);

        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.stack, stack);
        assert_eq!(loaded.version, 1);

        // save(load(id)) round-trips to an identical blob
        let v2 = store.save(&id, &loaded.stack, loaded.version).unwrap();
        let reloaded = store.load(&id).unwrap().unwrap();
        assert_eq!(reloaded.version, v2);
        assert_eq!(reloaded.stack, stack);
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let id = ConversationId::new("conv-2");
        let stack = sample_stack();

        store.save(&id, &stack, 0).unwrap();

        // Two writers both loaded version 1; only one may win.
        let win = store.save(&id, &stack, 1);
        assert!(win.is_ok());
        let lose = store.save(&id, &stack, 1);
        assert!(matches!(
            lose,
            Err(StoreError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn missing_conversation_loads_as_none() {
        let store = MemoryStore::new();
        assert!(store
            .load(&ConversationId::new("absent"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn distinct_conversation_ids_never_share_a_blob() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let slashed = ConversationId::new("a/b");
        let dashed = ConversationId::new("a-b");
        let stack = sample_stack();

        store.save(&slashed, &stack, 0).unwrap();
        assert!(store.load(&dashed).unwrap().is_none());

        store.save(&dashed, &DialogStack::new(), 0).unwrap();
        let reloaded = store.load(&slashed).unwrap().unwrap();
        assert_eq!(reloaded.stack, stack);
        assert_eq!(reloaded.version, 1);
    }

    #[test]
    fn file_store_roundtrips_and_checks_versions() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let id = ConversationId::new("user@channel/thread");
        let stack = sample_stack();

        let v1 = store.save(&id, &stack, 0).unwrap();
        assert_eq!(v1, 1);

        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.stack, stack);

        let conflict = store.save(&id, &stack, 0);
        assert!(matches!(
            conflict,
            Err(StoreError::VersionConflict { actual: 1, .. })
        ));
    }
}
