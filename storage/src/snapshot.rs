use noema_core::error::{ErrorCode, NoemaError};
use noema_core::metrics::LearningMetrics;
use noema_core::model::{KnowledgeEdge, KnowledgeNode};
use crc32fast::Hasher;
use rkyv::ser::{serializers::AllocSerializer, Serializer};
use rkyv::{Archive, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"NOEM";
pub const SNAPSHOT_VERSION: u32 = 1;

const SNAPSHOT_FILE: &str = "graph.snapshot";
/// [magic: 4][version: 4][crc: 4][len: 4]
const HEADER_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization failed")]
    Serialization,
    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),
}

impl NoemaError for SnapshotError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::Internal
    }
}

/// The one persisted record: full node and edge collections plus the
/// bounded metrics history. Saves overwrite the slot wholesale.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct GraphSnapshot {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
    pub learning_history: Vec<LearningMetrics>,
}

/// Single-slot snapshot persistence under a data directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn slot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Overwrite the slot atomically: write a temp file, then rename.
    pub async fn save(&self, snapshot: &GraphSnapshot) -> Result<(), SnapshotError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }

        let mut serializer = AllocSerializer::<4096>::default();
        serializer
            .serialize_value(snapshot)
            .map_err(|_| SnapshotError::Serialization)?;
        let payload = serializer.into_serializer().into_inner();

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
        record.extend_from_slice(&SNAPSHOT_MAGIC);
        record.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);

        let path = self.slot_path();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &record).await?;
        fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    /// Read the slot back. `Ok(None)` when no snapshot was ever written;
    /// any malformed record surfaces as `Corrupt` for the caller to
    /// downgrade to an empty graph.
    pub async fn load(&self) -> Result<Option<GraphSnapshot>, SnapshotError> {
        let path = self.slot_path();
        let record = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if record.len() < HEADER_LEN {
            return Err(SnapshotError::Corrupt("truncated header"));
        }
        if record[0..4] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::Corrupt("bad magic"));
        }

        let version = u32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Corrupt("unsupported version"));
        }

        let crc = u32::from_le_bytes([record[8], record[9], record[10], record[11]]);
        let len = u32::from_le_bytes([record[12], record[13], record[14], record[15]]) as usize;

        // Own allocation so the archive check sees an aligned buffer.
        let payload = record[HEADER_LEN..].to_vec();
        if payload.len() != len {
            return Err(SnapshotError::Corrupt("truncated payload"));
        }

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        if hasher.finalize() != crc {
            return Err(SnapshotError::Corrupt("crc mismatch"));
        }

        let archived = rkyv::check_archived_root::<GraphSnapshot>(&payload)
            .map_err(|_| SnapshotError::Corrupt("invalid archive"))?;
        let snapshot: GraphSnapshot = archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|_| SnapshotError::Corrupt("decode failed"))?;

        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noema_core::model::{NodeKind, NodeMetadata, Relation};
    use tempfile::tempdir;

    fn sample_snapshot() -> GraphSnapshot {
        let node = KnowledgeNode {
            id: 1,
            label: "Vectors link knowledge...".to_string(),
            kind: NodeKind::Concept,
            content: "Vectors link knowledge.".to_string(),
            embedding: Some(vec![1.0, 0.0]),
            connections: vec![2],
            weight: 1.0,
            created_at_ms: 10,
            metadata: NodeMetadata {
                source: Some("notes.md".to_string()),
                confidence: Some(0.8),
                domain: Some("ai".to_string()),
            },
        };
        let edge = KnowledgeEdge {
            id: 1,
            source: 1,
            target: 2,
            relation: Relation::SimilarTo,
            weight: 0.9,
            created_at_ms: 10,
        };
        GraphSnapshot {
            nodes: vec![node],
            edges: vec![edge],
            learning_history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = sample_snapshot();
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn missing_slot_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_prior_slot() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save(&sample_snapshot()).await.unwrap();
        let mut second = sample_snapshot();
        second.nodes[0].weight = 1.4;
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.nodes[0].weight, 1.4);
    }

    #[tokio::test]
    async fn corrupt_payload_is_detected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&sample_snapshot()).await.unwrap();

        let path = store.slot_path();
        let mut bytes = tokio::fs::read(&path).await.unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        tokio::fs::write(&path, &bytes).await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(SnapshotError::Corrupt("crc mismatch"))
        ));
    }

    #[tokio::test]
    async fn truncated_record_is_detected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&sample_snapshot()).await.unwrap();

        let path = store.slot_path();
        let bytes = tokio::fs::read(&path).await.unwrap();
        tokio::fs::write(&path, &bytes[..HEADER_LEN + 4]).await.unwrap();

        assert!(matches!(store.load().await, Err(SnapshotError::Corrupt(_))));
    }

    #[tokio::test]
    async fn wrong_magic_is_detected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&sample_snapshot()).await.unwrap();

        let path = store.slot_path();
        let mut bytes = tokio::fs::read(&path).await.unwrap();
        bytes[0] = b'X';
        tokio::fs::write(&path, &bytes).await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(SnapshotError::Corrupt("bad magic"))
        ));
    }
}
