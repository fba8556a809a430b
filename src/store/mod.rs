//! Persistent local cart store.
//!
//! A single durable slot holding the last-known cart snapshot. It exists
//! purely to avoid an empty-cart flash on startup: the engine hydrates from
//! it synchronously, then reconciles against the server. It is written on
//! every cart change and never read again after hydration.
//!
//! Both operations are infallible from the caller's perspective: a missing
//! or corrupt snapshot loads as an empty cart, and a failed write is logged
//! and swallowed (the in-memory cart stays correct either way).

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::CartLine;

/// Current snapshot schema version. Snapshots with any other version load
/// as empty rather than guessing at a migration.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedCart {
    version: u32,
    lines: Vec<CartLine>,
}

pub trait CartStore: Send + Sync + 'static {
    /// Reads the persisted snapshot. Never fails: absence or corruption
    /// yields an empty cart.
    fn load(&self) -> Vec<CartLine>;

    /// Writes the snapshot. Failures are logged and swallowed.
    fn save(&self, lines: &[CartLine]);
}

fn decode(raw: &str) -> Vec<CartLine> {
    match serde_json::from_str::<PersistedCart>(raw) {
        Ok(persisted) if persisted.version == SNAPSHOT_VERSION => persisted.lines,
        Ok(persisted) => {
            warn!(version = persisted.version, "persisted cart has unknown schema version, starting empty");
            Vec::new()
        }
        Err(error) => {
            warn!(%error, "persisted cart is corrupt, starting empty");
            Vec::new()
        }
    }
}

fn encode(lines: &[CartLine]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PersistedCart {
        version: SNAPSHOT_VERSION,
        lines: lines.to_vec(),
    })
}

/// File-backed store: one JSON record at a fixed path.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStore for JsonFileStore {
    fn load(&self) -> Vec<CartLine> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw),
            Err(error) => {
                debug!(%error, path = %self.path.display(), "no persisted cart");
                Vec::new()
            }
        }
    }

    fn save(&self, lines: &[CartLine]) {
        let json = match encode(lines) {
            Ok(json) => json,
            Err(error) => {
                warn!(%error, "failed to serialize cart snapshot");
                return;
            }
        };
        if let Err(error) = std::fs::write(&self.path, json) {
            warn!(%error, path = %self.path.display(), "failed to persist cart snapshot");
        }
    }
}

/// In-memory store holding the serialized record, so tests exercise the
/// same encode/decode path as the file store.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the slot with raw bytes, e.g. a corrupt record.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// Seeds the slot with a valid snapshot.
    pub fn with_lines(lines: &[CartLine]) -> Self {
        let store = Self::new();
        store.save(lines);
        store
    }
}

impl CartStore for MemoryStore {
    fn load(&self) -> Vec<CartLine> {
        match self.slot.lock().unwrap().as_deref() {
            Some(raw) => decode(raw),
            None => Vec::new(),
        }
    }

    fn save(&self, lines: &[CartLine]) {
        match encode(lines) {
            Ok(json) => *self.slot.lock().unwrap() = Some(json),
            Err(error) => warn!(%error, "failed to serialize cart snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductSnapshot;

    fn line(product_id: &str, quantity: u32, price: f64) -> CartLine {
        CartLine {
            id: format!("line-{product_id}"),
            product_id: product_id.to_string(),
            quantity,
            product: ProductSnapshot {
                id: product_id.to_string(),
                name: format!("Product {product_id}"),
                price,
                category: "test".to_string(),
                description: None,
                images: Vec::new(),
            },
        }
    }

    #[test]
    fn memory_round_trip_preserves_snapshot() {
        let store = MemoryStore::new();
        let lines = vec![line("p1", 2, 10.0), line("p2", 1, 99.5)];
        store.save(&lines);
        assert_eq!(store.load(), lines);
    }

    #[test]
    fn corrupt_record_loads_empty() {
        let store = MemoryStore::with_raw("{not valid json");
        assert!(store.load().is_empty());
    }

    #[test]
    fn unknown_version_loads_empty() {
        let store = MemoryStore::with_raw(r#"{"version": 99, "lines": []}"#);
        assert!(store.load().is_empty());
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = JsonFileStore::new("/nonexistent/dir/cart.json");
        assert!(store.load().is_empty());
    }

    #[test]
    fn file_round_trip_preserves_snapshot() {
        let path = std::env::temp_dir().join(format!("cart-store-test-{}.json", std::process::id()));
        let store = JsonFileStore::new(&path);
        let lines = vec![line("p1", 3, 42.0)];
        store.save(&lines);
        assert_eq!(store.load(), lines);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_save_failure_is_swallowed() {
        let store = JsonFileStore::new("/nonexistent/dir/cart.json");
        // Must not panic or error out.
        store.save(&[line("p1", 1, 1.0)]);
    }
}
