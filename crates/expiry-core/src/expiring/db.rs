//! Persistent storage for expiring actions using redb.
//!
//! # Table design
//!
//! A single `EXPIRING` table keyed by a string composite key:
//! ```text
//! <kind>/<request_id>
//! ```
//!
//! One key per `(kind, request_id)` means a save overwrites any earlier
//! record of the same kind for the same request. Since `/` (0x2f) sorts just
//! below `0` (0x30), the range `"<kind>/".."<kind>0"` yields exactly the
//! records of one kind.
//!
//! A value that no longer decodes can never be processed. Listing a kind logs
//! and removes such entries so the remaining records still get polled;
//! `list_all` only skips them.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::warn;

use crate::error::{ExpiryError, Result};
use crate::ports::ExpiringActionStore;

use super::action::{ActionKind, ExpiringAction};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: `<kind>/<request_id>`
/// Value: JSON-encoded ExpiringAction
const EXPIRING: TableDefinition<&str, &[u8]> = TableDefinition::new("expiring_actions");

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn record_key(kind: ActionKind, request_id: &str) -> String {
    format!("{}/{}", kind.as_str(), request_id)
}

fn kind_range(kind: ActionKind) -> (String, String) {
    (format!("{}/", kind.as_str()), format!("{}0", kind.as_str()))
}

fn store_err(e: impl Display) -> ExpiryError {
    ExpiryError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// ExpiringActionDb
// ---------------------------------------------------------------------------

/// redb-backed `ExpiringActionStore`.
pub struct ExpiringActionDb {
    db: Database,
}

impl ExpiringActionDb {
    /// Open or create the database at `path`, creating the table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(EXPIRING).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    /// Every stored record, sorted by kind then request id.
    pub fn list_all(&self) -> Result<Vec<ExpiringAction>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(EXPIRING).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            match serde_json::from_slice(v.value()) {
                Ok(action) => result.push(action),
                Err(e) => warn!(key = k.value(), error = %e, "skipping undecodable expiring action"),
            }
        }
        Ok(result)
    }
}

impl ExpiringActionStore for ExpiringActionDb {
    fn list_expiring(&self, kind: ActionKind) -> Result<Vec<ExpiringAction>> {
        let (lo, hi) = kind_range(kind);
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(EXPIRING).map_err(store_err)?;

        let mut result = Vec::new();
        let mut undecodable = Vec::new();
        for entry in table.range(lo.as_str()..hi.as_str()).map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            match serde_json::from_slice::<ExpiringAction>(v.value()) {
                Ok(action) => result.push(action),
                Err(e) => {
                    warn!(key = k.value(), error = %e, "discarding undecodable expiring {kind} action");
                    undecodable.push(k.value().to_string());
                }
            }
        }
        drop(table);
        drop(rt);

        if !undecodable.is_empty() {
            let wt = self.db.begin_write().map_err(store_err)?;
            {
                let mut table = wt.open_table(EXPIRING).map_err(store_err)?;
                for key in &undecodable {
                    table.remove(key.as_str()).map_err(store_err)?;
                }
            }
            wt.commit().map_err(store_err)?;
        }
        Ok(result)
    }

    fn delete_expiring(&self, kind: ActionKind, request_id: &str) -> Result<()> {
        let key = record_key(kind, request_id);
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(EXPIRING).map_err(store_err)?;
            table.remove(key.as_str()).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    fn save_expiring(&self, action: &ExpiringAction) -> Result<()> {
        let key = record_key(action.kind(), &action.request_id);
        let value = serde_json::to_vec(action)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(EXPIRING).map_err(store_err)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
