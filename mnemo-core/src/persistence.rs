//! SQLite persistence for memory snapshots.
//!
//! One row per persona holds the encoded [`MemorySnapshot`]:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS memory_snapshots (
//!     persona_id TEXT PRIMARY KEY,
//!     format     TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! The encoding is recorded per row, so a database written with one
//! [`SnapshotFormat`] stays readable after the configured format changes.
//! A stored checksum that does not match the data is treated as corruption.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{MnemoError, Result};
use crate::metrics::spans;
use crate::snapshot::{MemorySnapshot, SnapshotFormat};
use crate::types::PersonaId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_snapshots (
    persona_id TEXT PRIMARY KEY,
    format     TEXT NOT NULL,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as eight lowercase hex digits.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309, reflected polynomial `0xEDB88320`).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database of persona snapshots.
///
/// ```no_run
/// # use mnemo_core::persistence::PersistenceEngine;
/// # use mnemo_core::config::PersistenceConfig;
/// # use mnemo_core::embedding::HashingEmbeddingProvider;
/// # use mnemo_core::{MemoryManager, MnemoConfig, PersonaId};
/// # use std::sync::Arc;
/// let engine = PersistenceEngine::open("personas.db", &PersistenceConfig::default())?;
/// let memory = MemoryManager::new(MnemoConfig::default(), Arc::new(HashingEmbeddingProvider::new(64)));
/// let persona = PersonaId::new();
/// engine.save_snapshot(persona, &memory.snapshot())?;
/// let loaded = engine.load_snapshot(persona)?;
/// # Ok::<(), mnemo_core::MnemoError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) a database at `path`, creating the schema if needed.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags =
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "snapshot store opened");
        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Core CRUD
    // ------------------------------------------------------------------

    /// Save (upsert) a persona's snapshot in the configured format.
    ///
    /// # Errors
    /// Returns [`MnemoError::Serialization`] if encoding fails, or
    /// [`MnemoError::Database`] on SQLite failures.
    pub fn save_snapshot(&self, persona: PersonaId, snapshot: &MemorySnapshot) -> Result<()> {
        let span = tracing::debug_span!(spans::PERSIST_SAVE, persona = %persona);
        let _enter = span.enter();
        let start = Instant::now();

        let format = self.config.format;
        let data = snapshot.encode(format)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&data));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO memory_snapshots (persona_id, format, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(persona_id) DO UPDATE SET
                format = excluded.format,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![persona.0.to_string(), format.as_str(), data, now, checksum],
        )?;

        debug!(
            persona = %persona,
            episodic = snapshot.episodic.items.len(),
            bytes = data.len(),
            format = format.as_str(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "snapshot saved"
        );
        Ok(())
    }

    /// Load a persona's snapshot, or `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns [`MnemoError::CorruptSnapshot`] if the checksum does not match
    /// or the data does not decode, and [`MnemoError::Database`] on SQLite
    /// failures.
    pub fn load_snapshot(&self, persona: PersonaId) -> Result<Option<MemorySnapshot>> {
        let span = tracing::debug_span!(spans::PERSIST_LOAD, persona = %persona);
        let _enter = span.enter();
        let start = Instant::now();

        let mut stmt = self
            .conn
            .prepare_cached("SELECT format, data, checksum FROM memory_snapshots WHERE persona_id = ?1")?;
        let row: Option<(String, Vec<u8>, Option<String>)> = stmt
            .query_row(params![persona.0.to_string()], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .optional()?;

        let Some((format, data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(persona = %persona, %expected, %actual, "snapshot checksum mismatch");
                    return Err(MnemoError::CorruptSnapshot(format!(
                        "checksum mismatch for persona {persona}"
                    )));
                }
            }
        }

        let snapshot = MemorySnapshot::decode(&data, SnapshotFormat::from_name(&format)?)?;
        debug!(
            persona = %persona,
            episodic = snapshot.episodic.items.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    /// Delete a persona's snapshot. Returns `true` if a row was removed.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn delete_snapshot(&self, persona: PersonaId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM memory_snapshots WHERE persona_id = ?1",
            params![persona.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Every persona with a stored snapshot.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn list_personas(&self) -> Result<Vec<PersonaId>> {
        let mut stmt = self.conn.prepare_cached("SELECT persona_id FROM memory_snapshots")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut personas = Vec::new();
        for row in rows {
            let id = row?;
            match uuid::Uuid::parse_str(&id) {
                Ok(uuid) => personas.push(PersonaId(uuid)),
                Err(_) => warn!(id = %id, "skipping row with invalid persona id"),
            }
        }
        Ok(personas)
    }

    /// Number of stored snapshots.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn snapshot_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM memory_snapshots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "database backup completed"
        );
        Ok(())
    }

    /// Write `<db>.bak.1`, shifting older backups up and keeping at most
    /// `backup_count`. No-op for in-memory databases.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] or [`MnemoError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        let max = self.config.backup_count;
        if self.db_path.as_os_str() == ":memory:" || max == 0 {
            return Ok(());
        }

        for i in (1..max).rev() {
            let src = self.backup_path(i);
            if src.exists() {
                std::fs::rename(&src, self.backup_path(i + 1))?;
            }
        }
        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        self.backup(self.backup_path(1))?;

        info!(max_backups = max, "rotating backup created");
        Ok(())
    }

    /// Path of backup number `n` (e.g. `personas.db.bak.1`).
    #[must_use]
    pub fn backup_path(&self, n: u32) -> PathBuf {
        let mut path = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            path.extension().map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        path.set_extension(ext);
        path
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Database file path, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`. Returns `true` if the database is sound.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self.conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Reclaim unused space.
    ///
    /// # Errors
    /// Returns [`MnemoError::Database`] on SQLite failures.
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }
}

/// Adds `.optional()` to `rusqlite::Result`, mapping `QueryReturnedNoRows` to `None`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
