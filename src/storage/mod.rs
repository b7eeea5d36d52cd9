//! Code/URL store with write-through JSON snapshot persistence
//!
//! The store owns the in-memory index of short codes and serializes the
//! full index to a snapshot file on every mutation, via a temp file and
//! atomic rename. A crash in the middle of the rename window can still
//! lose the last write; that limitation is accepted, the store never
//! tries to be more durable than a single JSON file.
//!
//! Persistence failures are logged and the store keeps serving from
//! memory; they never fail the operation that triggered the write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngExt;
use tracing::{debug, error, info, warn};

mod models;
pub use models::{SerializableUrlMapping, UrlMapping};

use crate::errors::{Result, ShortpushError};

pub const CODE_LENGTH: usize = 10;
pub const CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub const URL_LIFETIME_DAYS: i64 = 30;

/// Defensive cap on collision regeneration. Unreachable with a 62^10
/// code space unless the index is adversarially saturated.
const MAX_GENERATE_ATTEMPTS: usize = 10_000;

/// Result of a successful shorten call.
#[derive(Debug, Clone)]
pub struct ShortenedUrl {
    pub code: String,
    pub shortened_url: String,
}

pub struct UrlStore {
    snapshot_path: PathBuf,
    index: RwLock<HashMap<String, UrlMapping>>,
}

impl UrlStore {
    /// Opens the store, loading the snapshot file if present. Entries
    /// already expired at load time are dropped and never re-inserted.
    /// A missing or malformed snapshot yields an empty store, never an
    /// error.
    pub fn open<P: Into<PathBuf>>(snapshot_path: P) -> Self {
        let snapshot_path = snapshot_path.into();
        let index = match Self::load_snapshot(&snapshot_path) {
            Ok(index) => {
                info!("Loaded {} URL mappings from snapshot", index.len());
                index
            }
            Err(e) => {
                error!("Failed to load URL snapshot, starting empty: {}", e);
                HashMap::new()
            }
        };

        UrlStore {
            snapshot_path,
            index: RwLock::new(index),
        }
    }

    /// Generates a short code and records the mapping, expiring 30 days
    /// out. The index is persisted before this returns, so a push issued
    /// afterwards never races a not-yet-durable mapping.
    pub fn shorten(&self, original_url: &str, base_url: &str) -> Result<ShortenedUrl> {
        let now = Utc::now();
        let mut index = self.index.write();

        let code = Self::generate_code(&index)?;
        let mapping = UrlMapping {
            code: code.clone(),
            original_url: original_url.to_string(),
            created_at: now,
            expires_at: now + Duration::days(URL_LIFETIME_DAYS),
            acknowledged: false,
        };
        index.insert(code.clone(), mapping);
        self.persist(&index);

        let shortened_url = format!("{}/{}", base_url, code);
        info!("Created shortened URL: {} for {}", shortened_url, original_url);
        Ok(ShortenedUrl {
            code,
            shortened_url,
        })
    }

    /// Returns the original URL for a live code. An expired mapping is
    /// deleted (and the snapshot rewritten) on the first lookup past its
    /// expiry, then the code is simply absent.
    pub fn lookup(&self, code: &str) -> Option<String> {
        let now = Utc::now();
        {
            let index = self.index.read();
            match index.get(code) {
                Some(mapping) if !mapping.is_expired_at(now) => {
                    return Some(mapping.original_url.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: remove under the write lock, re-checking in case a
        // concurrent lookup got here first.
        let mut index = self.index.write();
        if index
            .get(code)
            .is_some_and(|mapping| mapping.is_expired_at(now))
        {
            info!("URL with short code {} has expired", code);
            index.remove(code);
            self.persist(&index);
        }
        None
    }

    /// Marks a mapping as acknowledged by its client. Returns false for
    /// an unknown code. Acknowledging twice is harmless; the second call
    /// still returns true without another snapshot write.
    pub fn acknowledge(&self, code: &str) -> bool {
        let mut index = self.index.write();
        match index.get_mut(code) {
            Some(mapping) => {
                if !mapping.acknowledged {
                    mapping.acknowledged = true;
                    self.persist(&index);
                    info!("Shortened URL {} acknowledged by client", code);
                }
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the mapping, expired or not. Used by the retry
    /// engine to consult acknowledgment state.
    pub fn get(&self, code: &str) -> Option<UrlMapping> {
        self.index.read().get(code).cloned()
    }

    /// Inserts a fully-formed mapping, replacing any existing entry for
    /// the same code, and persists.
    pub fn insert(&self, mapping: UrlMapping) {
        let mut index = self.index.write();
        index.insert(mapping.code.clone(), mapping);
        self.persist(&index);
    }

    /// Deletes every expired mapping, persisting once if anything was
    /// removed. Returns the number of mappings removed. Invoked by an
    /// external scheduler; the store does not schedule itself.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut index = self.index.write();
        let before = index.len();
        index.retain(|_, mapping| !mapping.is_expired_at(now));
        let removed = before - index.len();

        if removed > 0 {
            info!("Cleaned up {} expired URLs", removed);
            self.persist(&index);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    fn generate_code(index: &HashMap<String, UrlMapping>) -> Result<String> {
        let mut rng = rand::rng();

        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !index.contains_key(&code) {
                return Ok(code);
            }
        }

        Err(ShortpushError::code_generation(
            "could not find a free short code, index saturated",
        ))
    }

    /// Writes the snapshot, logging instead of propagating failures so
    /// the store keeps serving from memory when durability is broken.
    fn persist(&self, index: &HashMap<String, UrlMapping>) {
        if let Err(e) = self.save_snapshot(index) {
            error!("Failed to save URL mappings to disk: {}", e);
        } else {
            debug!("URL mappings saved to disk");
        }
    }

    fn save_snapshot(&self, index: &HashMap<String, UrlMapping>) -> Result<()> {
        if let Some(dir) = self.snapshot_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                info!("Created data directory at {}", dir.display());
            }
        }

        let mappings: Vec<SerializableUrlMapping> =
            index.values().map(SerializableUrlMapping::from).collect();
        let json = serde_json::to_string_pretty(&mappings)?;

        // Write-then-rename keeps a torn write from clobbering the
        // previous snapshot.
        let tmp_path = self.snapshot_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.snapshot_path)?;
        Ok(())
    }

    fn load_snapshot(path: &Path) -> Result<HashMap<String, UrlMapping>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No URL mappings file found, starting with empty mappings");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mappings: Vec<SerializableUrlMapping> = serde_json::from_str(&content)?;
        let now = Utc::now();
        let mut index = HashMap::new();

        for record in mappings {
            let mapping = Self::revive(record, now);
            if mapping.is_expired_at(now) {
                info!("Skipping expired URL: {}", mapping.code);
                continue;
            }
            index.insert(mapping.code.clone(), mapping);
        }

        Ok(index)
    }

    /// Rebuilds a mapping from its snapshot record, tolerating bad
    /// timestamps rather than dropping the whole snapshot.
    fn revive(record: SerializableUrlMapping, now: DateTime<Utc>) -> UrlMapping {
        let created_at = DateTime::parse_from_rfc3339(&record.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                warn!("Bad createdAt for {}: {}", record.short_code, e);
                now
            });
        let expires_at = match &record.expires_at {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|e| {
                    warn!("Bad expiresAt for {}: {}", record.short_code, e);
                    created_at + Duration::days(URL_LIFETIME_DAYS)
                }),
            // Legacy records carry no expiry; give them the full
            // lifetime from their creation time.
            None => created_at + Duration::days(URL_LIFETIME_DAYS),
        };

        UrlMapping {
            code: record.short_code,
            original_url: record.original_url,
            created_at,
            expires_at,
            acknowledged: record.acknowledged,
        }
    }
}
