use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One live code/URL mapping in the index.
#[derive(Debug, Clone)]
pub struct UrlMapping {
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once the originating client confirmed receipt of the code.
    /// Monotonic: never reverts to false.
    pub acknowledged: bool,
}

impl UrlMapping {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Snapshot form of [`UrlMapping`]. Field names and RFC3339 timestamp
/// strings match the on-disk `urlMappings.json` format. `expiresAt` is
/// optional there; legacy records without it get the default lifetime
/// back at load time.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SerializableUrlMapping {
    pub short_code: String,
    pub original_url: String,
    pub created_at: String,
    pub expires_at: Option<String>,

    #[serde(default)]
    pub acknowledged: bool,
}

impl From<&UrlMapping> for SerializableUrlMapping {
    fn from(mapping: &UrlMapping) -> Self {
        SerializableUrlMapping {
            short_code: mapping.code.clone(),
            original_url: mapping.original_url.clone(),
            created_at: mapping.created_at.to_rfc3339(),
            expires_at: Some(mapping.expires_at.to_rfc3339()),
            acknowledged: mapping.acknowledged,
        }
    }
}
