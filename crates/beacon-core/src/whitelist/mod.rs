//! Curated per-chain upstream URL lists.
//!
//! The whitelist is loaded once at startup and never mutated afterwards.
//! Construction filters out anything that is not plain `https://` or that
//! still contains an unresolved `${...}` placeholder from list-generation
//! tooling.

use crate::types::ChainId;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;
use tracing::debug;

/// On-disk whitelist document: `{ "rpcs": { "<chainId>": ["https://...", ...] } }`.
///
/// Chain ids are decimal strings in the JSON source. Unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhitelistData {
    #[serde(default)]
    pub rpcs: BTreeMap<String, Vec<String>>,
}

#[derive(Error, Debug)]
pub enum WhitelistError {
    #[error("failed to read whitelist file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("whitelist file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only mapping from chain id to upstream URLs.
pub struct Whitelist {
    rpcs: BTreeMap<ChainId, Vec<String>>,
}

/// A URL is eligible when it is HTTPS and fully resolved.
fn is_eligible(url: &str) -> bool {
    url.starts_with("https://") && !url.contains("${")
}

impl Whitelist {
    /// Builds a whitelist from a parsed document, applying the URL filter.
    ///
    /// Entries with a non-numeric chain id key are dropped. Chains whose
    /// list filters down to empty are kept as empty (an empty answer from
    /// [`Whitelist::urls_for`] is not an error).
    #[must_use]
    pub fn from_rpc_data(data: WhitelistData) -> Self {
        let mut rpcs = BTreeMap::new();
        for (key, urls) in data.rpcs {
            let Ok(chain_id) = key.parse::<ChainId>() else {
                debug!(key = %key, "skipping whitelist entry with non-numeric chain id");
                continue;
            };
            let kept: Vec<String> = urls.into_iter().filter(|u| is_eligible(u)).collect();
            rpcs.insert(chain_id, kept);
        }
        Self { rpcs }
    }

    /// Builds a whitelist from entries that are already validated.
    ///
    /// No URL filtering is applied; used by hosts that construct their
    /// list programmatically and by test infrastructure that targets
    /// plain-HTTP mock servers.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ChainId, Vec<String>)>,
    {
        Self { rpcs: entries.into_iter().collect() }
    }

    /// Loads and filters the whitelist document at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WhitelistError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| WhitelistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let data: WhitelistData = serde_json::from_str(&raw)?;
        Ok(Self::from_rpc_data(data))
    }

    /// Upstream URLs for a chain, in insertion order. Empty when the
    /// chain is unknown or everything was filtered out.
    #[must_use]
    pub fn urls_for(&self, chain_id: ChainId) -> &[String] {
        self.rpcs.get(&chain_id).map_or(&[], Vec::as_slice)
    }

    /// All chain ids with a whitelist entry, ascending.
    #[must_use]
    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.rpcs.keys().copied().collect()
    }
}
