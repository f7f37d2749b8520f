//! Actor config catalog loader.

use std::collections::BTreeSet;
use std::path::Path;

use sim_core::{ActorConfig, ConfigLibrary};

use crate::loaders::{LoadResult, read_file};

/// Loader for actor config catalogs from RON files.
pub struct ActorLoader;

impl ActorLoader {
    /// Load an actor catalog from a RON file.
    ///
    /// RON format: `Vec<(String, ActorConfig)>`. The name is the library key
    /// used by spawn actions and placed actors.
    pub fn load(path: &Path) -> LoadResult<ConfigLibrary> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ConfigLibrary> {
        let raw_data: Vec<(String, ActorConfig)> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse actor catalog RON: {}", e))?;

        let mut seen = BTreeSet::new();
        let mut library = ConfigLibrary::new();
        for (name, config) in raw_data {
            if name.is_empty() {
                anyhow::bail!("Actor config with an empty name");
            }
            if !seen.insert(name.clone()) {
                anyhow::bail!("Duplicate actor config '{}'", name);
            }
            library.insert(name, config);
        }

        tracing::debug!(target: "content::actors", count = seen.len(), "Actor catalog loaded");
        Ok(library)
    }
}
