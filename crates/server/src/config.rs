//! Server configuration read from the process environment.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Settings needed to host one scene.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub content_dir: PathBuf,
    pub scene: String,
    /// Overrides the platform log directory.
    pub log_dir: Option<PathBuf>,
    /// Names the per-run log directory; generated from the start time when unset.
    pub session_id: Option<String>,
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../sim/content/data")),
            scene: "courtyard".to_owned(),
            log_dir: None,
            session_id: None,
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SIM_CONTENT_DIR` - Content data directory (default: bundled content)
    /// - `SIM_SCENE` - Scene to host (default: courtyard)
    /// - `SIM_LOG_DIR` - Log directory (default: platform-specific)
    /// - `SIM_SESSION_ID` - Log session identifier (default: auto-generated)
    /// - `SIM_TICK_MS` - Tick interval in milliseconds (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("SIM_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(scene) = lookup("SIM_SCENE").filter(|scene| !scene.is_empty()) {
            config.scene = scene;
        }
        config.log_dir = lookup("SIM_LOG_DIR").map(PathBuf::from);
        config.session_id = lookup("SIM_SESSION_ID");

        if let Some(millis) = lookup("SIM_TICK_MS").and_then(|value| value.parse::<u64>().ok()) {
            config.tick_interval = Duration::from_millis(millis.max(1));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.scene, "courtyard");
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert!(config.log_dir.is_none());
        assert!(config.content_dir.ends_with("data"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SIM_CONTENT_DIR", "/srv/content"),
            ("SIM_SCENE", "cellar"),
            ("SIM_LOG_DIR", "/var/log/sim"),
            ("SIM_SESSION_ID", "night"),
            ("SIM_TICK_MS", "0"),
        ]));
        assert_eq!(config.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.scene, "cellar");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/sim")));
        assert_eq!(config.session_id.as_deref(), Some("night"));
        assert_eq!(config.tick_interval, Duration::from_millis(1));
    }

    #[test]
    fn unparsable_tick_keeps_default() {
        let config = ServerConfig::from_lookup(lookup(&[("SIM_TICK_MS", "fast")]));
        assert_eq!(config.tick_interval, Duration::from_millis(100));
    }
}
