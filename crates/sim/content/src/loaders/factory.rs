//! Content factory for building scenes from data files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sim_core::{
    ConfigLibrary, Scene, SceneConfig, SceneEnv, SessionOracle, SimConfig, SystemClock, TileMap,
};

use crate::loaders::{ActorLoader, ConfigLoader, LoadResult, MapLoader, SceneLoader};

/// Content factory that loads all scene content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── actors.ron
/// ├── scenes/
/// │   └── courtyard.ron
/// └── maps/
///     └── courtyard.ron
/// ```
///
/// `config.toml` and the map files are optional.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load simulation configuration from `config.toml`, or defaults when absent.
    pub fn load_config(&self) -> LoadResult<SimConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            tracing::debug!(target: "content::factory", path = %path.display(), "No config file; using defaults");
            return Ok(SimConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the actor config catalog from `actors.ron`.
    pub fn load_actors(&self) -> LoadResult<ConfigLibrary> {
        let path = self.data_dir.join("actors.ron");
        ActorLoader::load(&path)
    }

    /// Load a scene layout from `scenes/{scene_name}.ron`.
    pub fn load_scene(&self, scene_name: &str) -> LoadResult<SceneConfig> {
        let path = self.data_dir.join("scenes").join(format!("{}.ron", scene_name));
        SceneLoader::load(&path)
    }

    /// Load a tile map from `maps/{map_name}.ron`, if the map has one.
    pub fn load_map(&self, map_name: &str) -> LoadResult<Option<TileMap>> {
        let path = self.data_dir.join("maps").join(format!("{}.ron", map_name));
        if !path.exists() {
            return Ok(None);
        }
        MapLoader::load(&path).map(Some)
    }

    /// Loads everything a scene needs and builds it, not yet started.
    ///
    /// Placed actors must name configs from the catalog.
    pub fn build_scene(
        &self,
        scene_name: &str,
        sessions: Option<Arc<dyn SessionOracle>>,
    ) -> LoadResult<Scene> {
        let config = self.load_config()?;
        let library = self.load_actors()?;
        let scene = self.load_scene(scene_name)?;

        for placed in &scene.actors {
            if library.get(&placed.config).is_none() {
                anyhow::bail!(
                    "Scene '{}' places unknown actor config '{}'",
                    scene.name,
                    placed.config
                );
            }
        }

        let mut env = match self.load_map(scene_name)? {
            Some(map) => SceneEnv::with_map(Arc::new(map)),
            None => SceneEnv::empty().with_clock(Arc::new(SystemClock)),
        };
        if let Some(sessions) = sessions {
            env = env.with_sessions(sessions);
        }

        tracing::info!(
            target: "content::factory",
            scene = %scene.name,
            entries = scene.entries.len(),
            placed = scene.actors.len(),
            "Scene content loaded"
        );
        Ok(Scene::new(config, library, &scene, env))
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sim_core::{EntityKey, Timestamp, Value};
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn bundled() -> ContentFactory {
        ContentFactory::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn builds_a_scene_from_a_data_directory() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "config.toml", "seed = 9\n");
        write(temp_dir.path(), "actors.ron", r#"[("crate", (tags: ["prop"]))]"#);
        write(
            temp_dir.path(),
            "scenes/yard.ron",
            r#"(
                entries: [
                    (
                        name: "gate",
                        handlers: [(kind: Startup, action: SetVariable(name: "open", value: Constant(Bool(true))))],
                    ),
                ],
                actors: [(config: "crate")],
            )"#,
        );

        let factory = ContentFactory::new(temp_dir.path());
        assert!(factory.load_map("yard").unwrap().is_none());

        let mut scene = factory.build_scene("yard", None).unwrap();
        assert_eq!(scene.name(), "yard");
        assert_eq!(scene.config().seed, 9);

        scene.start(Timestamp::ZERO).unwrap();
        let gate = EntityKey::Entry(scene.entry_named("gate").unwrap());
        assert_eq!(scene.logic(gate).unwrap().variable("open"), Value::Bool(true));
        assert_eq!(scene.tagged("prop").len(), 1);
    }

    #[test]
    fn unknown_placed_configs_fail_the_build() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "actors.ron", "[]");
        write(
            temp_dir.path(),
            "scenes/yard.ron",
            r#"(name: "yard", actors: [(config: "ghost")])"#,
        );

        let error = ContentFactory::new(temp_dir.path())
            .build_scene("yard", None)
            .err()
            .unwrap();
        assert!(error.to_string().contains("unknown actor config 'ghost'"));
    }

    #[test]
    fn bundled_courtyard_loads_and_runs() {
        let factory = bundled();
        let map = factory.load_map("courtyard").unwrap().unwrap();
        assert_eq!(map.width(), 16);

        let mut scene = factory.build_scene("courtyard", None).unwrap();
        scene.start(Timestamp::ZERO).unwrap();
        assert_eq!(scene.tagged("guard").len(), 1);

        for step in 1..=50 {
            scene.tick(Timestamp(step * 100)).unwrap();
        }
        let guard = scene.tagged("guard")[0].actor().unwrap();
        assert!(scene.behavior_target(guard).is_some());
    }
}
