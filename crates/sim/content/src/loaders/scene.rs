//! Scene layout loader.
//!
//! A scene file lists the static entries of one map and the actors placed
//! when it starts. Terrain lives in the matching map file.

use std::path::Path;

use sim_core::SceneConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for scene layouts from RON files.
pub struct SceneLoader;

impl SceneLoader {
    /// Load a scene layout from a RON file.
    ///
    /// A layout without a `name` takes the file stem.
    pub fn load(path: &Path) -> LoadResult<SceneConfig> {
        let content = read_file(path)?;
        let mut scene = Self::parse(&content)?;
        if scene.name.is_empty() {
            scene.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("Scene file {} has no usable name", path.display()))?;
        }
        Ok(scene)
    }

    pub fn parse(content: &str) -> LoadResult<SceneConfig> {
        let scene: SceneConfig = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse scene RON: {}", e))?;

        for entry in &scene.entries {
            if entry.name.is_empty() {
                anyhow::bail!("Scene '{}' has an entry without a name", scene.name);
            }
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use sim_core::schema::ExpressionConfig;
    use sim_core::{ActionConfig, HandlerKind, Vector2};

    use super::*;

    #[test]
    fn entries_and_placed_actors_parse() {
        let scene = SceneLoader::parse(
            r#"(
                name: "yard",
                entries: [
                    (
                        name: "route",
                        tags: ["route"],
                        path: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)],
                        handlers: [
                            (
                                kind: Timer(interval: 1000),
                                action: SetVariable(name: "pulses", value: Parsed("previous + 1")),
                            ),
                        ],
                    ),
                ],
                actors: [(config: "crate")],
            )"#,
        )
        .unwrap();

        assert_eq!(scene.name, "yard");
        let entry = &scene.entries[0];
        assert_eq!(entry.path[1], Vector2::new(4.0, 0.0));
        assert!(matches!(
            entry.handlers[0].kind,
            HandlerKind::Timer {
                interval: 1000,
                offset: 0,
                limit: 0,
                warning: None
            }
        ));
        let ActionConfig::SetVariable { value, .. } = &entry.handlers[0].action else {
            panic!("expected a set-variable action");
        };
        assert_eq!(value, &ExpressionConfig::Parsed("previous + 1".to_owned()));
        assert_eq!(scene.actors[0].config, "crate");
    }

    #[test]
    fn unnamed_entries_are_rejected() {
        let error = SceneLoader::parse(r#"(name: "yard", entries: [(tags: ["orphan"])])"#).unwrap_err();
        assert!(error.to_string().contains("entry without a name"));
    }
}
