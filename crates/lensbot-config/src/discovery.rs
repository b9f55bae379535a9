//! Where lensbot finds its configuration.
//!
//! Without `--config`, two files are merged, the project file winning:
//! `config.toml` in the per-user lensbot directory, then `lensbot.toml` in
//! the working directory. Either may be absent. A file that exists but does
//! not parse becomes a warning and is skipped, so the other layer still
//! applies. CLI flags are folded in afterwards by the binary.
//!
//! An explicit `--config` file replaces discovery and must load.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, LensbotConfig, Result};

const PROJECT_CONFIG_FILE: &str = "lensbot.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "lensbot";

/// Overrides the per-user config directory (tests, multiple instances).
const CONFIG_DIR_ENV: &str = "LENSBOT_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
    Explicit,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Explicit => "explicit",
        })
    }
}

/// One file that was considered.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    /// False when the file was absent or unreadable.
    pub loaded: bool,
}

/// Merged configuration plus an account of how it was built.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LensbotConfig,
    /// Files considered, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Files that existed but were skipped.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// The set of files searched when no explicit config is given.
#[derive(Debug, Clone)]
pub struct Discovery {
    user_dir: Option<PathBuf>,
    project_dir: PathBuf,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Per-user directory from the environment, project file in `.`.
    pub fn new() -> Self {
        Self {
            user_dir: user_config_dir(),
            project_dir: PathBuf::from("."),
        }
    }

    /// Use `dir` for the user layer; `None` skips that layer.
    pub fn with_user_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_dir = dir;
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Candidate files, lowest precedence first.
    pub fn candidates(&self) -> Vec<(Layer, PathBuf)> {
        let mut files = Vec::with_capacity(2);
        if let Some(dir) = &self.user_dir {
            files.push((Layer::User, dir.join(USER_CONFIG_FILE)));
        }
        files.push((Layer::Project, self.project_dir.join(PROJECT_CONFIG_FILE)));
        files
    }

    /// Merge every candidate that exists and parses.
    pub fn load(&self) -> LoadedConfig {
        let mut loaded = LoadedConfig {
            config: LensbotConfig::new(),
            sources: Vec::new(),
            warnings: Vec::new(),
        };

        for (layer, path) in self.candidates() {
            let mut ok = false;
            if path.is_file() {
                match load_config_file(&path) {
                    Ok(file) => {
                        loaded.config.merge(file);
                        ok = true;
                    }
                    Err(e) => loaded
                        .warnings
                        .push(format!("Skipping {} config {}: {}", layer, path.display(), e)),
                }
            }
            loaded.sources.push(ConfigSource {
                layer,
                path,
                loaded: ok,
            });
        }

        loaded
    }
}

/// Load the explicit file if one is given, otherwise run discovery.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = explicit else {
        return Ok(Discovery::new().load());
    };

    Ok(LoadedConfig {
        config: load_config_file(path)?,
        sources: vec![ConfigSource {
            layer: Layer::Explicit,
            path: path.to_path_buf(),
            loaded: true,
        }],
        warnings: Vec::new(),
    })
}

/// Read and parse one TOML file.
pub fn load_config_file(path: &Path) -> Result<LensbotConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    LensbotConfig::from_toml(&contents)
}

/// `LENSBOT_CONFIG_DIR` when set and non-empty, else the platform config
/// directory joined with `lensbot`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStrategy;
    use std::fs;
    use tempfile::TempDir;

    fn discovery(user: &TempDir, project: &TempDir) -> Discovery {
        Discovery::new()
            .with_user_dir(Some(user.path().to_path_buf()))
            .with_project_dir(project.path())
    }

    #[test]
    fn test_candidates_order() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let files = discovery(&user, &project).candidates();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0], (Layer::User, user.path().join("config.toml")));
        assert_eq!(files[1], (Layer::Project, project.path().join("lensbot.toml")));
    }

    #[test]
    fn test_no_user_dir_skips_layer() {
        let project = TempDir::new().unwrap();
        let files = Discovery::new()
            .with_user_dir(None)
            .with_project_dir(project.path())
            .candidates();
        assert_eq!(files, vec![(Layer::Project, project.path().join("lensbot.toml"))]);
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[matching]\nstrategy = \"embedding\"\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.matching_config().strategy, MatchStrategy::Embedding);
    }

    #[test]
    fn test_load_config_file_errors() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();
        assert!(matches!(load_config_file(&path).unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_nothing_found_gives_defaults() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let loaded = discovery(&user, &project).load();

        assert!(loaded.config.server.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[llm]\nmodel = \"user-model\"\n\n[server]\nport = 8080\n",
        )
        .unwrap();
        fs::write(project.path().join("lensbot.toml"), "[server]\nport = 3000\n").unwrap();

        let loaded = discovery(&user, &project).load();

        assert_eq!(loaded.config.server_config().port, 3000);
        assert_eq!(loaded.config.llm_config().model, "user-model");
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_broken_layer_is_skipped_with_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[server]\nport = 9001\n").unwrap();
        fs::write(project.path().join("lensbot.toml"), "not valid toml {{{{").unwrap();

        let loaded = discovery(&user, &project).load();

        assert_eq!(loaded.config.server_config().port, 9001);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Skipping project config"));
        assert_eq!(loaded.loaded_from(), vec![user.path().join("config.toml")]);
    }

    #[test]
    fn test_explicit_file_replaces_discovery() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[llm]\nmodel = \"gpt-4o-mini\"\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();

        assert_eq!(loaded.config.llm_config().model, "gpt-4o-mini");
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].layer, Layer::Explicit);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let err = load_config(Some(Path::new("/nonexistent/custom.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
