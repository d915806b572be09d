use crate::policy::Role;
use crate::store::{DEFAULT_HISTORY_LIMIT, DEFAULT_UNDO_WINDOW, StoreConfig};
use crate::sync::PollInterval;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-level settings from `.lanes/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub recent: RecentConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub polling: bool,
    #[serde(default)]
    pub interval_ms: PollInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoConfig {
    #[serde(default = "default_undo_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            window_ms: default_undo_window_ms(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_ms")]
    pub duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_notification_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentConfig {
    #[serde(default = "default_recent_capacity")]
    pub capacity: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            capacity: default_recent_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Issues file, relative to the project root unless absolute.
    #[serde(default = "default_issues_path")]
    pub issues_path: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            issues_path: default_issues_path(),
        }
    }
}

impl ProjectConfig {
    /// Store tunables derived from this config.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            undo_window: Duration::from_millis(self.undo.window_ms),
            history_limit: self.undo.history_limit,
            notification_duration: Duration::from_millis(self.notifications.duration_ms),
            polling_enabled: self.sync.polling,
            poll_interval: self.sync.interval_ms,
        }
    }

    /// Absolute path of the issues file for `project_root`.
    #[must_use]
    pub fn issues_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.remote.issues_path)
    }
}

/// Per-user settings from `<config dir>/lanes/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Where the recently accessed list is kept. Defaults under the data dir.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl UserConfig {
    /// Resolved state file, if any location is available.
    #[must_use]
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state_path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("lanes/state.json")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.lanes/config.toml` under `project_root`, or defaults if absent.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".lanes/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the user config, or defaults if absent.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("lanes/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and output overrides.
///
/// # Errors
///
/// Propagates config load failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_undo_window_ms() -> u64 {
    u64::try_from(DEFAULT_UNDO_WINDOW.as_millis()).unwrap_or(u64::MAX)
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_notification_ms() -> u64 {
    u64::try_from(crate::notify::DEFAULT_DISPLAY.as_millis()).unwrap_or(u64::MAX)
}

const fn default_recent_capacity() -> usize {
    crate::recent::DEFAULT_CAPACITY
}

fn default_issues_path() -> PathBuf {
    PathBuf::from(".lanes/issues.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert!(!cfg.sync.polling);
        assert_eq!(cfg.sync.interval_ms, PollInterval::ThirtySeconds);
        assert_eq!(cfg.undo.window_ms, 5_000);
        assert_eq!(cfg.undo.history_limit, 10);
        assert_eq!(cfg.notifications.duration_ms, 3_000);
        assert_eq!(cfg.recent.capacity, 5);
        assert_eq!(
            cfg.issues_path(root.path()),
            root.path().join(".lanes/issues.json")
        );
        assert_eq!(cfg.store_config(), StoreConfig::default());
    }

    #[test]
    fn project_config_sections_parse() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".lanes")).expect("mkdir");
        std::fs::write(
            root.path().join(".lanes/config.toml"),
            r#"
[sync]
polling = true
interval_ms = 10000

[undo]
history_limit = 3

[remote]
issues_path = "/srv/issues.json"
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        let store = cfg.store_config();
        assert!(store.polling_enabled);
        assert_eq!(store.poll_interval, PollInterval::TenSeconds);
        assert_eq!(store.history_limit, 3);
        assert_eq!(store.undo_window, Duration::from_secs(5));
        assert_eq!(
            cfg.issues_path(root.path()),
            PathBuf::from("/srv/issues.json")
        );
    }

    #[test]
    fn unsupported_interval_is_a_parse_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".lanes")).expect("mkdir");
        std::fs::write(
            root.path().join(".lanes/config.toml"),
            "[sync]\ninterval_ms = 7000\n",
        )
        .expect("write config");

        let err = load_project_config(root.path()).expect_err("7000 is not a preset");
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }

    #[test]
    fn user_config_parses_role_and_state_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "output = \"json\"\nrole = \"contributor\"\nstate_path = \"/tmp/lanes-state.json\"\n",
        )
        .expect("write config");

        let cfg = load_user_config_from(&path).expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.role, Role::Contributor);
        assert_eq!(
            cfg.state_path(),
            Some(PathBuf::from("/tmp/lanes-state.json"))
        );
    }

    #[test]
    fn missing_user_config_defaults_to_admin() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_user_config_from(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(cfg.role, Role::Admin);
        assert!(cfg.output.is_none());
    }
}
