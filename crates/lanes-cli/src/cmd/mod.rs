pub mod board;
pub mod completions;
pub mod edit;
pub mod list;
pub mod recent;
pub mod session;
pub mod show;

use crate::output::{CliError, OutputMode, render_error};
use anyhow::Result;
use lanes_core::clock::{Clock, SystemClock};
use lanes_core::config::{self, EffectiveConfig};
use lanes_core::error::ErrorCode;
use lanes_core::gateway::{IssueGateway, JsonFileGateway};
use lanes_core::policy::{Actor, Role};
use lanes_core::recent::{FileKvStore, RecentlyAccessed};
use lanes_core::store::IssueStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a command needs to know about where it runs.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub actor: Actor,
    pub issues_path: PathBuf,
    pub state_path: Option<PathBuf>,
}

/// Overrides collected from global flags.
#[derive(Debug, Default)]
pub struct Overrides {
    pub json: bool,
    pub format: Option<OutputMode>,
    pub role: Option<Role>,
    pub issues: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

impl Context {
    /// Resolve config for `project_root` and apply flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(project_root: &Path, overrides: Overrides) -> Result<Self> {
        let config = config::resolve_config(project_root, overrides.json)?;
        let output = overrides
            .format
            .filter(|_| !overrides.json)
            .unwrap_or_else(|| OutputMode::from_resolved(&config.resolved_output));
        let role = overrides.role.unwrap_or(config.user.role);
        let issues_path = overrides
            .issues
            .unwrap_or_else(|| config.project.issues_path(project_root));
        let state_path = overrides.state.or_else(|| config.user.state_path());
        debug!(
            root = %project_root.display(),
            issues = %issues_path.display(),
            %role,
            "resolved context"
        );

        Ok(Self {
            project_root: project_root.to_path_buf(),
            actor: Actor::new(actor_name(), role),
            config,
            output,
            issues_path,
            state_path,
        })
    }

    /// A store over the issues file, not yet fetched.
    pub fn open_store<C: Clock>(&self, clock: C) -> IssueStore<JsonFileGateway, C> {
        IssueStore::new(
            self.config.project.store_config(),
            JsonFileGateway::new(&self.issues_path),
            clock,
        )
    }

    /// A store loaded from the issues file.
    ///
    /// # Errors
    ///
    /// Renders and returns the fetch error when the file cannot be read.
    pub fn load_store(&self) -> Result<IssueStore<JsonFileGateway, SystemClock>> {
        let mut store = self.open_store(SystemClock);
        initial_fetch(&mut store, self.output)?;
        Ok(store)
    }

    /// The recently accessed list, restored from the state file.
    pub fn recent(&self) -> Option<RecentlyAccessed<FileKvStore, SystemClock>> {
        let path = self.state_path.as_ref()?;
        let mut recent = RecentlyAccessed::new(
            FileKvStore::new(path),
            SystemClock,
            self.config.project.recent.capacity,
        );
        recent.load();
        Some(recent)
    }
}

/// Fetch once, rendering a coded error if the remote is unusable.
///
/// # Errors
///
/// Returns an error if the fetch failed.
pub fn initial_fetch<G: IssueGateway, C: Clock>(
    store: &mut IssueStore<G, C>,
    output: OutputMode,
) -> Result<()> {
    let pending = store.begin_fetch();
    let result = store.gateway_mut().fetch_all();
    let failure = result.as_ref().err().map(|err| (err.code(), err.to_string()));
    store.complete_fetch(pending, result);

    if let Some((code, message)) = failure {
        render_error(output, &CliError::from_code(code, &message))?;
        anyhow::bail!("{message}");
    }
    Ok(())
}

/// Render an "issue not found" error and fail.
///
/// # Errors
///
/// Always returns an error.
pub fn issue_not_found(output: OutputMode, id: &str) -> Result<()> {
    render_error(
        output,
        &CliError::from_code(ErrorCode::IssueNotFound, format!("issue '{id}' not found"))
            .with_suggestion("use `lanes list` to see available issues"),
    )?;
    anyhow::bail!("issue '{id}' not found")
}

fn actor_name() -> String {
    std::env::var("LANES_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "anonymous".to_string())
}

/// Value parser for `--severity` flags.
///
/// # Errors
///
/// Returns a message when `raw` is not an integer in `1..=10`.
pub fn parse_severity(raw: &str) -> Result<lanes_core::model::Severity, String> {
    let value: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid severity '{raw}': expected an integer 1-10"))?;
    lanes_core::model::Severity::new(value).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_flag_is_range_checked() {
        assert_eq!(parse_severity("7").map(lanes_core::model::Severity::get), Ok(7));
        assert!(parse_severity("0").is_err());
        assert!(parse_severity("11").is_err());
        assert!(parse_severity("high").is_err());
    }
}
