//! Remote issue source.
//!
//! The store treats the remote as a black-box request/response service with
//! two calls: fetch everything, or update one issue and get back the
//! authoritative record. Two implementations ship here:
//!
//! - [`InMemoryGateway`]: a scriptable in-process remote with optional
//!   seeded fault injection, for tests and simulations.
//! - [`JsonFileGateway`]: a JSON array of issues on disk, updated in place
//!   under an advisory lock.

use crate::error::{FetchError, UpdateError};
use crate::lock::{DEFAULT_LOCK_TIMEOUT, ReadLock, WriteLock, lock_path_for};
use crate::model::{Issue, IssueUpdate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Request/response access to the authoritative issue set.
pub trait IssueGateway {
    /// Retrieve the full issue set.
    ///
    /// # Errors
    ///
    /// [`FetchError`] on any network or server fault.
    fn fetch_all(&mut self) -> Result<Vec<Issue>, FetchError>;

    /// Apply `fields` to issue `id` and return the merged record.
    ///
    /// # Errors
    ///
    /// [`UpdateError`] when the remote rejects or cannot apply the update.
    fn update_issue(&mut self, id: &str, fields: &IssueUpdate) -> Result<Issue, UpdateError>;
}

impl<G: IssueGateway + ?Sized> IssueGateway for Box<G> {
    fn fetch_all(&mut self) -> Result<Vec<Issue>, FetchError> {
        (**self).fetch_all()
    }

    fn update_issue(&mut self, id: &str, fields: &IssueUpdate) -> Result<Issue, UpdateError> {
        (**self).update_issue(id, fields)
    }
}

/// Random fault rates, as integer percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultConfig {
    pub fetch_failure_percent: u8,
    pub update_failure_percent: u8,
}

impl FaultConfig {
    /// The flaky mock remote the board was originally developed against:
    /// one update in ten fails, fetches always succeed.
    #[must_use]
    pub const fn flaky_updates() -> Self {
        Self {
            fetch_failure_percent: 0,
            update_failure_percent: 10,
        }
    }
}

/// In-process remote holding issues in a map keyed by id.
#[derive(Debug, Clone)]
pub struct InMemoryGateway {
    issues: BTreeMap<String, Issue>,
    faults: FaultConfig,
    rng: StdRng,
    scripted_fetch_failures: u32,
    scripted_update_failures: u32,
    fetch_calls: u32,
    update_calls: Vec<(String, IssueUpdate)>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryGateway {
    /// A remote that never fails.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self::with_faults(issues, FaultConfig::default(), 0)
    }

    /// A remote that fails at the given rates, reproducibly for `seed`.
    #[must_use]
    pub fn with_faults(issues: Vec<Issue>, faults: FaultConfig, seed: u64) -> Self {
        Self {
            issues: issues
                .into_iter()
                .map(|issue| (issue.id.clone(), issue))
                .collect(),
            faults,
            rng: StdRng::seed_from_u64(seed),
            scripted_fetch_failures: 0,
            scripted_update_failures: 0,
            fetch_calls: 0,
            update_calls: Vec::new(),
        }
    }

    /// Make the next `n` fetches fail regardless of the fault rates.
    pub fn fail_next_fetches(&mut self, n: u32) {
        self.scripted_fetch_failures = n;
    }

    /// Make the next `n` updates fail regardless of the fault rates.
    pub fn fail_next_updates(&mut self, n: u32) {
        self.scripted_update_failures = n;
    }

    /// Change an issue behind the store's back, as another client would.
    pub fn upsert(&mut self, issue: Issue) {
        self.issues.insert(issue.id.clone(), issue);
    }

    pub fn remove(&mut self, id: &str) -> Option<Issue> {
        self.issues.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    #[must_use]
    pub const fn fetch_calls(&self) -> u32 {
        self.fetch_calls
    }

    /// Every update received, in order.
    #[must_use]
    pub fn update_calls(&self) -> &[(String, IssueUpdate)] {
        &self.update_calls
    }

    fn roll(&mut self, percent: u8) -> bool {
        match percent {
            0 => false,
            100.. => true,
            p => self.rng.gen_range(0..100) < p,
        }
    }
}

impl IssueGateway for InMemoryGateway {
    fn fetch_all(&mut self) -> Result<Vec<Issue>, FetchError> {
        self.fetch_calls += 1;
        if self.scripted_fetch_failures > 0 {
            self.scripted_fetch_failures -= 1;
            return Err(FetchError::Unavailable("Failed to fetch issues".into()));
        }
        if self.roll(self.faults.fetch_failure_percent) {
            return Err(FetchError::Unavailable("Failed to fetch issues".into()));
        }
        Ok(self.issues.values().cloned().collect())
    }

    fn update_issue(&mut self, id: &str, fields: &IssueUpdate) -> Result<Issue, UpdateError> {
        self.update_calls.push((id.to_string(), fields.clone()));
        if self.scripted_update_failures > 0 {
            self.scripted_update_failures -= 1;
            return Err(UpdateError::Unavailable("Failed to update issue".into()));
        }
        if self.roll(self.faults.update_failure_percent) {
            return Err(UpdateError::Unavailable("Failed to update issue".into()));
        }

        let current = self
            .issues
            .get(id)
            .ok_or_else(|| UpdateError::NotFound(id.to_string()))?;
        let merged = fields.apply_to(current);
        self.issues.insert(id.to_string(), merged.clone());
        Ok(merged)
    }
}

/// Remote backed by a JSON array of issues in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileGateway {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        Self { path, lock_path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_issues(&self) -> Result<Vec<Issue>, FetchError> {
        let content = fs::read_to_string(&self.path).map_err(|err| {
            FetchError::Unavailable(format!("{}: {err}", self.path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|err| FetchError::Malformed(format!("{}: {err}", self.path.display())))
    }

    fn write_issues(&self, issues: &[Issue]) -> io::Result<()> {
        let json = serde_json::to_string_pretty(issues)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

impl IssueGateway for JsonFileGateway {
    fn fetch_all(&mut self) -> Result<Vec<Issue>, FetchError> {
        let _lock = ReadLock::acquire(&self.lock_path, DEFAULT_LOCK_TIMEOUT)
            .map_err(|err| FetchError::Unavailable(err.to_string()))?;
        let issues = self.read_issues()?;
        debug!(path = %self.path.display(), count = issues.len(), "read issues file");
        Ok(issues)
    }

    fn update_issue(&mut self, id: &str, fields: &IssueUpdate) -> Result<Issue, UpdateError> {
        let _lock = WriteLock::acquire(&self.lock_path, DEFAULT_LOCK_TIMEOUT)
            .map_err(|err| UpdateError::Unavailable(err.to_string()))?;

        let mut issues = self
            .read_issues()
            .map_err(|err| UpdateError::Unavailable(err.to_string()))?;
        let slot = issues
            .iter_mut()
            .find(|issue| issue.id == id)
            .ok_or_else(|| UpdateError::NotFound(id.to_string()))?;
        let merged = fields.apply_to(slot);
        *slot = merged.clone();

        self.write_issues(&issues).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "failed to write issues file");
            UpdateError::Unavailable(err.to_string())
        })?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultConfig, InMemoryGateway, IssueGateway, JsonFileGateway};
    use crate::error::{FetchError, UpdateError};
    use crate::model::{Issue, IssueUpdate, Priority, Severity, Status};
    use chrono::{TimeZone, Utc};

    fn issue(id: &str) -> Issue {
        Issue {
            id: id.into(),
            title: format!("Issue {id}"),
            status: Status::Backlog,
            priority: Priority::Medium,
            severity: Severity::new(5).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            assignee: String::new(),
            tags: vec![],
        }
    }

    #[test]
    fn in_memory_update_returns_merged_record() {
        let mut gateway = InMemoryGateway::new(vec![issue("A")]);
        let update = IssueUpdate {
            title: Some("Renamed".into()),
            ..IssueUpdate::default()
        };
        let merged = gateway.update_issue("A", &update).unwrap();
        assert_eq!(merged.title, "Renamed");
        assert_eq!(gateway.get("A").unwrap().title, "Renamed");
        assert_eq!(gateway.update_calls().len(), 1);
    }

    #[test]
    fn in_memory_unknown_issue_is_not_found() {
        let mut gateway = InMemoryGateway::default();
        assert_eq!(
            gateway.update_issue("nope", &IssueUpdate::default()),
            Err(UpdateError::NotFound("nope".into()))
        );
    }

    #[test]
    fn scripted_failures_are_consumed_in_order() {
        let mut gateway = InMemoryGateway::new(vec![issue("A")]);
        gateway.fail_next_fetches(1);
        assert!(gateway.fetch_all().is_err());
        assert_eq!(gateway.fetch_all().unwrap().len(), 1);
        assert_eq!(gateway.fetch_calls(), 2);
    }

    #[test]
    fn fault_rates_are_reproducible_for_a_seed() {
        let run = |seed| {
            let mut gateway =
                InMemoryGateway::with_faults(vec![issue("A")], FaultConfig::flaky_updates(), seed);
            (0..50)
                .map(|_| gateway.update_issue("A", &IssueUpdate::default()).is_ok())
                .collect::<Vec<_>>()
        };
        let first = run(7);
        assert_eq!(first, run(7));
        assert!(first.iter().any(|ok| *ok));
    }

    #[test]
    fn file_gateway_reads_and_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.json");
        std::fs::write(&path, serde_json::to_string(&vec![issue("A"), issue("B")]).unwrap())
            .unwrap();

        let mut gateway = JsonFileGateway::new(&path);
        assert_eq!(gateway.fetch_all().unwrap().len(), 2);

        let update = IssueUpdate {
            severity: Some(Severity::new(9).unwrap()),
            ..IssueUpdate::default()
        };
        let merged = gateway.update_issue("B", &update).unwrap();
        assert_eq!(merged.severity.get(), 9);

        let reread = gateway.fetch_all().unwrap();
        let b = reread.iter().find(|i| i.id == "B").unwrap();
        assert_eq!(b.severity.get(), 9);
    }

    #[test]
    fn file_gateway_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.json");
        let mut gateway = JsonFileGateway::new(&path);
        assert!(matches!(gateway.fetch_all(), Err(FetchError::Unavailable(_))));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(gateway.fetch_all(), Err(FetchError::Malformed(_))));
    }
}
