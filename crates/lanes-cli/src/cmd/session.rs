//! `lanes session`: drive a live store from a script.
//!
//! Each non-blank line is one step:
//!
//! ```text
//! move <id> <status>          optimistic status change
//! undo                        revert the newest change still in its window
//! edit <id> <field> <value>   title | status | priority | severity | assignee | tags (a,b)
//! sync                        fetch now
//! poll on|off                 toggle periodic fetch
//! interval <ms>               5000 | 10000 | 30000 | 60000 | 300000
//! wait <ms>                   let time pass, firing due timers
//! board                       snapshot the columns
//! ```
//!
//! `#` at the start of a line or after whitespace starts a comment, so
//! `edit X title Fix#42` keeps its `#`.
//!
//! With `--virtual-clock`, `wait` jumps straight to each due timer instead
//! of sleeping.

use crate::cmd::board::BoardOutput;
use crate::cmd::{Context, initial_fetch};
use crate::output::{OutputMode, render_mode};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::Args;
use lanes_core::clock::{Clock, ManualClock, SystemClock};
use lanes_core::gateway::IssueGateway;
use lanes_core::error::ErrorCode;
use lanes_core::model::{Issue, IssueUpdate, Status};
use lanes_core::notify::Notification;
use lanes_core::policy::AccessPolicy;
use lanes_core::store::{EditOutcome, IgnoreReason, IssueStore, StatusChange};
use lanes_core::sync::{PollInterval, SyncMetadata};
use lanes_triage::view::{FilterCriteria, SortKey, StoreView};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Script file. Reads stdin when omitted or "-".
    pub script: Option<PathBuf>,

    /// Advance time virtually instead of sleeping through waits.
    #[arg(long)]
    pub virtual_clock: bool,

    /// Starting instant for the virtual clock (RFC 3339). Defaults to now.
    #[arg(long, requires = "virtual_clock")]
    pub start: Option<DateTime<Utc>>,
}

/// Time source for a session: real, or advanced by `wait` steps.
#[derive(Debug, Clone)]
pub enum SessionClock {
    System(SystemClock),
    Manual(ManualClock),
}

impl Clock for SessionClock {
    fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System(clock) => clock.now(),
            Self::Manual(clock) => clock.now(),
        }
    }

    fn now_millis(&self) -> i64 {
        match self {
            Self::System(clock) => clock.now_millis(),
            Self::Manual(clock) => clock.now_millis(),
        }
    }
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Move { id: String, to: Status },
    Undo,
    Edit { id: String, update: IssueUpdate },
    Sync,
    Poll(bool),
    Interval(PollInterval),
    Wait(Duration),
    Board,
}

fn parse_edit_field(field: &str, value: &str) -> Result<IssueUpdate, String> {
    let mut update = IssueUpdate::default();
    match field {
        "title" => update.title = Some(value.to_string()),
        "status" => update.status = Some(value.parse().map_err(|e| format!("{e}"))?),
        "priority" => update.priority = Some(value.parse().map_err(|e| format!("{e}"))?),
        "severity" => update.severity = Some(crate::cmd::parse_severity(value)?),
        "assignee" => update.assignee = Some(value.to_string()),
        "tags" => {
            update.tags = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        other => return Err(format!("unknown field '{other}'")),
    }
    Ok(update)
}

fn parse_millis(raw: &str) -> Result<u64, String> {
    raw.parse()
        .map_err(|_| format!("expected milliseconds, got '{raw}'"))
}

/// Cut a trailing comment: a `#` that opens the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    line.char_indices()
        .find(|&(index, ch)| {
            ch == '#'
                && line[..index]
                    .chars()
                    .next_back()
                    .is_none_or(char::is_whitespace)
        })
        .map_or(line, |(index, _)| &line[..index])
}

/// Parse one script line. Blank lines and comments yield `None`.
///
/// # Errors
///
/// Returns a message describing the malformed line.
pub fn parse_step(line: &str) -> Result<Option<Step>, String> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let step = match verb {
        "move" => {
            let (id, status) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: move <id> <status>")?;
            Step::Move {
                id: id.to_string(),
                to: status.trim().parse().map_err(|e| format!("{e}"))?,
            }
        }
        "undo" => Step::Undo,
        "edit" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let (Some(id), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err("usage: edit <id> <field> <value>".to_string());
            };
            Step::Edit {
                id: id.to_string(),
                update: parse_edit_field(field, value.trim())?,
            }
        }
        "sync" => Step::Sync,
        "poll" => match rest {
            "on" => Step::Poll(true),
            "off" => Step::Poll(false),
            _ => return Err("usage: poll on|off".to_string()),
        },
        "interval" => {
            let millis = parse_millis(rest)?;
            Step::Interval(PollInterval::try_from(millis).map_err(|e| e.to_string())?)
        }
        "wait" => Step::Wait(Duration::from_millis(parse_millis(rest)?)),
        "board" => Step::Board,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(step))
}

/// Parse a whole script into `(line number, raw text, step)` triples.
///
/// # Errors
///
/// Fails on the first malformed line.
pub fn parse_script(text: &str) -> anyhow::Result<Vec<(usize, String, Step)>> {
    let mut steps = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        match parse_step(raw) {
            Ok(Some(step)) => steps.push((line, raw.trim().to_string(), step)),
            Ok(None) => {}
            Err(message) => anyhow::bail!("line {line}: {message}"),
        }
    }
    Ok(steps)
}

/// What a step did.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Moved {
        issue_id: String,
        from: Status,
        to: Status,
    },
    Ignored {
        code: &'static str,
        reason: String,
    },
    Undone {
        issue_id: String,
        restored: Status,
    },
    NothingToUndo,
    Updated {
        issue: Issue,
    },
    EditFailed {
        code: &'static str,
        error: String,
    },
    Synced {
        count: usize,
    },
    SyncFailed {
        error: String,
    },
    Polling {
        enabled: bool,
    },
    Interval {
        interval_ms: u64,
    },
    Waited {
        millis: u64,
        timers_fired: usize,
    },
    Board {
        board: BoardOutput,
    },
}

impl StepOutcome {
    fn ignored(reason: IgnoreReason) -> Self {
        let (code, reason) = match reason {
            IgnoreReason::PolicyDenied => (
                ErrorCode::PermissionDenied,
                "not allowed".to_string(),
            ),
            IgnoreReason::UnknownIssue => (
                ErrorCode::IssueNotFound,
                "unknown issue".to_string(),
            ),
            IgnoreReason::InvalidTransition(invalid) => (
                ErrorCode::InvalidStateTransition,
                invalid.to_string(),
            ),
        };
        Self::Ignored {
            code: code.code(),
            reason,
        }
    }

    fn summary(&self) -> String {
        match self {
            Self::Moved { issue_id, from, to } => format!("moved {issue_id}: {from} -> {to}"),
            Self::Ignored { code, reason } => format!("ignored [{code}]: {reason}"),
            Self::Undone { issue_id, restored } => format!("undone: {issue_id} back to {restored}"),
            Self::NothingToUndo => "nothing to undo".to_string(),
            Self::Updated { issue } => format!("updated {}", issue.id),
            Self::EditFailed { code, error } => format!("edit failed [{code}]: {error}"),
            Self::Synced { count } => format!("synced {count} issues"),
            Self::SyncFailed { error } => format!("sync failed: {error}"),
            Self::Polling { enabled } => {
                format!("polling {}", if *enabled { "on" } else { "off" })
            }
            Self::Interval { interval_ms } => format!("interval {interval_ms}ms"),
            Self::Waited {
                millis,
                timers_fired,
            } => format!("waited {millis}ms ({timers_fired} timers fired)"),
            Self::Board { board } => {
                let counts: Vec<String> = board
                    .columns
                    .iter()
                    .map(|column| format!("{}={}", column.status, column.count))
                    .collect();
                format!("board {}", counts.join(" "))
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub line: usize,
    pub command: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    pub notifications: Vec<Notification>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub can_undo: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub steps: Vec<StepReport>,
    pub board: BoardOutput,
    pub sync: SyncMetadata,
    /// Undo entries still open when the session ended.
    pub pending_undo: usize,
}

/// Runs parsed steps against a store.
pub struct Session<G> {
    store: IssueStore<G, SessionClock>,
    clock: SessionClock,
    can_move: bool,
    can_edit: bool,
}

impl<G: IssueGateway> Session<G> {
    pub fn new(store: IssueStore<G, SessionClock>, actor: &impl AccessPolicy) -> Self {
        Self {
            clock: store.clock().clone(),
            store,
            can_move: actor.can_move_issues(),
            can_edit: actor.can_edit_issues(),
        }
    }

    pub const fn store(&self) -> &IssueStore<G, SessionClock> {
        &self.store
    }

    /// Execute one step and report on it.
    pub fn run(&mut self, line: usize, command: String, step: &Step) -> StepReport {
        debug!(line, %command, "session step");
        let outcome = match step {
            Step::Move { id, to } => match self.store.request_status_change(id, *to, self.can_move)
            {
                StatusChange::Applied {
                    issue_id, from, to, ..
                } => StepOutcome::Moved { issue_id, from, to },
                StatusChange::Ignored(reason) => StepOutcome::ignored(reason),
            },
            Step::Undo => self.store.undo_last_action().map_or(StepOutcome::NothingToUndo, |undone| {
                StepOutcome::Undone {
                    issue_id: undone.issue_id,
                    restored: undone.restored,
                }
            }),
            Step::Edit { id, update } => match self.store.request_edit(id, update, self.can_edit) {
                EditOutcome::Updated(issue) => StepOutcome::Updated { issue },
                EditOutcome::Failed(err) => StepOutcome::EditFailed {
                    code: err.code().code(),
                    error: err.to_string(),
                },
                EditOutcome::Ignored(reason) => StepOutcome::ignored(reason),
            },
            Step::Sync => {
                self.store.fetch_all();
                match self.store.last_error() {
                    Some(error) => StepOutcome::SyncFailed {
                        error: error.to_string(),
                    },
                    None => StepOutcome::Synced {
                        count: self.store.len(),
                    },
                }
            }
            Step::Poll(enabled) => {
                self.store.set_polling_enabled(*enabled);
                StepOutcome::Polling { enabled: *enabled }
            }
            Step::Interval(interval) => {
                self.store.set_polling_interval(*interval);
                StepOutcome::Interval {
                    interval_ms: interval.as_millis(),
                }
            }
            Step::Wait(duration) => StepOutcome::Waited {
                millis: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                timers_fired: self.wait(*duration),
            },
            Step::Board => StepOutcome::Board {
                board: self.board(),
            },
        };

        StepReport {
            line,
            command,
            outcome,
            notifications: self.store.take_notifications(),
            loading: self.store.is_loading(),
            last_error: self.store.last_error().map(str::to_string),
            can_undo: self.store.can_undo(),
            at: self.clock.now(),
        }
    }

    fn board(&self) -> BoardOutput {
        let board = self
            .store
            .board(&FilterCriteria::default(), SortKey::PriorityScore);
        BoardOutput::new(&board, self.clock.now())
    }

    /// Let `duration` pass, firing timers as they come due.
    fn wait(&mut self, duration: Duration) -> usize {
        match self.clock.clone() {
            SessionClock::Manual(clock) => wait_virtual(&mut self.store, &clock, duration),
            SessionClock::System(_) => wait_real(&mut self.store, duration),
        }
    }

    /// Final snapshot; cancels every timer.
    pub fn finish(mut self, steps: Vec<StepReport>) -> SessionReport {
        let report = SessionReport {
            steps,
            board: self.board(),
            sync: self.store.sync_metadata(),
            pending_undo: self.store.history_len(),
        };
        self.store.shutdown();
        report
    }
}

fn millis_between(from: i64, to: i64) -> Duration {
    Duration::from_millis(u64::try_from(to.saturating_sub(from)).unwrap_or(0))
}

fn wait_virtual<G: IssueGateway>(
    store: &mut IssueStore<G, SessionClock>,
    clock: &ManualClock,
    duration: Duration,
) -> usize {
    let target = clock
        .now_millis()
        .saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
    let mut fired = store.run_due_timers();
    while let Some(due) = store.next_timer_due_millis().filter(|due| *due <= target) {
        clock.advance(millis_between(clock.now_millis(), due));
        let ran = store.run_due_timers();
        if ran == 0 {
            break;
        }
        fired += ran;
    }
    clock.advance(millis_between(clock.now_millis(), target));
    fired
}

fn wait_real<G: IssueGateway>(store: &mut IssueStore<G, SessionClock>, duration: Duration) -> usize {
    let deadline = Instant::now() + duration;
    let mut fired = store.run_due_timers();
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let mut nap = deadline - now;
        if let Some(due) = store.next_timer_due_millis() {
            nap = nap.min(millis_between(store.clock().now_millis(), due));
        }
        std::thread::sleep(nap);
        fired += store.run_due_timers();
    }
    fired
}

fn read_script(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path.filter(|path| path.as_os_str() != "-") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from stdin")?;
            Ok(text)
        }
    }
}

fn write_report_text(report: &SessionReport, w: &mut dyn Write) -> io::Result<()> {
    for step in &report.steps {
        writeln!(w, "{}\t{}\t{}", step.line, step.command, step.outcome.summary())?;
        for note in &step.notifications {
            writeln!(w, "{}\tnotify\t{}\t{}", step.line, note.level, note.message)?;
        }
    }
    crate::cmd::board::write_board_text(&report.board, w)
}

fn write_report_pretty(report: &SessionReport, w: &mut dyn Write) -> io::Result<()> {
    for step in &report.steps {
        writeln!(w, "[{:>3}] {:<28} {}", step.line, step.command, step.outcome.summary())?;
        for note in &step.notifications {
            writeln!(w, "      ({}) {}", note.level, note.message)?;
        }
        if let Some(error) = &step.last_error {
            writeln!(w, "      last error: {error}")?;
        }
    }
    writeln!(w)?;
    crate::cmd::board::write_board_pretty(&report.board, w)?;
    if let Some(synced) = report.sync.last_synced_at {
        writeln!(w, "last synced {}", synced.to_rfc3339())?;
    }
    Ok(())
}

/// Execute `lanes session`.
///
/// # Errors
///
/// Returns an error if the script cannot be read or parsed, the initial
/// fetch fails, or output rendering fails.
pub fn run_session(args: &SessionArgs, ctx: &Context) -> anyhow::Result<()> {
    let steps = parse_script(&read_script(args.script.as_ref())?)?;

    let clock = if args.virtual_clock {
        SessionClock::Manual(ManualClock::new(args.start.unwrap_or_else(Utc::now)))
    } else {
        SessionClock::System(SystemClock)
    };
    let mut store = ctx.open_store(clock);
    initial_fetch(&mut store, ctx.output)?;

    let mut session = Session::new(store, &ctx.actor);
    info!(steps = steps.len(), virtual_clock = args.virtual_clock, "session started");
    let reports = steps
        .into_iter()
        .map(|(line, command, step)| session.run(line, command, &step))
        .collect();
    let report = session.finish(reports);

    render_session(&report, ctx.output)
}

fn render_session(report: &SessionReport, output: OutputMode) -> anyhow::Result<()> {
    render_mode(
        output,
        report,
        |report, w| write_report_text(report, w),
        |report, w| write_report_pretty(report, w),
    )
}
