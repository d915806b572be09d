//! `lanes show`: full details of a single issue.
//!
//! Viewing an issue pushes it onto the recently accessed list.

use crate::cmd::{Context, issue_not_found};
use crate::output::{OutputMode, pretty_kv, pretty_rule, render_mode};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use lanes_core::clock::Clock;
use lanes_core::model::{Issue, Priority, Severity, Status};
use lanes_core::workflow::allowed_targets;
use lanes_triage::score::{age_days, priority_score};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Issue ID to display.
    pub id: String,
}

/// Full issue detail as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct ShowIssue {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub severity: Severity,
    pub assignee: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub age_days: i64,
    pub score: i64,
    /// Statuses this issue may move to next.
    pub can_move_to: Vec<Status>,
}

impl ShowIssue {
    fn new(issue: &Issue, now: DateTime<Utc>) -> Self {
        Self {
            id: issue.id.clone(),
            title: issue.title.clone(),
            status: issue.status,
            priority: issue.priority,
            severity: issue.severity,
            assignee: issue.assignee.clone(),
            tags: issue.tags.clone(),
            created_at: issue.created_at,
            age_days: age_days(issue.created_at, now),
            score: priority_score(issue, now),
            can_move_to: allowed_targets(issue.status),
        }
    }
}

fn join_statuses(statuses: &[Status]) -> String {
    statuses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_show_human(issue: &ShowIssue, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{}  {}", issue.id, issue.title)?;
    pretty_rule(w)?;
    pretty_kv(w, "Status", issue.status.to_string())?;
    pretty_kv(w, "Priority", issue.priority.to_string())?;
    pretty_kv(w, "Severity", issue.severity.to_string())?;
    pretty_kv(
        w,
        "Assignee",
        if issue.assignee.is_empty() {
            "(unassigned)"
        } else {
            &issue.assignee
        },
    )?;
    if !issue.tags.is_empty() {
        pretty_kv(w, "Tags", issue.tags.join(", "))?;
    }
    pretty_kv(
        w,
        "Created",
        format!(
            "{} ({} days ago)",
            issue
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            issue.age_days
        ),
    )?;
    pretty_kv(w, "Score", issue.score.to_string())?;
    pretty_kv(w, "Can move to", join_statuses(&issue.can_move_to))
}

fn render_show_text(issue: &ShowIssue, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "id\t{}", issue.id)?;
    writeln!(w, "title\t{}", issue.title)?;
    writeln!(w, "status\t{}", issue.status)?;
    writeln!(w, "priority\t{}", issue.priority)?;
    writeln!(w, "severity\t{}", issue.severity.get())?;
    writeln!(w, "assignee\t{}", issue.assignee)?;
    writeln!(w, "tags\t{}", issue.tags.join(","))?;
    writeln!(w, "created_at\t{}", issue.created_at.to_rfc3339())?;
    writeln!(w, "score\t{}", issue.score)?;
    writeln!(w, "can_move_to\t{}", join_statuses(&issue.can_move_to))
}

/// Execute `lanes show <id>`.
///
/// # Errors
///
/// Returns an error if the issues file cannot be read, the issue does not
/// exist, or output rendering fails.
pub fn run_show(args: &ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.load_store()?;
    let Some(issue) = store.issue(&args.id) else {
        return issue_not_found(ctx.output, &args.id);
    };

    if let Some(mut recent) = ctx.recent() {
        recent.record(&issue.id, &issue.title);
    }

    let shown = ShowIssue::new(issue, store.clock().now());
    render_mode(
        ctx.output,
        &shown,
        |issue, w| render_show_text(issue, w),
        |issue, w| render_show_human(issue, w),
    )
}

/// Render a single issue; used by commands that echo their result.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn render_issue(issue: &Issue, now: DateTime<Utc>, output: OutputMode) -> anyhow::Result<()> {
    render_mode(
        output,
        &ShowIssue::new(issue, now),
        |issue, w| render_show_text(issue, w),
        |issue, w| render_show_human(issue, w),
    )
}
