//! `lanes list`: filtered, sorted issue listing.

use crate::cmd::{Context, parse_severity};
use crate::output::{Renderable, render_list};
use clap::Args;
use lanes_core::clock::Clock;
use lanes_core::model::{Issue, Priority, Severity, Status};
use lanes_triage::score::priority_score;
use lanes_triage::view::{FilterCriteria, SortKey, StoreView};
use serde::Serialize;
use std::io::{self, Write};

/// Filter flags shared by `list` and `board`.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Only issues in this status (backlog, in-progress, done).
    #[arg(short, long)]
    pub status: Option<Status>,

    /// Only issues with this priority (low, medium, high).
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Only issues assigned to this user. Pass "" for unassigned.
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Only issues with exactly this severity (1-10).
    #[arg(long, value_parser = parse_severity)]
    pub severity: Option<Severity>,

    /// Case-insensitive match against title, tags and id.
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Ordering: priority-score, created, severity, priority, title, assignee.
    #[arg(long, default_value_t = SortKey::PriorityScore)]
    pub sort: SortKey,
}

impl FilterArgs {
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            status: self.status,
            priority: self.priority,
            assignee: self.assignee.clone(),
            severity: self.severity,
            search: self.search.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum issues to show.
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,
}

/// One listing row.
#[derive(Debug, Serialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub severity: Severity,
    pub assignee: String,
    pub tags: Vec<String>,
    pub score: i64,
}

impl ListRow {
    pub fn new(issue: &Issue, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            score: priority_score(issue, now),
            id: issue.id.clone(),
            title: issue.title.clone(),
            status: issue.status,
            priority: issue.priority,
            severity: issue.severity,
            assignee: issue.assignee.clone(),
            tags: issue.tags.clone(),
        }
    }

    fn assignee_label(&self) -> &str {
        if self.assignee.is_empty() {
            "-"
        } else {
            &self.assignee
        }
    }
}

impl Renderable for ListRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{:<12} {:<11} {:<6} sev {:>2}  {:>4}  {:<10} {}",
            self.id,
            self.status.to_string(),
            self.priority.to_string(),
            self.severity.get(),
            self.score,
            self.assignee_label(),
            self.title
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.status,
            self.priority,
            self.severity.get(),
            self.score,
            self.assignee_label(),
            self.title
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "STATUS", "PRIORITY", "SEVERITY", "SCORE", "ASSIGNEE", "TITLE"]
    }
}

/// Execute `lanes list`.
///
/// # Errors
///
/// Returns an error if the issues file cannot be read or output fails.
pub fn run_list(args: &ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.load_store()?;
    let now = store.clock().now();
    let rows: Vec<ListRow> = store
        .view(&args.filter.criteria(), args.filter.sort)
        .iter()
        .take(args.limit)
        .map(|issue| ListRow::new(issue, now))
        .collect();

    if rows.is_empty() && !ctx.output.is_json() {
        println!("No issues found");
        return Ok(());
    }
    render_list(&rows, ctx.output)?;
    Ok(())
}
