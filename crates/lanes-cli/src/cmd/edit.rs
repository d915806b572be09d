//! `lanes edit`: update issue fields through the remote.

use crate::cmd::{Context, parse_severity};
use crate::cmd::show::render_issue;
use crate::output::{CliError, render_error};
use clap::Args;
use lanes_core::clock::Clock;
use lanes_core::error::ErrorCode;
use lanes_core::model::{IssueUpdate, Priority, Severity, Status};
use lanes_core::policy::AccessPolicy;
use lanes_core::store::{EditOutcome, IgnoreReason};

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Issue ID to edit.
    pub id: String,

    /// New title.
    #[arg(long)]
    pub title: Option<String>,

    /// New status. Must be one step along the workflow.
    #[arg(short, long)]
    pub status: Option<Status>,

    /// New priority (low, medium, high).
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// New severity (1-10).
    #[arg(long, value_parser = parse_severity)]
    pub severity: Option<Severity>,

    /// New assignee. Pass "" to unassign.
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Replace tags with this list (repeatable).
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Remove every tag.
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
}

impl EditArgs {
    pub fn update(&self) -> IssueUpdate {
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.clone())
        };
        IssueUpdate {
            title: self.title.clone(),
            status: self.status,
            priority: self.priority,
            severity: self.severity,
            assignee: self.assignee.clone(),
            tags,
        }
    }
}

/// Error code and message for an edit that did not go through.
pub fn rejection(id: &str, outcome: &EditOutcome) -> Option<CliError> {
    let error = match outcome {
        EditOutcome::Updated(_) => return None,
        EditOutcome::Failed(err) => CliError::from_code(err.code(), err.to_string()),
        EditOutcome::Ignored(IgnoreReason::PolicyDenied) => CliError::from_code(
            ErrorCode::PermissionDenied,
            format!("not allowed to edit '{id}'"),
        ),
        EditOutcome::Ignored(IgnoreReason::UnknownIssue) => {
            CliError::from_code(ErrorCode::IssueNotFound, format!("issue '{id}' not found"))
        }
        EditOutcome::Ignored(IgnoreReason::InvalidTransition(invalid)) => {
            CliError::from_code(ErrorCode::InvalidStateTransition, invalid.to_string())
        }
    };
    Some(error)
}

/// Execute `lanes edit <id>`.
///
/// # Errors
///
/// Returns an error if the issues file cannot be read, the edit is
/// rejected, or output rendering fails.
pub fn run_edit(args: &EditArgs, ctx: &Context) -> anyhow::Result<()> {
    let update = args.update();
    if update.is_empty() {
        render_error(
            ctx.output,
            &CliError {
                message: "nothing to edit".to_string(),
                suggestion: Some("pass at least one field flag, e.g. --title".to_string()),
                error_code: None,
            },
        )?;
        anyhow::bail!("nothing to edit");
    }

    let mut store = ctx.load_store()?;
    let outcome = store.request_edit(&args.id, &update, ctx.actor.can_edit_issues());
    if let Some(error) = rejection(&args.id, &outcome) {
        render_error(ctx.output, &error)?;
        anyhow::bail!("{}", error.message);
    }
    let EditOutcome::Updated(issue) = outcome else {
        return Ok(());
    };
    render_issue(&issue, store.clock().now(), ctx.output)
}
