//! `lanes recent`: issues viewed most recently with `lanes show`.

use crate::cmd::Context;
use crate::output::{Renderable, render_list};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use lanes_core::recent::RecentEntry;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct RecentArgs {
    /// Forget every recently accessed issue.
    #[arg(long)]
    pub clear: bool,
}

struct RecentRow<'a>(&'a RecentEntry);

impl RecentRow<'_> {
    fn accessed_local(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.0.accessed_at).map_or_else(
            || self.0.accessed_at.to_string(),
            |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        )
    }
}

impl Renderable for RecentRow<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{:<12} {}  {}", self.0.id, self.accessed_local(), self.0.title)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self.0)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}", self.0.id, self.0.accessed_at, self.0.title)
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "ACCESSED_AT", "TITLE"]
    }
}

/// Execute `lanes recent`.
///
/// # Errors
///
/// Returns an error if output rendering fails.
pub fn run_recent(args: &RecentArgs, ctx: &Context) -> anyhow::Result<()> {
    let Some(mut recent) = ctx.recent() else {
        tracing::warn!("no state location available; recently accessed list is empty");
        render_list::<RecentRow<'_>>(&[], ctx.output)?;
        return Ok(());
    };

    if args.clear {
        recent.clear();
        if !ctx.output.is_json() {
            println!("Cleared recently accessed issues");
            return Ok(());
        }
    }

    let rows: Vec<RecentRow<'_>> = recent.entries().iter().map(RecentRow).collect();
    if rows.is_empty() && !ctx.output.is_json() {
        println!("No recently accessed issues");
        return Ok(());
    }
    render_list(&rows, ctx.output)?;
    Ok(())
}
