//! `lanes board`: the three workflow columns.

use crate::cmd::Context;
use crate::cmd::list::{FilterArgs, ListRow};
use crate::output::{OutputMode, pretty_rule, pretty_section, render_mode};
use clap::Args;
use lanes_core::clock::Clock;
use lanes_core::model::Status;
use lanes_triage::view::{Board, StoreView};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct BoardArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: Status,
    pub count: usize,
    pub issues: Vec<ListRow>,
}

#[derive(Debug, Serialize)]
pub struct BoardOutput {
    pub total: usize,
    pub columns: Vec<BoardColumn>,
}

impl BoardOutput {
    pub fn new(board: &Board, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            total: board.total(),
            columns: board
                .columns
                .iter()
                .map(|column| BoardColumn {
                    status: column.status,
                    count: column.issues.len(),
                    issues: column
                        .issues
                        .iter()
                        .map(|issue| ListRow::new(issue, now))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Write the board as column sections.
pub fn write_board_pretty(board: &BoardOutput, w: &mut dyn Write) -> io::Result<()> {
    for column in &board.columns {
        pretty_section(w, &format!("{} ({})", column.status, column.count))?;
        if column.issues.is_empty() {
            writeln!(w, "  (empty)")?;
        }
        for row in &column.issues {
            writeln!(w, "  {:<12} sev {:>2}  {}", row.id, row.severity.get(), row.title)?;
        }
        writeln!(w)?;
    }
    pretty_rule(w)?;
    writeln!(w, "{} issues", board.total)
}

/// Write the board as `status<TAB>id<TAB>title` rows.
pub fn write_board_text(board: &BoardOutput, w: &mut dyn Write) -> io::Result<()> {
    for column in &board.columns {
        for row in &column.issues {
            writeln!(w, "{}\t{}\t{}", column.status, row.id, row.title)?;
        }
    }
    Ok(())
}

/// Render a board in `output` mode.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn render_board(board: &BoardOutput, output: OutputMode) -> anyhow::Result<()> {
    render_mode(
        output,
        board,
        |board, w| write_board_text(board, w),
        |board, w| write_board_pretty(board, w),
    )
}

/// Execute `lanes board`.
///
/// # Errors
///
/// Returns an error if the issues file cannot be read or output fails.
pub fn run_board(args: &BoardArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.load_store()?;
    let board = store.board(&args.filter.criteria(), args.filter.sort);
    render_board(&BoardOutput::new(&board, store.clock().now()), ctx.output)
}
