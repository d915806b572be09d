#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::{Context, Overrides};
use lanes_core::policy::Role;
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lanes: kanban issue board with optimistic moves and undo",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format. `--json` wins when both are given.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this role instead of the one in the user config.
    #[arg(long, global = true)]
    role: Option<Role>,

    /// Issues file to use instead of the project's configured one.
    #[arg(long, global = true, value_name = "PATH")]
    issues: Option<PathBuf>,

    /// State file for the recently accessed list.
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            json: self.json,
            format: self.format,
            role: self.role,
            issues: self.issues.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Board",
        about = "List issues",
        long_about = "List issues, filtered and ordered. The default order is by priority score, highest first.",
        after_help = "EXAMPLES:\n    # Everything in progress, most urgent first\n    lanes list --status in-progress\n\n    # Unassigned high-priority issues, newest first\n    lanes list --assignee '' --priority high --sort created\n\n    # Emit machine-readable output\n    lanes list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Board",
        about = "Show the board columns",
        long_about = "Show issues grouped into Backlog, In Progress and Done columns.",
        after_help = "EXAMPLES:\n    # The whole board\n    lanes board\n\n    # Only issues tagged or titled 'auth'\n    lanes board -q auth"
    )]
    Board(cmd::board::BoardArgs),

    #[command(
        next_help_heading = "Board",
        about = "Show issue details",
        long_about = "Show full details of one issue and record it as recently accessed.",
        after_help = "EXAMPLES:\n    # Show an issue\n    lanes show LANE-12\n\n    # Emit machine-readable output\n    lanes show LANE-12 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Board",
        about = "List recently viewed issues",
        after_help = "EXAMPLES:\n    # Most recent first\n    lanes recent\n\n    # Forget the list\n    lanes recent --clear"
    )]
    Recent(cmd::recent::RecentArgs),

    #[command(
        next_help_heading = "Changes",
        about = "Edit issue fields",
        long_about = "Send an edit to the issues file. Status changes must follow the workflow.",
        after_help = "EXAMPLES:\n    # Retitle and reprioritize\n    lanes edit LANE-12 --title 'Fix login' --priority high\n\n    # Replace tags\n    lanes edit LANE-12 -t auth -t ui\n\n    # Unassign\n    lanes edit LANE-12 --assignee ''"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Changes",
        about = "Run a scripted board session",
        long_about = "Run moves, undos, edits, syncs and waits against a live store and report each step.",
        after_help = "EXAMPLES:\n    # Replay a script with virtual time\n    lanes session demo.lanes --virtual-clock\n\n    # From stdin\n    printf 'move LANE-1 in-progress\\nundo\\n' | lanes session --json"
    )]
    Session(cmd::session::SessionArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    lanes completions bash > ~/.local/share/bash-completion/completions/lanes"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LANES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "lanes=debug,info"
        } else {
            "lanes=info,warn"
        })
    });

    let format = env::var("LANES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let ctx = Context::load(&project_root, cli.overrides())?;
    debug!(output = ?ctx.output, "dispatching");

    match &cli.command {
        Commands::List(args) => cmd::list::run_list(args, &ctx),
        Commands::Board(args) => cmd::board::run_board(args, &ctx),
        Commands::Show(args) => cmd::show::run_show(args, &ctx),
        Commands::Recent(args) => cmd::recent::run_recent(args, &ctx),
        Commands::Edit(args) => cmd::edit::run_edit(args, &ctx),
        Commands::Session(args) => cmd::session::run_session(args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}
