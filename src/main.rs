use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use worktree_mux::commands::{self, RepoContext};
use worktree_mux::config::Config;
use worktree_mux::logging;
use worktree_mux::tmux::LocalTmux;

/// Manage tmux windows for the git worktrees under `.worktrees/`.
#[derive(Parser, Debug)]
#[command(name = "worktree-mux", version = env!("WORKTREE_MUX_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List worktrees and their tmux window status (default).
    Ls {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Switch to a worktree's window, creating it if needed.
    ///
    /// Without a name, switches to the `main` window at the repository root.
    Cd {
        /// Exact path (`feature/auth`), leaf (`auth`) or unique substring.
        name: Option<String>,
    },
    /// Live dashboard of every worktree.
    Dash,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Command::Ls { json: false })) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    // The dashboard owns the terminal; keep the guard alive until it exits.
    let _log_guard = match command {
        Command::Dash => Some(logging::init_file()?),
        _ => {
            logging::init_stderr();
            None
        }
    };

    let config = Config::load();
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let ctx = RepoContext::discover(&cwd, &config)?;
    let mux = LocalTmux::new();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();

    match command {
        Command::Ls { json } => {
            let catalog = ctx.catalog()?;
            commands::cmd_ls(
                &ctx,
                &catalog,
                &mux,
                json,
                &mut stdout.lock(),
                &mut stderr.lock(),
            )
        }
        Command::Cd { name } => {
            let catalog = ctx.catalog()?;
            commands::cmd_cd(
                &ctx,
                &catalog,
                name.as_deref(),
                &mux,
                &mut stdout.lock(),
                &mut stderr.lock(),
            )?;
            Ok(())
        }
        Command::Dash => commands::cmd_dash(&ctx, &config, &mux),
    }
}
