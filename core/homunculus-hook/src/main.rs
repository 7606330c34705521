//! homunculus: hook handler and command-line front end.
//!
//! Called by Claude Code hooks configured in ~/.claude/settings.json and
//! directly by the user.
//!
//! ## Subcommands
//!
//! - `observe pre|post`: record a tool-use event (payload on stdin, passed through)
//! - `observer`: control the background analysis loop
//! - `suggest-compact`, `check-console-log`, `session-start`,
//!   `summarize-session`, `evaluate-session`: lifecycle hooks
//! - `sessions`, `alias`, `pm`, `instincts`: user commands

mod aliases;
mod hooks;
mod instincts;
mod logging;
mod observer;
mod pm;
mod sessions;

use clap::{Parser, Subcommand, ValueEnum};
use homunculus_core::{ClaudeCli, HookEnv, HookPhase, LearningConfig, StorageConfig};
use std::io::{self, Read, Write};

#[derive(Parser)]
#[command(name = "homunculus")]
#[command(about = "Session bookkeeping and continuous learning for Claude Code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a tool-use event (reads JSON from stdin and echoes it)
    Observe {
        #[arg(value_enum)]
        phase: PhaseArg,
    },

    /// Background observer that turns observations into instincts
    Observer {
        #[command(subcommand)]
        command: ObserverCommand,
    },

    /// Count tool calls and suggest /compact at intervals
    SuggestCompact,

    /// Warn about console.log in modified files (stdin is passed through)
    CheckConsoleLog,

    /// Report recent sessions, aliases and the package manager
    SessionStart,

    /// Summarize the transcript into the latest session file
    SummarizeSession,

    /// Flag long sessions for skill extraction
    EvaluateSession,

    /// Session records
    Sessions {
        #[command(subcommand)]
        command: sessions::SessionsCommand,
    },

    /// Session aliases
    Alias {
        #[command(subcommand)]
        command: aliases::AliasCommand,
    },

    /// Package manager detection and preferences
    Pm {
        #[command(subcommand)]
        command: pm::PmCommand,
    },

    /// Learned instincts
    Instincts {
        #[command(subcommand)]
        command: instincts::InstinctsCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    Pre,
    Post,
}

impl From<PhaseArg> for HookPhase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Pre => HookPhase::Pre,
            PhaseArg::Post => HookPhase::Post,
        }
    }
}

#[derive(Subcommand)]
enum ObserverCommand {
    /// Start the observer in the background
    Start,
    /// Stop a running observer
    Stop,
    /// Show observer status
    Status,
    /// Run one analysis now (foreground)
    Analyze,
    /// Regenerate .claude/instincts.md from current instincts
    Sync,
    /// Loop body (spawned by `start`)
    #[command(name = "__loop", hide = true)]
    Loop,
}

/// Settings shared by every command, built once in `main`.
pub(crate) struct Context {
    pub(crate) storage: StorageConfig,
    pub(crate) env: HookEnv,
    pub(crate) learning: LearningConfig,
}

impl Context {
    fn discover() -> Result<Self, String> {
        let storage = StorageConfig::discover().map_err(String::from)?;
        let learning = LearningConfig::load(&storage.learning_config_file());
        Ok(Self {
            storage,
            env: HookEnv::from_env(),
            learning,
        })
    }
}

fn uses_observer_log(command: &Commands) -> bool {
    matches!(command, Commands::Observer { .. } | Commands::SummarizeSession)
}

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::discover() {
        Ok(ctx) => ctx,
        Err(e) => {
            let _logging_guard = logging::init(None);
            tracing::error!(error = %e, "homunculus cannot resolve its storage paths");
            if matches!(cli.command, Commands::Observe { .. } | Commands::CheckConsoleLog) {
                pass_through(&read_stdin());
            }
            std::process::exit(if is_hook(&cli.command) { 0 } else { 1 });
        }
    };

    let observer_log = ctx.storage.observer_log_file();
    let _logging_guard =
        logging::init(uses_observer_log(&cli.command).then_some(observer_log.as_path()));

    if let Err(e) = dispatch(&ctx, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Hooks must never fail the host, so they exit 0 even on setup errors.
fn is_hook(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Observe { .. }
            | Commands::SuggestCompact
            | Commands::CheckConsoleLog
            | Commands::SessionStart
            | Commands::SummarizeSession
            | Commands::EvaluateSession
    )
}

fn dispatch(ctx: &Context, command: Commands) -> Result<(), String> {
    match command {
        Commands::Observe { phase } => {
            let payload = read_stdin();
            pass_through(&payload);
            hooks::observe(ctx, phase.into(), &String::from_utf8_lossy(&payload));
        }
        Commands::Observer { command } => match command {
            ObserverCommand::Start => observer::start(ctx)?,
            ObserverCommand::Stop => observer::stop(ctx)?,
            ObserverCommand::Status => observer::status(ctx),
            ObserverCommand::Analyze => observer::analyze(ctx)?,
            ObserverCommand::Sync => observer::sync(ctx)?,
            ObserverCommand::Loop => observer::run_loop(ctx)?,
        },
        Commands::SuggestCompact => hooks::suggest_compact(ctx, &mut io::stderr()),
        Commands::CheckConsoleLog => {
            let payload = read_stdin();
            hooks::check_console_log(ctx, &mut io::stderr());
            pass_through(&payload);
        }
        Commands::SessionStart => hooks::session_start(ctx, &mut io::stderr()),
        Commands::SummarizeSession => {
            let tool = ClaudeCli::new(ctx.learning.analyzer_binary.clone());
            hooks::summarize_session(ctx, &tool);
        }
        Commands::EvaluateSession => hooks::evaluate_session(ctx, &mut io::stderr()),
        Commands::Sessions { command } => sessions::run(ctx, command)?,
        Commands::Alias { command } => aliases::run(ctx, command)?,
        Commands::Pm { command } => pm::run(ctx, command)?,
        Commands::Instincts { command } => instincts::run(ctx, command)?,
    }
    Ok(())
}

/// Raw stdin bytes; the payload is not required to be UTF-8.
fn read_stdin() -> Vec<u8> {
    let mut input = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut input) {
        tracing::warn!(error = %e, "Failed to read stdin");
    }
    input
}

/// Echoes the hook payload unchanged.
fn pass_through(payload: &[u8]) {
    let mut stdout = io::stdout().lock();
    let _ = stdout.write_all(payload);
    let _ = stdout.flush();
}
