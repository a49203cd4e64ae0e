use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use overlay_cli::{commands, open_kernel, CliPaths, ConsoleNotifier};
use overlay_config::{PROFILE_DIR_ENV, STATE_DIR_ENV};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about = "Run and manage overlay actions from the terminal")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Directory holding the mode profiles
    #[arg(long, global = true, env = PROFILE_DIR_ENV)]
    profiles: Option<Utf8PathBuf>,
    /// Directory for settings, pins and the status snapshot
    #[arg(long, global = true, env = STATE_DIR_ENV)]
    state_dir: Option<Utf8PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the actions of the active mode
    List,
    /// Run an action and stream its output
    Run { id: String },
    /// Show or switch the active mode
    Mode { name: Option<String> },
    /// List the available modes
    Modes,
    Pin { id: String },
    Unpin { id: String },
    /// Move a pinned action between positions (1-based)
    Move { from: usize, to: usize },
    Pins,
    /// Check the tools the active actions depend on
    Preflight,
    /// Probe every known tool
    Status {
        #[arg(long)]
        json: bool,
        /// Print the last saved result without probing
        #[arg(long)]
        cached: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let paths = CliPaths {
        profiles: cli.profiles,
        state_dir: cli.state_dir,
    };
    let notifier = match cli.command {
        Commands::Run { .. } | Commands::Preflight => ConsoleNotifier::new(),
        _ => ConsoleNotifier::quiet(),
    };
    let mut kernel = open_kernel(&paths, notifier)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::List => commands::cmd_list(&kernel, &mut out)?,
        Commands::Run { id } => {
            drop(out);
            let code = commands::cmd_run(&mut kernel, &id).await?;
            match code {
                Some(0) => {}
                Some(code) => std::process::exit(code),
                None => std::process::exit(130),
            }
        }
        Commands::Mode { name } => commands::cmd_mode(&mut kernel, name, &mut out)?,
        Commands::Modes => commands::cmd_modes(&kernel, &mut out)?,
        Commands::Pin { id } => commands::cmd_pin(&mut kernel, &id, &mut out)?,
        Commands::Unpin { id } => commands::cmd_unpin(&mut kernel, &id, &mut out)?,
        Commands::Move { from, to } => commands::cmd_move(&mut kernel, from, to, &mut out)?,
        Commands::Pins => commands::cmd_pins(&kernel, &mut out)?,
        Commands::Preflight => {
            drop(out);
            commands::cmd_preflight(&mut kernel).await?;
        }
        Commands::Status { json, cached } => {
            commands::cmd_status(&mut kernel, json, cached, &mut out).await?
        }
    }

    Ok(())
}
