mod display;
mod orchestrator;
mod paths;

use clap::Parser;
use colored::Colorize;
use maestro_config::SecretsProvider;
use maestro_core::SshKeyFile;
use orchestrator::Orchestrator;
use tokio::signal::unix::{SignalKind, signal};

#[derive(Parser)]
#[command(name = "maestro")]
#[command(version)]
#[command(about = "Infrastructure orchestration for Pulumi and Ansible", long_about = None)]
struct Cli {
    /// Validate the configuration and print the resolved settings without
    /// invoking any subprocess
    #[arg(long)]
    dry_run: bool,
}

/// User-facing progress line.
fn status(message: impl AsRef<str>) {
    println!("{} {}", "[maestro]".blue().bold(), message.as_ref());
}

#[tokio::main]
async fn main() {
    // Unknown flags are a usage error with exit code 1 (clap defaults to 2);
    // --help/--version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return;
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt::init();

    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", "[maestro] Error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = maestro_config::find_config_file()?;
    status(format!(
        "Loading configuration from {}...",
        config_path.display()
    ));
    let config = maestro_config::load(&config_path)?;

    if cli.dry_run {
        status("Dry-run mode enabled. Configuration loaded:");
        display::print_config(&config);
        return Ok(());
    }

    status("Ensuring required commands exist...");
    maestro_core::process::require_commands(&["bws", "cloudflared"]).await?;

    let secrets = match config.secrets.provider {
        SecretsProvider::Bws => {
            status("Fetching secrets from Bitwarden...");
            let project_id = (!config.secrets.project_id.is_empty())
                .then_some(config.secrets.project_id.as_str());
            maestro_core::fetch_bws_secrets(project_id).await?
        }
    };

    status("Ensuring required secrets and variables exist...");
    for name in orchestrator::required_secret_names(&config) {
        secrets.require(name)?;
    }

    status("Setting up SSH key...");
    let ssh_key = SshKeyFile::materialize(secrets.require("VPS_SSH_KEY")?)?;

    let orchestrator = Orchestrator::new(&config, &secrets, &ssh_key)?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    // The key file is the one resource that must be released on every exit
    // path. Destructors do not run across `process::exit`, so the signal arms
    // remove it synchronously before exiting with the conventional codes.
    tokio::select! {
        result = orchestrator.run() => result,
        _ = sigint.recv() => {
            ssh_key.remove();
            std::process::exit(130);
        }
        _ = sigterm.recv() => {
            ssh_key.remove();
            std::process::exit(143);
        }
    }
}
