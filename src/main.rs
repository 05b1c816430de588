use anyhow::Result;
use clap::Parser;

use adguard_dns_switch::config::{CliArgs, Command, Config, LogFormat};
use adguard_dns_switch::ProtectionSwitch;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = Config::load(&args)?;

    init_tracing(&config);

    tracing::info!(name = %config.name, "AdGuard DNS switch starting");
    tracing::debug!(config = ?config, "Configuration loaded");

    let switch = ProtectionSwitch::from_config(&config)?;

    run(&switch, &args.command).await.map_err(|e| {
        tracing::error!(error = %e, "Operation failed");
        anyhow::Error::new(e)
    })
}

/// Initialize logging with the configured level; RUST_LOG overrides it
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.effective_log_level()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Run one switch operation and print its outcome.
///
/// The CLI performs a single operation per process, so it neither spawns
/// `spawn_initial_authentication` nor goes through the `handle_get` /
/// `handle_set` callbacks; those serve long-running hosts. The operation's own
/// `ensure_valid` call authenticates on first use.
async fn run(switch: &ProtectionSwitch, command: &Command) -> adguard_dns_switch::error::Result<()> {
    match command {
        Command::Get => {
            let enabled = switch.current_state().await?;
            println!("{}", on_off(enabled));
        }
        Command::Set { state } => {
            switch.apply_state(state.as_bool()).await?;
            println!("{}", on_off(state.as_bool()));
        }
        Command::Toggle => {
            let enabled = switch.toggle().await?;
            println!("{}", on_off(enabled));
        }
        Command::Status => {
            let enabled = switch.current_state().await?;
            println!("name:            {}", switch.name());
            println!("dns server:      {}", switch.dns_server_id());
            println!("protection:      {}", on_off(enabled));
            match switch.token_expires_at().await {
                Some(expires_at) => println!("token expires:   {}", expires_at.to_rfc3339()),
                None => println!("token expires:   -"),
            }
        }
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
