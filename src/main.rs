use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures::StreamExt;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use registry_cli::app::App;
use registry_cli::cli::{Cli, Commands, ConfigCommands};
use registry_cli::core::actions::{self, ActionReport, LifecycleAction};
use registry_cli::core::log_stream::Utf8Decoder;
use registry_cli::core::{ClientRecord, Registration, RegistryApi, RegistryClient, RegistryError};
use registry_cli::utils::{
    format_port, AppConfig, LIST_EMPTY, LIST_LOAD_FAILED, LOGS_DISABLED, LOGS_STREAM_FAILED, REGISTRY_URL_ENV,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.command.is_none())?;

    let config = AppConfig::load()?;
    let env_url = std::env::var(REGISTRY_URL_ENV).ok();
    let base_url = config.resolve_base_url(cli.url.as_deref(), env_url.as_deref());
    let log_streaming = config.log_streaming_enabled(cli.no_logs);

    // Config commands don't talk to the registry
    if let Some(Commands::Config { command }) = cli.command {
        handle_config(command, config, &base_url)?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = RegistryClient::new(&base_url)
        .with_context(|| format!("Cannot use registry URL {}", base_url))?;
    tracing::info!(url = %base_url, "using registry");

    let code = match cli.command {
        None => {
            // No command - run interactive TUI
            let mut app = App::new(Arc::new(client), &base_url, log_streaming);
            app.run().await?;
            ExitCode::SUCCESS
        }
        Some(Commands::List) => handle_list(&client).await,
        Some(Commands::Start { name }) => handle_action(&client, LifecycleAction::Start, &name).await,
        Some(Commands::Stop { name }) => handle_action(&client, LifecycleAction::Stop, &name).await,
        Some(Commands::Delete { name }) => handle_action(&client, LifecycleAction::Delete, &name).await,
        Some(Commands::Register {
            service_name,
            http_port,
            secure_port,
            host_name,
            health_path,
            info_path,
            data_center,
        }) => {
            let registration = Registration::from_fields([
                ("serviceName", service_name),
                ("healthEndpointPath", health_path),
                ("infoEndpointPath", info_path),
                ("httpPort", http_port),
                ("securePort", secure_port),
                ("hostName", host_name),
                ("dataCenterInfoName", data_center),
            ]);
            let report = actions::register_then_reload(&client, &registration).await;
            print_report(report)
        }
        Some(Commands::Logs { name }) => {
            if !log_streaming {
                eprintln!("{}", LOGS_DISABLED);
                return Ok(ExitCode::FAILURE);
            }
            handle_logs(&client, &name).await?
        }
        Some(Commands::Config { .. }) => unreachable!("handled above"),
    };

    Ok(code)
}

/// Log to stderr for CLI commands. The TUI owns the terminal, so it logs to
/// a file in the config directory instead.
fn init_tracing(tui: bool) -> Result<()> {
    let default_level = if tui { "registry_cli=info" } else { "registry_cli=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if tui {
        let path = AppConfig::config_dir()?.join("dashboard.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

fn print_clients(clients: &[ClientRecord]) {
    if clients.is_empty() {
        println!("{}", LIST_EMPTY);
        return;
    }

    println!("{:<30} {:<14} {:<8} {:<8} {:<10}", "Service", "Status", "HTTP", "HTTPS", "Lease");
    println!("{}", "-".repeat(74));

    for client in clients {
        let status = if client.running {
            client.status_label().green()
        } else {
            client.status_label().red()
        };
        let lease = client
            .lease_info
            .map(|l| format!("{}s/{}s", l.renewal_interval_in_secs, l.duration_in_secs))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<30} {:<14} {:<8} {:<8} {:<10}",
            client.service_name,
            status,
            format_port(client.http_port),
            format_port(client.secure_port),
            lease
        );
    }
}

fn print_list_error(e: &RegistryError) {
    eprintln!("{}: {}", LIST_LOAD_FAILED, e);
}

async fn handle_list(client: &RegistryClient) -> ExitCode {
    match actions::reload(client).await {
        Ok(clients) => {
            print_clients(&clients);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_list_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print the alert (if any), then the reloaded list
fn print_report(report: ActionReport) -> ExitCode {
    let failed = !report.outcome.is_success();
    if let Some(alert) = &report.outcome.alert {
        eprintln!("{}", alert.yellow().bold());
    }

    match report.clients {
        Ok(clients) => print_clients(&clients),
        Err(e) => print_list_error(&e),
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn handle_action(client: &RegistryClient, action: LifecycleAction, name: &str) -> ExitCode {
    let report = actions::run_action_then_reload(client, action, name).await;
    print_report(report)
}

async fn handle_logs(client: &RegistryClient, name: &str) -> Result<ExitCode> {
    let mut stream = match client.stream_logs(name).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{}: {}", LOGS_STREAM_FAILED, e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut decoder = Utf8Decoder::default();
    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    stdout.write_all(decoder.decode(&bytes).as_bytes()).await?;
                    stdout.flush().await?;
                }
                Some(Err(e)) => {
                    eprintln!("\n{}: {}", LOGS_STREAM_FAILED, e);
                    return Ok(ExitCode::FAILURE);
                }
                None => break,
            },
        }
    }

    stdout.write_all(decoder.finish().as_bytes()).await?;
    stdout.flush().await?;
    Ok(ExitCode::SUCCESS)
}

fn handle_config(command: ConfigCommands, mut config: AppConfig, effective_url: &str) -> Result<()> {
    match command {
        ConfigCommands::View => {
            println!("Configuration ({}):\n", AppConfig::config_path()?.display());
            println!("base_url:      {}", config.base_url.as_deref().unwrap_or("(not set)"));
            println!("effective url: {}", effective_url);
            println!("log_streaming: {}", config.log_streaming.unwrap_or(true));
        }
        ConfigCommands::SetUrl { url } => {
            RegistryClient::new(&url)?;
            config.base_url = Some(url.clone());
            config.save()?;
            println!("✓ Registry URL set to {}", url);
        }
        ConfigCommands::Logs { enabled } => {
            config.log_streaming = Some(enabled);
            config.save()?;
            println!("✓ Log viewer {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    Ok(())
}
