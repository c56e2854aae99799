/// CLI argument parsing

use clap::{Parser, Subcommand};

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Registry API base URL (overrides REGISTRY_URL and the config file)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Disable the log viewer
    #[arg(long, global = true)]
    pub no_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered clients
    List,

    /// Start a client
    Start {
        /// Service name
        name: String,
    },

    /// Stop a client
    Stop {
        /// Service name
        name: String,
    },

    /// Delete a client registration
    Delete {
        /// Service name
        name: String,
    },

    /// Register a new client
    Register {
        #[arg(long)]
        service_name: String,

        /// HTTP port (sent as given; non-numeric values are not rejected)
        #[arg(long)]
        http_port: String,

        /// HTTPS port (sent as given; non-numeric values are not rejected)
        #[arg(long)]
        secure_port: String,

        #[arg(long, default_value = "localhost")]
        host_name: String,

        #[arg(long, default_value = "/actuator/health")]
        health_path: String,

        #[arg(long, default_value = "/actuator/info")]
        info_path: String,

        #[arg(long, default_value = "MyOwn")]
        data_center: String,
    },

    /// Stream a client's logs until the registry closes the stream or Ctrl-C
    Logs {
        /// Service name
        name: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View configuration
    View,

    /// Save the registry URL
    SetUrl { url: String },

    /// Enable or disable the log viewer
    Logs {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_runs_dashboard() {
        let cli = Cli::try_parse_from(["registry-cli"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.url.is_none());
        assert!(!cli.no_logs);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["registry-cli", "start", "orders", "--url", "http://r:1"]).unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://r:1"));
        match cli.command {
            Some(Commands::Start { name }) => assert_eq!(name, "orders"),
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_register_keeps_raw_ports() {
        let cli = Cli::try_parse_from([
            "registry-cli", "register",
            "--service-name", "orders",
            "--http-port", "80x",
            "--secure-port", "abc",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Register { http_port, secure_port, host_name, .. }) => {
                assert_eq!(http_port, "80x");
                assert_eq!(secure_port, "abc");
                assert_eq!(host_name, "localhost");
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_config_logs_flag() {
        let cli = Cli::try_parse_from(["registry-cli", "config", "logs", "false"]).unwrap();
        match cli.command {
            Some(Commands::Config { command: ConfigCommands::Logs { enabled } }) => assert!(!enabled),
            _ => panic!("expected config logs"),
        }
    }
}
