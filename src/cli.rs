//! CLI argument parsing using clap v4

use clap::{Parser, Subcommand};

/// transcribe4all - audio transcription job service
///
/// Accepts audio URLs over HTTP, prepares them for speech-to-text in the
/// background and reports each job's status.
#[derive(Parser, Debug)]
#[command(name = "transcribe4all")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(short, long, env = "TRANSCRIBE_CONFIG")]
        config: Option<String>,

        /// Port to listen on (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["transcribe4all", "serve"]);
        match cli.command {
            Commands::Serve { port, .. } => assert!(port.is_none()),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_serve_with_options() {
        let cli = Cli::parse_from([
            "transcribe4all",
            "serve",
            "--config",
            "/etc/transcribe4all.toml",
            "--port",
            "9090",
        ]);
        match cli.command {
            Commands::Serve { config, port } => {
                assert_eq!(config, Some("/etc/transcribe4all.toml".to_string()));
                assert_eq!(port, Some(9090));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["transcribe4all", "serve", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["transcribe4all", "-vv", "serve"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag_after_subcommand() {
        let cli = Cli::parse_from(["transcribe4all", "config", "show", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["transcribe4all", "config", "init", "--force"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Init { path, force } } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_config_validate() {
        let cli = Cli::parse_from(["transcribe4all", "config", "validate", "-c", "x.toml"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Validate { config } } => {
                assert_eq!(config, Some("x.toml".to_string()));
            }
            _ => panic!("Expected Config Validate command"),
        }
    }
}
