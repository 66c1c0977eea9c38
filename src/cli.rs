//! Command-line interface definitions using clap

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::StaticConfig;

/// URL shortener service
#[derive(Parser, Debug)]
#[command(name = "url-shortener")]
#[command(version)]
#[command(about = "A URL shortener with pluggable storage", long_about = None)]
pub struct Cli {
    /// Path of the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Listen address (host:port)
    #[arg(long, short = 'a')]
    pub address: Option<String>,

    /// Prefix of returned short URLs
    #[arg(long, short = 'b')]
    pub base_url: Option<String>,

    /// Append-only log file, selects the file backend
    #[arg(long = "file-storage-path", short = 'f')]
    pub file_storage_path: Option<String>,

    /// Database DSN, selects the database backend
    #[arg(long = "database-dsn", short = 'd')]
    pub database_dsn: Option<String>,

    /// Log level or filter directive
    #[arg(long, short = 'l')]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        output_path: Option<String>,

        /// Force overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Apply command-line flags on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut StaticConfig) -> Result<()> {
        if let Some(address) = &self.address {
            let (host, port) = parse_address(address)?;
            config.server.host = host;
            config.server.port = port;
        }
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(path) = &self.file_storage_path {
            config.storage.file_path = Some(path.clone());
        }
        if let Some(dsn) = &self.database_dsn {
            config.storage.database_url = Some(dsn.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        Ok(())
    }
}

/// Split `host:port`. An empty host means all interfaces.
fn parse_address(address: &str) -> Result<(String, u16)> {
    let Some((host, port)) = address.rsplit_once(':') else {
        bail!("Invalid address '{}', expected host:port", address);
    };
    let port = port
        .parse::<u16>()
        .with_context(|| format!("Invalid port in address '{}'", address))?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "url-shortener",
            "-a",
            "127.0.0.1:9000",
            "-b",
            "http://short.example",
            "-d",
            "sqlite://data.db?mode=rwc",
        ])
        .unwrap();

        let mut config = StaticConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.base_url, "http://short.example");
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("sqlite://data.db?mode=rwc")
        );
        assert!(config.storage.file_path.is_none());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address(":8080").unwrap(),
            ("0.0.0.0".to_string(), 8080)
        );
        assert!(parse_address("localhost").is_err());
        assert!(parse_address("localhost:http").is_err());
    }

    #[test]
    fn test_generate_config_subcommand() {
        let cli = Cli::try_parse_from(["url-shortener", "generate-config", "out.toml"]).unwrap();
        match cli.command {
            Some(Commands::GenerateConfig { output_path, force }) => {
                assert_eq!(output_path.as_deref(), Some("out.toml"));
                assert!(!force);
            }
            None => panic!("expected subcommand"),
        }
    }
}
