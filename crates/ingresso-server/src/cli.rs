use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ingresso")]
#[command(author, version, about = "Now-playing movies from Ingresso.com")]
pub struct Cli {
    /// Directory holding ingresso.yaml and .storage/
    #[arg(short, long, global = true, env = "INGRESSO_CONFIG_DIR", default_value = ".")]
    pub config_dir: PathBuf,

    /// Override the content API root
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a city/theater through the interactive wizard
    Setup,

    /// Pick a new city/theater for an existing entry
    Reconfigure {
        /// Entry to reconfigure
        entry_id: String,
    },

    /// List configured entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an entry
    Remove {
        /// Entry to delete
        entry_id: String,
    },

    /// Poll every entry once and print the sensor states
    Update {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll every entry on the scan interval until interrupted
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reconfigure() {
        let cli = Cli::try_parse_from(["ingresso", "--config-dir", "/tmp/ha", "reconfigure", "01abc"])
            .unwrap();
        assert_eq!(cli.config_dir, PathBuf::from("/tmp/ha"));
        assert!(matches!(cli.command, Commands::Reconfigure { ref entry_id } if entry_id == "01abc"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ingresso", "list", "--json", "--base-url", "http://localhost:8080"])
            .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080"));
        assert!(matches!(cli.command, Commands::List { json: true }));
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["ingresso"]).is_err());
        assert!(Cli::try_parse_from(["ingresso", "remove"]).is_err());
    }
}
