//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dealbot")]
#[command(about = "Dealbot - a price-negotiating sales assistant", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP negotiation server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the config file
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Negotiate interactively in the terminal
    Chat {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Serve { config, .. } | Commands::Chat { config } | Commands::Config { config } => {
                config.as_ref()
            }
        }
    }
}
