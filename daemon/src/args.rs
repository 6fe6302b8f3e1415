use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, action(ArgAction::Count))]
    pub verbose: u8,
    /// Load and print a config
    #[arg(long)]
    pub check_config: bool,
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Jenkins url to poll
    #[arg(short = 'H', long, env = "NODELOG_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Path to the sqlite database
    #[arg(long, env = "NODELOG_STORE")]
    pub store: Option<PathBuf>,
    /// Refresh once and exit
    #[arg(long)]
    pub once: bool,
    /// Also overwrite builds that are already stored
    #[arg(long)]
    pub update: bool,
}
