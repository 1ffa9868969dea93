use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "gitpulse")]
#[command(version)]
#[command(about = "Passive terminal dashboard for the push/pull/dirty status of your git repositories")]
pub struct CliArgs {
    /// Repository, or directory of repositories, to watch (default: current directory)
    pub path: Option<PathBuf>,

    /// How many directory levels below PATH to look for repositories (overrides config)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Path to configuration file (.json, or .toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
