//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Typing inactivity window in milliseconds
    #[arg(long)]
    pub typing_window_ms: Option<u64>,

    /// Reject registrations for identities the user directory does not know
    #[arg(long)]
    pub require_known_users: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}
