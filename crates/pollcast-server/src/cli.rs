use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pollcast-server", version, about = "Poll BFF and realtime gateway")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "POLLCAST_CONFIG", default_value = "pollcast.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, env = "POLLCAST_LOG_JSON")]
    pub log_json: bool,
}
