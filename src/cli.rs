use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::decision::SpeedMode;

#[derive(Parser)]
#[command(version = env!("APP_VERSION"), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Engine configuration file (TOML). Defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick a move for the position after MOVES (UCI, from the initial position)
    Decide {
        /// Think-time mode: fast (bullet) or normal (rapid)
        #[arg(short, long, default_value_t = SpeedMode::Normal)]
        mode: SpeedMode,
        moves: Vec<String>,
    },

    /// Print the encoded color, token and theory sequences for MOVES
    Encode { moves: Vec<String> },

    /// Write the default configuration to PATH
    InitConfig {
        #[arg(default_value = "teoriat.toml")]
        path: PathBuf,
    },

    /// Speak UCI on stdin/stdout
    Headless,
}
