use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "neatchess")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Write debug logging to a file.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// MCTS parameter override as key=value, e.g. exploration=1.2.
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search a position and print the chosen move with root statistics.
    Analyse {
        #[arg(long, default_value = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")]
        fen: String,

        /// Genome JSON to evaluate with. The material baseline is used without one.
        #[arg(long)]
        genome: Option<PathBuf>,

        #[arg(long, default_value_t = 10_000)]
        budget: u32,

        /// Update steps for genomes with recurrent connections.
        #[arg(long, default_value_t = 3)]
        recurrent_steps: usize,
    },

    /// Play a genome against the material baseline from the starting position.
    Play {
        #[arg(long)]
        genome: PathBuf,

        #[arg(long, default_value_t = 800)]
        budget: u32,

        #[arg(long, default_value_t = 200)]
        max_plies: usize,

        /// Let the genome play black.
        #[arg(long, default_value_t = false)]
        black: bool,

        #[arg(long, default_value_t = 3)]
        recurrent_steps: usize,
    },
}
