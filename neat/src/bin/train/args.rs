use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "NEAT Trainer")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = "0.1.0")]
pub struct Args {
    /// TOML file with run parameters. Missing keys keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for checkpoints, best genomes and statistics.
    /// Defaults to runs/<timestamp>.
    #[arg(long)]
    pub run_dir: Option<PathBuf>,

    /// Parameter override as section.key=value, e.g. mcts.exploration=1.2.
    #[arg(long = "set", value_name = "SECTION.KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Worker threads for game play. Defaults to run.threads or every core.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Overrides run.generations.
    #[arg(long)]
    pub generations: Option<u32>,

    /// Continue from the latest checkpoint in --run-dir.
    #[arg(long, default_value_t = false, requires = "run_dir")]
    pub resume: bool,

    /// Print every parameter accepted by --set and exit.
    #[arg(long, default_value_t = false)]
    pub list_params: bool,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
