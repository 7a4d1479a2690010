mod args;
mod engine;

use args::{Args, Command};
use clap::Parser;
use cozy_chess::Board;
use evaluation::MaterialEvaluator;
use log::LevelFilter;
use neat::{config::FitnessConfig, fitness::play_game};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use search::MctsConfig;
use simplelog::{CombinedLogger, Config, SharedLogger, SimpleLogger, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::path::Path;
use utils::move_to_uci;

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;
    let config = engine::mcts_config(&args.overrides)?;

    match &args.command {
        Command::Analyse {
            fen,
            genome,
            budget,
            recurrent_steps,
        } => analyse(fen, genome.as_deref(), *budget, *recurrent_steps, config),
        Command::Play {
            genome,
            budget,
            max_plies,
            black,
            recurrent_steps,
        } => play(genome, *budget, *max_plies, *black, *recurrent_steps, config),
    }
}

fn analyse(
    fen: &str,
    genome: Option<&Path>,
    budget: u32,
    recurrent_steps: usize,
    config: MctsConfig,
) -> Result<(), Box<dyn Error>> {
    let board: Board = fen
        .parse()
        .map_err(|e| format!("Invalid FEN '{}': {:?}", fen, e))?;

    let evaluator = engine::create_evaluator(genome, recurrent_steps)?;
    let mut player = engine::create(config, evaluator, budget);

    println!("evaluator: {}", player.name());
    println!("static:    {:+.4}", player.evaluate(&board));

    let Some(best_move) = player.current_best_move(&board)? else {
        println!("game over");
        return Ok(());
    };

    if let Some(report) = player.last_report() {
        println!(
            "bestmove:  {} value {:+.4} ({} iterations, {} root visits)",
            move_to_uci(&board, best_move),
            report.value,
            report.iterations,
            report.root_visits
        );
    }

    let mut children = player.root_statistics();
    children.sort_by(|a, b| b.visits.cmp(&a.visits));
    for child in children {
        println!(
            "  {:<6} visits {:>7}  mean {}",
            move_to_uci(&board, child.mv),
            child.visits,
            child
                .mean_value
                .map_or("-".to_string(), |v| format!("{:+.4}", v))
        );
    }

    Ok(())
}

fn play(
    genome: &Path,
    budget: u32,
    max_plies: usize,
    black: bool,
    recurrent_steps: usize,
    config: MctsConfig,
) -> Result<(), Box<dyn Error>> {
    let network = engine::create_evaluator(Some(genome), recurrent_steps)?;
    let baseline = Box::new(MaterialEvaluator::default());

    let mut fitness = FitnessConfig::default();
    fitness.set("move_budget", &budget.to_string())?;
    fitness.set("max_plies", &max_plies.to_string())?;
    fitness.set("random_opening_plies", "0")?;

    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let game = if black {
        play_game(baseline, network, &config, &fitness, &mut rng)
    } else {
        play_game(network, baseline, &config, &fitness, &mut rng)
    };

    for (i, pair) in game.moves.chunks(2).enumerate() {
        println!("{:>3}. {}", i + 1, pair.join(" "));
    }
    println!("{} ({:?})", game.result, game.termination);

    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    CombinedLogger::init(loggers(args.log_file.as_deref())?)?;

    Ok(args)
}

/// Console output at info, plus a debug log file when one is requested.
fn loggers(log_file: Option<&Path>) -> Result<Vec<Box<dyn SharedLogger>>, std::io::Error> {
    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![SimpleLogger::new(LevelFilter::Info, Config::default())];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            Config::default(),
            File::create(path)?,
        ));
    }
    Ok(loggers)
}
