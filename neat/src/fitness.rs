use std::fmt;

use ahash::AHashMap;
use cozy_chess::{Board, Color};
use evaluation::{material_balance, Evaluator, MaterialEvaluator, PieceValues};
use indicatif::ProgressBar;
use rand::{seq::SliceRandom, Rng};
use rayon::prelude::*;
use search::{ChessOracle, MctsConfig, Oracle, Outcome, Player};
use serde::{Deserialize, Serialize};
use utils::{collect_legal_moves, line_to_uci, only_move};

use crate::{
    config::{FitnessConfig, Opponent, RunConfig},
    context::{match_rng, schedule_rng},
    error::NeatError,
    evaluator::{network_kind, NetworkEvaluator},
    genome::Genome,
    network::NetworkKind,
};

/// Centipawn scale of the material tie-break.
const MATERIAL_SCALE: f64 = 400.0;

/// Scores every genome of a generation.
pub trait FitnessFunction {
    fn evaluate(&mut self, genomes: &[Genome], generation: u32) -> Result<FitnessPass, NeatError>;
}

/// Fitness per genome, indexed like the input, plus the games that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitnessPass {
    pub fitness: Vec<f64>,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerId {
    Genome(u64),
    /// The reigning self-play champion, by genome key.
    Champion(u64),
    Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::WhiteWins => write!(f, "1-0"),
            GameResult::BlackWins => write!(f, "0-1"),
            GameResult::Draw => write!(f, "1/2-1/2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameTermination {
    Checkmate,
    /// Stalemate, fifty-move rule or insufficient material.
    DrawnPosition,
    Repetition,
    /// Adjudicated at the ply limit.
    PlyLimit,
    /// The side to move failed to produce a move and forfeits.
    SearchFailure,
}

/// One finished training game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub generation: u32,
    pub white: PlayerId,
    pub black: PlayerId,
    /// Moves in UCI notation.
    pub moves: Vec<String>,
    pub result: GameResult,
    pub termination: GameTermination,
    pub white_reward: f64,
    pub black_reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Genome(usize),
    /// The champion network, or material play before one exists.
    Champion,
    Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pairing {
    white: Side,
    black: Side,
}

/// Fitness from MCTS games between networks.
///
/// Self-play pits every genome against the fittest genome seen by earlier
/// passes, so only the genome's own side is credited.
pub struct GameFitness {
    config: FitnessConfig,
    mcts: MctsConfig,
    kind: NetworkKind,
    seed: u64,
    champion: Option<Genome>,
    progress: Option<ProgressBar>,
}

impl GameFitness {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            config: config.fitness.clone(),
            mcts: config.mcts.clone(),
            kind: network_kind(config.genome.allow_recurrent, config.genome.recurrent_steps),
            seed: config.run.seed,
            champion: None,
            progress: None,
        }
    }

    /// Seeds the self-play champion, e.g. with the best genome of a resumed run.
    pub fn with_champion(mut self, champion: Option<Genome>) -> Self {
        self.champion = champion;
        self
    }

    pub fn champion(&self) -> Option<&Genome> {
        self.champion.as_ref()
    }

    /// Ticks `bar` once per finished game.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn games_per_generation(&self, population: usize) -> usize {
        population * self.config.games_per_genome
    }

    fn schedule(&self, population: usize, generation: u32) -> Vec<Pairing> {
        let mut rng = schedule_rng(self.seed, generation);
        let games = self.config.games_per_genome;
        let mut pairings = Vec::with_capacity(population * games);

        for i in 0..population {
            match self.config.opponent {
                Opponent::Population => {
                    let others: Vec<usize> = (0..population).filter(|&j| j != i).collect();
                    for &j in others.choose_multiple(&mut rng, games.min(others.len())) {
                        pairings.push(Pairing {
                            white: Side::Genome(i),
                            black: Side::Genome(j),
                        });
                    }
                }
                Opponent::Material => alternate(&mut pairings, i, Side::Material, games),
                Opponent::SelfPlay => alternate(&mut pairings, i, Side::Champion, games),
            }
        }
        pairings
    }

    fn evaluator(
        &self,
        side: Side,
        networks: &[NetworkEvaluator],
        champion: Option<&NetworkEvaluator>,
    ) -> Box<dyn Evaluator<Board>> {
        match (side, champion) {
            (Side::Genome(i), _) => Box::new(networks[i].clone()),
            (Side::Champion, Some(network)) => Box::new(network.clone()),
            (Side::Champion, None) | (Side::Material, _) => Box::new(MaterialEvaluator::default()),
        }
    }

    /// Keeps the fittest genome of any pass so far; earlier champions win ties.
    fn crown(&mut self, genomes: &[Genome], fitness: &[f64]) {
        let best = fitness
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_finite())
            .fold(None, |best: Option<(usize, f64)>, (i, &f)| match best {
                Some((_, top)) if top >= f => best,
                _ => Some((i, f)),
            });

        if let Some((index, value)) = best {
            let reigning = self.champion.as_ref().and_then(|c| c.fitness);
            if reigning.map_or(true, |top| value > top) {
                let mut champion = genomes[index].clone();
                champion.fitness = Some(value);
                log::debug!("Genome {} is the new champion at {:.4}", champion.key, value);
                self.champion = Some(champion);
            }
        }
    }
}

/// `games` games for genome `i` against `opponent`, starting with white.
fn alternate(pairings: &mut Vec<Pairing>, i: usize, opponent: Side, games: usize) {
    for game in 0..games {
        pairings.push(if game % 2 == 0 {
            Pairing {
                white: Side::Genome(i),
                black: opponent,
            }
        } else {
            Pairing {
                white: opponent,
                black: Side::Genome(i),
            }
        });
    }
}

impl FitnessFunction for GameFitness {
    fn evaluate(&mut self, genomes: &[Genome], generation: u32) -> Result<FitnessPass, NeatError> {
        let networks = genomes
            .iter()
            .map(|genome| NetworkEvaluator::new(genome, self.kind))
            .collect::<Result<Vec<_>, _>>()?;
        let champion = self
            .champion
            .as_ref()
            .map(|genome| NetworkEvaluator::new(genome, self.kind))
            .transpose()?;

        let pairings = self.schedule(genomes.len(), generation);
        if let Some(bar) = &self.progress {
            bar.reset();
            bar.set_length(pairings.len() as u64);
        }

        let this = &*self;
        let games: Vec<PlayedGame> = pairings
            .par_iter()
            .enumerate()
            .map(|(index, pairing)| {
                let mut rng = match_rng(this.seed, generation, index);
                let game = play_game(
                    this.evaluator(pairing.white, &networks, champion.as_ref()),
                    this.evaluator(pairing.black, &networks, champion.as_ref()),
                    &this.mcts,
                    &this.config,
                    &mut rng,
                );
                if let Some(bar) = &this.progress {
                    bar.inc(1);
                }
                game
            })
            .collect();

        let mut totals = vec![0.0; genomes.len()];
        let mut counts = vec![0usize; genomes.len()];
        let mut matches = Vec::with_capacity(games.len());

        for (pairing, game) in pairings.iter().zip(games) {
            for (side, reward) in [
                (pairing.white, game.white_reward),
                (pairing.black, game.black_reward),
            ] {
                if let Side::Genome(i) = side {
                    totals[i] += reward;
                    counts[i] += 1;
                }
            }

            let id = |side: Side| match (side, &this.champion) {
                (Side::Genome(i), _) => PlayerId::Genome(genomes[i].key),
                (Side::Champion, Some(genome)) => PlayerId::Champion(genome.key),
                (Side::Champion, None) | (Side::Material, _) => PlayerId::Material,
            };
            matches.push(MatchRecord {
                generation,
                white: id(pairing.white),
                black: id(pairing.black),
                moves: game.moves,
                result: game.result,
                termination: game.termination,
                white_reward: game.white_reward,
                black_reward: game.black_reward,
            });
        }

        let fitness: Vec<f64> = totals
            .iter()
            .zip(&counts)
            .map(|(&total, &count)| if count > 0 { total / count as f64 } else { 0.0 })
            .collect();

        if self.config.opponent == Opponent::SelfPlay {
            self.crown(genomes, &fitness);
        }
        Ok(FitnessPass { fitness, matches })
    }
}

/// A finished game with rewards already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedGame {
    pub moves: Vec<String>,
    pub result: GameResult,
    pub termination: GameTermination,
    pub white_reward: f64,
    pub black_reward: f64,
}

/// Plays one game from the standard position.
///
/// Early plies may be random with a decaying probability. A repeated position
/// or the ply limit ends the game as a draw; a search failure forfeits the game
/// for the side that was to move. Forced moves are played without a search.
pub fn play_game<W, B, R>(
    white: W,
    black: B,
    mcts: &MctsConfig,
    config: &FitnessConfig,
    rng: &mut R,
) -> PlayedGame
where
    W: Evaluator<Board>,
    B: Evaluator<Board>,
    R: Rng,
{
    let oracle = ChessOracle;
    let mut white = Player::new(oracle, mcts.clone(), white, config.move_budget);
    let mut black = Player::new(oracle, mcts.clone(), black, config.move_budget);

    let start = Board::default();
    let mut board = start.clone();
    let mut played = Vec::new();
    let mut seen: AHashMap<u64, u8> = AHashMap::new();
    seen.insert(board.hash(), 1);

    let (result, termination) = loop {
        if let Some(outcome) = oracle.outcome(&board) {
            break decided(outcome, board.side_to_move());
        }
        if played.len() >= config.max_plies {
            break (GameResult::Draw, GameTermination::PlyLimit);
        }

        let mover = board.side_to_move();
        let mv = if random_ply(played.len(), config.random_opening_plies, rng) {
            collect_legal_moves(&board).choose(rng).copied()
        } else if only_move(&board) {
            collect_legal_moves(&board).first().copied()
        } else {
            let search = match mover {
                Color::White => white.current_best_move(&board),
                Color::Black => black.current_best_move(&board),
            };
            match search {
                Ok(mv) => mv,
                Err(e) => {
                    log::warn!("Search failed after {} plies: {}", played.len(), e);
                    break (forfeit(mover), GameTermination::SearchFailure);
                }
            }
        };

        let Some(mv) = mv else {
            break (forfeit(mover), GameTermination::SearchFailure);
        };

        white.observe(mv);
        black.observe(mv);
        board.play_unchecked(mv);
        played.push(mv);

        let count = seen.entry(board.hash()).or_insert(0);
        *count += 1;
        if *count > 1 {
            break (GameResult::Draw, GameTermination::Repetition);
        }
    };

    let (white_reward, black_reward) = rewards(result, termination, &board, config);
    PlayedGame {
        moves: line_to_uci(&start, &played),
        result,
        termination,
        white_reward,
        black_reward,
    }
}

fn random_ply<R: Rng>(ply: usize, random_plies: usize, rng: &mut R) -> bool {
    if ply >= random_plies {
        return false;
    }
    let probability = 1.0 - ply as f64 / random_plies as f64;
    rng.gen_bool(probability)
}

fn decided(outcome: Outcome, to_move: Color) -> (GameResult, GameTermination) {
    match outcome {
        Outcome::Draw => (GameResult::Draw, GameTermination::DrawnPosition),
        Outcome::Loss => (forfeit(to_move), GameTermination::Checkmate),
        Outcome::Win => (forfeit(!to_move), GameTermination::Checkmate),
    }
}

/// Result when `loser` loses.
fn forfeit(loser: Color) -> GameResult {
    match loser {
        Color::White => GameResult::BlackWins,
        Color::Black => GameResult::WhiteWins,
    }
}

/// `(white, black)` rewards for a finished game.
fn rewards(
    result: GameResult,
    termination: GameTermination,
    board: &Board,
    config: &FitnessConfig,
) -> (f64, f64) {
    match result {
        GameResult::WhiteWins if termination == GameTermination::SearchFailure => {
            (config.draw_reward, config.loss_reward)
        }
        GameResult::BlackWins if termination == GameTermination::SearchFailure => {
            (config.loss_reward, config.draw_reward)
        }
        GameResult::WhiteWins => (config.win_reward, config.loss_reward),
        GameResult::BlackWins => (config.loss_reward, config.win_reward),
        GameResult::Draw if termination == GameTermination::PlyLimit => {
            let balance = material_balance(board, &PieceValues::default()) as f64;
            let white_balance = match board.side_to_move() {
                Color::White => balance,
                Color::Black => -balance,
            };
            let tie_break = config.material_weight * (white_balance / MATERIAL_SCALE).tanh();
            (config.draw_reward + tie_break, config.draw_reward - tie_break)
        }
        GameResult::Draw => (config.draw_reward, config.draw_reward),
    }
}
