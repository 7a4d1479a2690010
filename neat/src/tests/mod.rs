mod evolution_tests;
mod training_tests;

use std::{cell::RefCell, rc::Rc};

use cozy_chess::Board;

use crate::{
    encoding::encode_board,
    error::NeatError,
    fitness::{FitnessFunction, FitnessPass},
    genome::Genome,
    network::{Network, NetworkKind},
    population::PopulationState,
    reporter::{GenerationReport, Reporter},
};

/// Scores a genome by its raw output on the starting position.
pub(crate) struct OutputFitness;

impl FitnessFunction for OutputFitness {
    fn evaluate(&mut self, genomes: &[Genome], _generation: u32) -> Result<FitnessPass, NeatError> {
        let inputs = encode_board(&Board::default());
        let fitness = genomes
            .iter()
            .map(|genome| -> Result<f64, NeatError> {
                let mut network = Network::from_genome(genome, NetworkKind::FeedForward)?;
                Ok(network.activate(&inputs)?[0] as f64)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FitnessPass {
            fitness,
            matches: Vec::new(),
        })
    }
}

#[derive(Default)]
pub(crate) struct Recorded {
    pub reports: Vec<GenerationReport>,
    pub states: Vec<PopulationState>,
}

/// Keeps every report for inspection after a run.
pub(crate) struct RecordingReporter(pub Rc<RefCell<Recorded>>);

impl Reporter for RecordingReporter {
    fn post_evaluate(&mut self, report: &GenerationReport) -> Result<(), NeatError> {
        self.0.borrow_mut().reports.push(report.clone());
        Ok(())
    }

    fn end_generation(&mut self, state: &PopulationState) -> Result<(), NeatError> {
        self.0.borrow_mut().states.push(state.clone());
        Ok(())
    }
}
