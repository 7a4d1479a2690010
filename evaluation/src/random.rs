use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::Evaluator;

/// Uniformly random scores in `[-1, 1]`, reproducible from a seed.
///
/// A deliberately uninformed value function: any strength shown by a search
/// driven by it comes from terminal outcomes alone.
pub struct RandomEvaluator {
    rng: ChaCha20Rng,
}

impl RandomEvaluator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl<P> Evaluator<P> for RandomEvaluator {
    fn name(&self) -> String {
        "Random".to_string()
    }

    #[inline(always)]
    fn evaluate(&mut self, _position: &P) -> f32 {
        self.rng.gen_range(-1.0..=1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_in_range() {
        let mut evaluator = RandomEvaluator::new(7);
        for _ in 0..1000 {
            let score = Evaluator::<()>::evaluate(&mut evaluator, &());
            assert!((-1.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomEvaluator::new(42);
        let mut b = RandomEvaluator::new(42);
        for _ in 0..100 {
            assert_eq!(
                Evaluator::<()>::evaluate(&mut a, &()),
                Evaluator::<()>::evaluate(&mut b, &())
            );
        }
    }
}
