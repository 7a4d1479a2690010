// Value-function interface for position evaluation.
//
// The `evaluation` crate holds the interface plus the baseline evaluators.
// Neuroevolved networks implement it in the `neat` crate, which lets `search`
// depend only on the interface.

/// Scores a position for the side to move.
///
/// Implementations return a value in `[scores::LOSS_VALUE, scores::WIN_VALUE]`.
pub trait Evaluator<P>: Send {
    fn name(&self) -> String;
    fn evaluate(&mut self, position: &P) -> f32;
}

impl<P, E: Evaluator<P> + ?Sized> Evaluator<P> for Box<E> {
    fn name(&self) -> String {
        (**self).name()
    }

    #[inline(always)]
    fn evaluate(&mut self, position: &P) -> f32 {
        (**self).evaluate(position)
    }
}
