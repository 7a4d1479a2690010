// Score bounds for value evaluation, always from the side to move's perspective.
pub const WIN_VALUE: f32 = 1.0;
pub const LOSS_VALUE: f32 = -1.0;
pub const DRAW_VALUE: f32 = 0.0;

/// Clamps an evaluation into the valid score range. NaN maps to a draw.
#[inline(always)]
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        DRAW_VALUE
    } else {
        score.clamp(LOSS_VALUE, WIN_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(3.0), WIN_VALUE);
        assert_eq!(clamp_score(-3.0), LOSS_VALUE);
        assert_eq!(clamp_score(0.25), 0.25);
        assert_eq!(clamp_score(f32::NAN), DRAW_VALUE);
    }
}
