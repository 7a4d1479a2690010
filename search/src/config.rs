use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utils::{
    config::Any,
    define_config, parse_param_from_str,
};

/// How the move is picked from the root once the budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSelection {
    /// Most visited root child. Stable against low-sample, high-mean outliers.
    RobustChild,
    /// Root child with the highest mean value.
    MaxMeanValue,
}

impl FromStr for MoveSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "robust_child" | "robust" => Ok(MoveSelection::RobustChild),
            "max_mean_value" | "max_mean" => Ok(MoveSelection::MaxMeanValue),
            other => Err(format!("unknown move selection policy '{}'", other)),
        }
    }
}

impl fmt::Display for MoveSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveSelection::RobustChild => write!(f, "robust_child"),
            MoveSelection::MaxMeanValue => write!(f, "max_mean_value"),
        }
    }
}

parse_param_from_str!(MoveSelection);

define_config!(
    /// Monte Carlo Tree Search parameters.
    MctsConfig {
        /// Exploration constant C in the upper confidence bound.
        (exploration: f64, "exploration", std::f64::consts::SQRT_2, 0.0..=10.0),
        (move_selection: MoveSelection, "move_selection", MoveSelection::RobustChild, Any),
        /// Keep the subtree below the committed move for the next search.
        (reuse_tree: bool, "reuse_tree", false, Any),
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use utils::ConfigError;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MctsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_set_from_string() {
        let mut config = MctsConfig::default();
        config.set("exploration", "0.7").unwrap();
        config.set("move_selection", "max_mean_value").unwrap();
        config.set("reuse_tree", "true").unwrap();

        assert_eq!(config.exploration, 0.7);
        assert_eq!(config.move_selection, MoveSelection::MaxMeanValue);
        assert!(config.reuse_tree);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut config = MctsConfig::default();
        assert!(matches!(
            config.set("exploration", "-1"),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert_eq!(config, MctsConfig::default());
    }

    #[test]
    fn test_rejects_unknown_key() {
        let mut config = MctsConfig::default();
        assert!(matches!(
            config.set("depth", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
    }
}
