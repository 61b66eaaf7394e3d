//! Fusion strategies.

use crate::core::errors::MaterialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule combining several sources' probabilities for the same pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FusionStrategy {
    /// Elementwise maximum per (pixel, class) across sources.
    #[default]
    #[serde(rename = "max_prob")]
    MaxProbability,
    /// Arithmetic mean over the sources covering each pixel.
    #[serde(rename = "mean_prob")]
    Mean,
    /// Each source votes for its argmax class, weighted by that class's
    /// probability; votes are normalised per pixel.
    #[serde(rename = "weighted_vote")]
    WeightedVote,
}

impl FusionStrategy {
    pub const ALL: [FusionStrategy; 3] = [Self::MaxProbability, Self::Mean, Self::WeightedVote];

    /// Name used on the command line and in output file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaxProbability => "max_prob",
            Self::Mean => "mean_prob",
            Self::WeightedVote => "weighted_vote",
        }
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FusionStrategy {
    type Err = MaterialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                MaterialError::config_error_with_context(
                    "strategy",
                    s,
                    "expected one of max_prob, mean_prob, weighted_vote",
                )
            })
    }
}
