//! Qualitative classification of local statistics

use std::fmt;

/// Cluster label attached to each observation in a local summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cluster {
    /// High value surrounded by high values
    HighHigh,
    /// High value surrounded by low values
    HighLow,
    /// Low value surrounded by high values
    LowHigh,
    /// Low value surrounded by low values
    LowLow,
    /// Neighborhood sum above its expectation
    HotSpot,
    /// Neighborhood sum at or below its expectation
    ColdSpot,
    /// Positive association that is neither HH nor LL
    Other,
    /// Positive association
    Positive,
    /// Negative association
    Negative,
}

impl Cluster {
    /// Moran scatterplot quadrant of a value and its spatial lag.
    ///
    /// Both inputs are deviations from the mean; zero counts as low.
    pub fn quadrant(value: f64, lag: f64) -> Self {
        match (value > 0.0, lag > 0.0) {
            (true, true) => Cluster::HighHigh,
            (true, false) => Cluster::HighLow,
            (false, true) => Cluster::LowHigh,
            (false, false) => Cluster::LowLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cluster::HighHigh => "HH",
            Cluster::HighLow => "HL",
            Cluster::LowHigh => "LH",
            Cluster::LowLow => "LL",
            Cluster::HotSpot => "H",
            Cluster::ColdSpot => "L",
            Cluster::Other => "Other",
            Cluster::Positive => "Positive",
            Cluster::Negative => "Negative",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
