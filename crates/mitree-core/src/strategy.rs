//! Numeric and weighting strategies of the meta dataset.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// How a numeric interval becomes concrete meta row values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericStrategy {
    /// Two rows per rule, one at every interval minimum, one at every maximum.
    #[default]
    Interval,
    /// One row per rule at the interval midpoints.
    Average,
}

impl NumericStrategy {
    /// Single-letter code: `I` or `A`.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            NumericStrategy::Interval => 'I',
            NumericStrategy::Average => 'A',
        }
    }
}

impl fmt::Display for NumericStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericStrategy::Interval => write!(f, "interval"),
            NumericStrategy::Average => write!(f, "average"),
        }
    }
}

impl FromStr for NumericStrategy {
    type Err = ConfigurationError;

    /// Accepts the code or the name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i" | "interval" => Ok(NumericStrategy::Interval),
            "a" | "average" => Ok(NumericStrategy::Average),
            _ => Err(ConfigurationError::UnknownStrategy {
                kind: "numeric",
                code: s.to_string(),
            }),
        }
    }
}

/// Which rule metric weights the meta rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStrategy {
    #[default]
    Precision,
    Laplace,
    /// Rules with novelty `<= 0` are dropped.
    Novelty,
    /// Rules with satisfaction `<= 0`, or undefined, are dropped.
    Satisfaction,
}

impl WeightStrategy {
    /// Single-letter code: `P`, `L`, `N` or `S`.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            WeightStrategy::Precision => 'P',
            WeightStrategy::Laplace => 'L',
            WeightStrategy::Novelty => 'N',
            WeightStrategy::Satisfaction => 'S',
        }
    }
}

impl fmt::Display for WeightStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightStrategy::Precision => write!(f, "precision"),
            WeightStrategy::Laplace => write!(f, "laplace"),
            WeightStrategy::Novelty => write!(f, "novelty"),
            WeightStrategy::Satisfaction => write!(f, "satisfaction"),
        }
    }
}

impl FromStr for WeightStrategy {
    type Err = ConfigurationError;

    /// Accepts the code or the name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "precision" => Ok(WeightStrategy::Precision),
            "l" | "laplace" => Ok(WeightStrategy::Laplace),
            "n" | "novelty" => Ok(WeightStrategy::Novelty),
            "s" | "satisfaction" => Ok(WeightStrategy::Satisfaction),
            _ => Err(ConfigurationError::UnknownStrategy {
                kind: "weight",
                code: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_names_parse() {
        assert_eq!("I".parse::<NumericStrategy>().unwrap(), NumericStrategy::Interval);
        assert_eq!("average".parse::<NumericStrategy>().unwrap(), NumericStrategy::Average);
        assert_eq!("n".parse::<WeightStrategy>().unwrap(), WeightStrategy::Novelty);
        assert_eq!(" Satisfaction ".parse::<WeightStrategy>().unwrap(), WeightStrategy::Satisfaction);
    }

    #[test]
    fn display_round_trips() {
        for s in [WeightStrategy::Precision, WeightStrategy::Laplace, WeightStrategy::Novelty, WeightStrategy::Satisfaction] {
            assert_eq!(s.to_string().parse::<WeightStrategy>().unwrap(), s);
            assert_eq!(s.code().to_string().parse::<WeightStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        let err = "X".parse::<NumericStrategy>().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownStrategy { kind: "numeric", ref code } if code == "X"
        ));
        assert!("precise".parse::<WeightStrategy>().is_err());
    }
}
