use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Float, KaonffError, PhysicalConstants};

/// The kaon pair produced in $`e^+e^-\to K\bar{K}`$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KaonChannel {
    /// $`K^+K^-`$
    Charged,
    /// $`K_SK_L`$
    Neutral,
}

impl KaonChannel {
    /// The mass of a single kaon in this channel (MeV).
    pub fn kaon_mass(&self, constants: &PhysicalConstants) -> Float {
        match self {
            KaonChannel::Charged => constants.m_kc,
            KaonChannel::Neutral => constants.m_k0,
        }
    }
    /// The production threshold $`2m_K`$ in GeV.
    pub fn threshold(&self, constants: &PhysicalConstants) -> Float {
        2.0 * self.kaon_mass(constants) * 1e-3
    }
}

impl Display for KaonChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KaonChannel::Charged => write!(f, "K+K-"),
            KaonChannel::Neutral => write!(f, "KSKL"),
        }
    }
}

impl FromStr for KaonChannel {
    type Err = KaonffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "charged" | "k+k-" | "kc" | "c" => Ok(Self::Charged),
            "neutral" | "kskl" | "k0" | "n" => Ok(Self::Neutral),
            _ => Err(KaonffError::ParseError {
                name: s.to_string(),
                object: "KaonChannel".to_string(),
            }),
        }
    }
}

/// Selects the density and parameter subset of a mass-peak fit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// Signal shape plus a background shape (experimental data).
    #[default]
    WithBackground,
    /// Signal shape only (simulation).
    SignalOnly,
}

impl Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitMode::WithBackground => write!(f, "Signal + Background"),
            FitMode::SignalOnly => write!(f, "Signal Only"),
        }
    }
}

impl FromStr for FitMode {
    type Err = KaonffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "withbackground" | "with background" | "background" | "bkg" | "data" => {
                Ok(Self::WithBackground)
            }
            "signalonly" | "signal only" | "signal" | "sig" | "mc" => Ok(Self::SignalOnly),
            _ => Err(KaonffError::ParseError {
                name: s.to_string(),
                object: "FitMode".to_string(),
            }),
        }
    }
}
