//! Canonical Brazilian state (UF) codes.
//!
//! The carrier API rejects anything that is not a two-letter UF, while
//! customers type whatever they like ("São Paulo", "sao paulo", "SP").
//! States are therefore canonicalized once, at address capture, and the
//! rest of the pipeline only ever sees a [`StateCode`].

use core::fmt;

use serde::{Deserialize, Serialize, de};

use crate::text::normalize;

/// All 26 states plus the Federal District, as `(UF, full name)` pairs.
/// Full names are matched after [`normalize`], so accents and case in the
/// input are irrelevant.
const STATES: &[(&str, &str)] = &[
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

/// Error returned when input matches no known state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown state: {input:?}")]
pub struct StateCodeError {
    /// The rejected input, for field-level error reporting.
    pub input: String,
}

/// A canonical two-letter Brazilian state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StateCode(&'static str);

impl StateCode {
    /// Parse a state from a UF abbreviation or a full state name.
    ///
    /// Matching is case- and accent-insensitive: "sp", "SP", "São Paulo"
    /// and "SAO PAULO" all yield the same code.
    ///
    /// # Errors
    ///
    /// Returns [`StateCodeError`] if the input matches no state.
    pub fn parse(s: &str) -> Result<Self, StateCodeError> {
        let key = normalize(s);

        if !key.is_empty() {
            for (uf, name) in STATES {
                if key == uf.to_ascii_lowercase() || key == normalize(name) {
                    return Ok(Self(uf));
                }
            }
        }

        Err(StateCodeError {
            input: s.to_owned(),
        })
    }

    /// Returns the canonical two-letter code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StateCode {
    type Err = StateCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for StateCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
