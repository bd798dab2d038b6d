use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EnaError;

/// Which accession list and results directory a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    GetGvcf,
    MergeGvcf,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::GetGvcf => "get_gvcf",
            Mode::MergeGvcf => "merge_gvcf",
        }
    }

    pub fn results_dir_name(&self) -> &'static str {
        match self {
            Mode::GetGvcf => "tables_get_gvcf",
            Mode::MergeGvcf => "tables_merge_gvcf",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = EnaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "get_gvcf" => Ok(Mode::GetGvcf),
            "merge_gvcf" => Ok(Mode::MergeGvcf),
            _ => Err(EnaError::InvalidMode(value.to_string())),
        }
    }
}

/// An ENA accession (study, sample, run ...). Treated as opaque, but it ends up
/// in a file name so separators and whitespace are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = EnaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized != "."
            && normalized != ".."
            && !normalized
                .chars()
                .any(|ch| ch.is_whitespace() || matches!(ch, '/' | '\\'));
        if !is_valid {
            return Err(EnaError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Sequencing layout of a run, written to the `end` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Layout {
    Paired,
    Single,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Paired => "PAIRED",
            Layout::Single => "SINGLE",
        }
    }

    /// Layout implied by the number of `;`-separated read files, if any.
    pub fn from_file_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(Layout::Paired),
            1 => Some(Layout::Single),
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
