//! Collations and character sets for text values

use crate::common::error::{RefractError, RefractResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Character set a collation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterSet {
    Utf8mb4,
    Latin1,
    Binary,
}

impl CharacterSet {
    pub fn name(&self) -> &'static str {
        match self {
            CharacterSet::Utf8mb4 => "utf8mb4",
            CharacterSet::Latin1 => "latin1",
            CharacterSet::Binary => "binary",
        }
    }
}

impl fmt::Display for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison rule for strings
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Collation {
    #[default]
    Utf8mb4_0900Bin,
    Utf8mb4Bin,
    Utf8mb4_0900AiCi,
    Utf8mb4GeneralCi,
    Latin1SwedishCi,
    Latin1Bin,
    Binary,
}

impl Collation {
    const ALL: [Collation; 7] = [
        Collation::Utf8mb4_0900Bin,
        Collation::Utf8mb4Bin,
        Collation::Utf8mb4_0900AiCi,
        Collation::Utf8mb4GeneralCi,
        Collation::Latin1SwedishCi,
        Collation::Latin1Bin,
        Collation::Binary,
    ];

    /// Resolve a collation by its SQL name, case-insensitively
    pub fn from_name(name: &str) -> RefractResult<Self> {
        let lowered = name.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == lowered)
            .ok_or_else(|| RefractError::UnknownCollation(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collation::Utf8mb4_0900Bin => "utf8mb4_0900_bin",
            Collation::Utf8mb4Bin => "utf8mb4_bin",
            Collation::Utf8mb4_0900AiCi => "utf8mb4_0900_ai_ci",
            Collation::Utf8mb4GeneralCi => "utf8mb4_general_ci",
            Collation::Latin1SwedishCi => "latin1_swedish_ci",
            Collation::Latin1Bin => "latin1_bin",
            Collation::Binary => "binary",
        }
    }

    pub fn character_set(&self) -> CharacterSet {
        match self {
            Collation::Utf8mb4_0900Bin
            | Collation::Utf8mb4Bin
            | Collation::Utf8mb4_0900AiCi
            | Collation::Utf8mb4GeneralCi => CharacterSet::Utf8mb4,
            Collation::Latin1SwedishCi | Collation::Latin1Bin => CharacterSet::Latin1,
            Collation::Binary => CharacterSet::Binary,
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(
            self,
            Collation::Utf8mb4_0900AiCi | Collation::Utf8mb4GeneralCi | Collation::Latin1SwedishCi
        )
    }

    /// Order two strings under this collation
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        if self.is_case_insensitive() {
            // PAD SPACE: trailing blanks never decide the order
            let (a, b) = (a.trim_end_matches(' '), b.trim_end_matches(' '));
            a.chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase))
        } else {
            a.as_bytes().cmp(b.as_bytes())
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
