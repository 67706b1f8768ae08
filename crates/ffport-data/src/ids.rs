//! Identifier newtypes for securities, companies and fundamentals records.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Security identifier (CRSP `permno`).
#[derive(
    Debug,
    Display,
    From,
    Into,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct SecurityId(pub i64);

/// Company identifier shared by all securities of one issuer (CRSP `permco`).
#[derive(
    Debug,
    Display,
    From,
    Into,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct CompanyId(pub i64);

/// Fundamentals identifier (Compustat `gvkey`).
#[derive(
    Debug, Display, From, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FundamentalsId(pub String);

impl From<&str> for FundamentalsId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
