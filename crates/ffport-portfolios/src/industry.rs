//! Industry classification of SIC codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps a SIC code to an industry label.
pub trait IndustryClassifier: Send + Sync {
    /// Industry labels in display order.
    fn labels(&self) -> Vec<String>;

    /// Position in [`labels`](Self::labels) of the industry of `sic`, or
    /// `None` when the code cannot be classified.
    fn classify(&self, sic: i64) -> Option<usize>;
}

/// Fama-French five-industry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiveIndustry {
    /// Consumer durables, nondurables, wholesale, retail and some services
    Cnsmr,

    /// Manufacturing, energy and utilities
    Manuf,

    /// Business equipment, telephone and television transmission
    HiTec,

    /// Healthcare, medical equipment and drugs
    Hlth,

    /// Everything else
    Other,
}

const CNSMR: &[(i64, i64)] = &[
    (100, 999),
    (2000, 2399),
    (2700, 2749),
    (2770, 2799),
    (3100, 3199),
    (3940, 3989),
    (2500, 2519),
    (2590, 2599),
    (3630, 3659),
    (3710, 3711),
    (3714, 3714),
    (3716, 3716),
    (3750, 3751),
    (3792, 3792),
    (3900, 3939),
    (3990, 3999),
    (5000, 5999),
    (7200, 7299),
    (7600, 7699),
];

const MANUF: &[(i64, i64)] = &[
    (2520, 2589),
    (2600, 2699),
    (2750, 2769),
    (2800, 2829),
    (2840, 2899),
    (3000, 3099),
    (3200, 3569),
    (3580, 3621),
    (3623, 3629),
    (3700, 3709),
    (3712, 3713),
    (3715, 3715),
    (3717, 3749),
    (3752, 3791),
    (3793, 3799),
    (3860, 3899),
    (1200, 1399),
    (2900, 2999),
    (4900, 4949),
];

const HITEC: &[(i64, i64)] = &[
    (3570, 3579),
    (3622, 3622),
    (3660, 3692),
    (3694, 3699),
    (3810, 3839),
    (7370, 7379),
    (7391, 7391),
    (8730, 8734),
    (4800, 4899),
];

const HLTH: &[(i64, i64)] = &[(2830, 2839), (3693, 3693), (3840, 3859), (8000, 8099)];

fn in_ranges(ranges: &[(i64, i64)], sic: i64) -> bool {
    ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&sic))
}

impl FiveIndustry {
    /// Returns all industries in display order.
    pub fn all() -> Vec<Self> {
        vec![Self::Cnsmr, Self::Manuf, Self::HiTec, Self::Hlth, Self::Other]
    }

    /// Returns the column label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cnsmr => "Cnsmr",
            Self::Manuf => "Manuf",
            Self::HiTec => "HiTec",
            Self::Hlth => "Hlth",
            Self::Other => "Other",
        }
    }

    /// Classify a SIC code. Codes outside every range are `Other`.
    pub fn from_sic(sic: i64) -> Self {
        if in_ranges(CNSMR, sic) {
            Self::Cnsmr
        } else if in_ranges(MANUF, sic) {
            Self::Manuf
        } else if in_ranges(HITEC, sic) {
            Self::HiTec
        } else if in_ranges(HLTH, sic) {
            Self::Hlth
        } else {
            Self::Other
        }
    }

    const fn index(&self) -> usize {
        match self {
            Self::Cnsmr => 0,
            Self::Manuf => 1,
            Self::HiTec => 2,
            Self::Hlth => 3,
            Self::Other => 4,
        }
    }
}

impl fmt::Display for FiveIndustry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// [`IndustryClassifier`] over [`FiveIndustry`]. Non-positive codes are
/// left unclassified.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiveIndustryClassifier;

impl IndustryClassifier for FiveIndustryClassifier {
    fn labels(&self) -> Vec<String> {
        FiveIndustry::all()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    fn classify(&self, sic: i64) -> Option<usize> {
        (sic > 0).then(|| FiveIndustry::from_sic(sic).index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2000, FiveIndustry::Cnsmr)]
    #[case(5411, FiveIndustry::Cnsmr)]
    #[case(3711, FiveIndustry::Cnsmr)]
    #[case(3712, FiveIndustry::Manuf)]
    #[case(1311, FiveIndustry::Manuf)]
    #[case(4911, FiveIndustry::Manuf)]
    #[case(3571, FiveIndustry::HiTec)]
    #[case(7372, FiveIndustry::HiTec)]
    #[case(4813, FiveIndustry::HiTec)]
    #[case(2834, FiveIndustry::Hlth)]
    #[case(3693, FiveIndustry::Hlth)]
    #[case(8062, FiveIndustry::Hlth)]
    #[case(6021, FiveIndustry::Other)]
    #[case(9999, FiveIndustry::Other)]
    fn test_from_sic(#[case] sic: i64, #[case] expected: FiveIndustry) {
        assert_eq!(FiveIndustry::from_sic(sic), expected);
    }

    #[test]
    fn test_classifier_labels_match_indices() {
        let classifier = FiveIndustryClassifier;
        let labels = classifier.labels();
        assert_eq!(labels, vec!["Cnsmr", "Manuf", "HiTec", "Hlth", "Other"]);
        for industry in FiveIndustry::all() {
            assert_eq!(labels[industry.index()], industry.to_string());
        }
        assert_eq!(classifier.classify(2834), Some(3));
        assert_eq!(classifier.classify(0), None);
    }
}
