//! Portfolio families.
//!
//! A family turns formation-time firm characteristics into one or more
//! sorts. Every family runs through the same breakpoint and assignment
//! engine; only the characteristics, cut sets and eligibility differ.

use crate::assign::{Assignments, LabelStyle, ReferenceScreen, UnivariateSort};
use crate::breakpoints::CutSet;
use crate::characteristics::{Characteristic, FirmCharacteristics};
use crate::industry::{FiveIndustryClassifier, IndustryClassifier};
use std::fmt;
use tracing::debug;

/// Bucket assignments of one sort within a family.
#[derive(Debug, Clone, Default)]
pub struct Sort {
    /// Sort name, e.g. `quintiles`
    pub name: String,
    /// Bucket assignments keyed by company and formation year
    pub assignments: Assignments,
    /// Characteristics the sort is formed on
    pub characteristics: Vec<Characteristic>,
    /// Formation years with a low reference population
    pub degenerate_years: usize,
    /// Eligible firm-years lacking a sorting characteristic
    pub missing_characteristic: usize,
    /// Firm-years unassigned for want of breakpoints in their year
    pub without_breakpoints: usize,
}

/// A family of portfolio sorts.
pub trait PortfolioFamily: Send + Sync + fmt::Debug {
    /// Unique name, used in output paths
    fn name(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Characteristics the family sorts on
    fn required_characteristics(&self) -> &[Characteristic];

    /// Assign firms to buckets for every sort of the family.
    fn assign(&self, firms: &[FirmCharacteristics], screen: &ReferenceScreen) -> Vec<Sort>;
}

/// Industry portfolios from the June SIC code.
#[derive(Debug, Clone, Default)]
pub struct IndustryFamily<C = FiveIndustryClassifier> {
    classifier: C,
}

impl IndustryFamily {
    /// Fama-French five-industry portfolios.
    pub const fn new() -> Self {
        Self {
            classifier: FiveIndustryClassifier,
        }
    }
}

impl<C: IndustryClassifier> IndustryFamily<C> {
    /// Family over a custom classifier.
    pub const fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }
}

impl<C: IndustryClassifier + fmt::Debug> PortfolioFamily for IndustryFamily<C> {
    fn name(&self) -> &str {
        "industry5"
    }

    fn description(&self) -> &str {
        "Five industry portfolios from SIC codes"
    }

    fn required_characteristics(&self) -> &[Characteristic] {
        &[]
    }

    fn assign(&self, firms: &[FirmCharacteristics], _screen: &ReferenceScreen) -> Vec<Sort> {
        let mut assignments = Assignments::new(self.classifier.labels());
        let mut unclassified = 0usize;
        for firm in firms {
            match firm.sic.and_then(|sic| self.classifier.classify(sic)) {
                Some(idx) => assignments.insert(firm.company_id, firm.formation_year, idx),
                None => unclassified += 1,
            }
        }
        debug!(
            assigned = assignments.len(),
            unclassified, "Assigned industry portfolios"
        );
        vec![Sort {
            name: self.name().to_string(),
            assignments,
            characteristics: Vec::new(),
            degenerate_years: 0,
            missing_characteristic: unclassified,
            without_breakpoints: 0,
        }]
    }
}

/// Crossed operating profitability and investment sort.
#[derive(Debug, Clone)]
pub struct OpInvFamily {
    cuts: CutSet,
}

impl Default for OpInvFamily {
    fn default() -> Self {
        Self {
            cuts: CutSet::quintiles(),
        }
    }
}

impl OpInvFamily {
    /// Family with custom cut levels for both characteristics.
    pub const fn with_cuts(cuts: CutSet) -> Self {
        Self { cuts }
    }
}

impl PortfolioFamily for OpInvFamily {
    fn name(&self) -> &str {
        "op_inv"
    }

    fn description(&self) -> &str {
        "Operating profitability crossed with investment"
    }

    fn required_characteristics(&self) -> &[Characteristic] {
        &[Characteristic::OperatingProfitability, Characteristic::Investment]
    }

    fn assign(&self, firms: &[FirmCharacteristics], screen: &ReferenceScreen) -> Vec<Sort> {
        let eligible = |f: &FirmCharacteristics| {
            f.book_equity.is_some_and(|be| be > 0.0) && f.june_me > 0.0
        };
        let sort_on = |characteristic, prefix| UnivariateSort {
            name: "op_inv",
            characteristic,
            cuts: self.cuts.clone(),
            style: LabelStyle::Numbered(prefix),
            non_positive_bucket: false,
        };
        let op = sort_on(Characteristic::OperatingProfitability, "OP").run(firms, screen, eligible);
        let inv = sort_on(Characteristic::Investment, "INV").run(firms, screen, eligible);

        vec![Sort {
            name: self.name().to_string(),
            assignments: op.assignments.cross(&inv.assignments),
            characteristics: self.required_characteristics().to_vec(),
            degenerate_years: op
                .breakpoints
                .degenerate_years
                .max(inv.breakpoints.degenerate_years),
            missing_characteristic: op.missing_characteristic + inv.missing_characteristic,
            without_breakpoints: op.without_breakpoints + inv.without_breakpoints,
        }]
    }
}

/// Univariate sorts on a price ratio: terciles, quintiles and deciles.
#[derive(Debug, Clone)]
pub struct RatioFamily {
    name: &'static str,
    description: &'static str,
    characteristic: [Characteristic; 1],
    non_positive_bucket: bool,
}

impl RatioFamily {
    /// Earnings to price, with a `<=0` bucket.
    pub const fn earnings_to_price() -> Self {
        Self {
            name: "ep",
            description: "Earnings to price sorts",
            characteristic: [Characteristic::EarningsToPrice],
            non_positive_bucket: true,
        }
    }

    /// Cash flow to price, with a `<=0` bucket.
    pub const fn cash_flow_to_price() -> Self {
        Self {
            name: "cfp",
            description: "Cash flow to price sorts",
            characteristic: [Characteristic::CashFlowToPrice],
            non_positive_bucket: true,
        }
    }

    /// Book to market. Book equity is positive by construction.
    pub const fn book_to_market() -> Self {
        Self {
            name: "bm",
            description: "Book to market sorts",
            characteristic: [Characteristic::BookToMarket],
            non_positive_bucket: false,
        }
    }

    fn sorts(&self) -> Vec<UnivariateSort> {
        let characteristic = self.characteristic[0];
        let make = |name, cuts, style| UnivariateSort {
            name,
            characteristic,
            cuts,
            style,
            non_positive_bucket: self.non_positive_bucket,
        };
        vec![
            make("terciles", CutSet::terciles(), LabelStyle::LoMedHi),
            make("quintiles", CutSet::quintiles(), LabelStyle::Numbered("Qnt ")),
            make("deciles", CutSet::deciles(), LabelStyle::Numbered("Dec ")),
        ]
    }
}

impl PortfolioFamily for RatioFamily {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn required_characteristics(&self) -> &[Characteristic] {
        &self.characteristic
    }

    fn assign(&self, firms: &[FirmCharacteristics], screen: &ReferenceScreen) -> Vec<Sort> {
        self.sorts()
            .into_iter()
            .map(|sort| {
                let outcome = sort.run(firms, screen, |_| true);
                Sort {
                    name: sort.name.to_string(),
                    assignments: outcome.assignments,
                    characteristics: self.characteristic.to_vec(),
                    degenerate_years: outcome.breakpoints.degenerate_years,
                    missing_characteristic: outcome.missing_characteristic,
                    without_breakpoints: outcome.without_breakpoints,
                }
            })
            .collect()
    }
}
