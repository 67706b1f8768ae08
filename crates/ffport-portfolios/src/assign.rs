//! Bucket assignment at formation and its propagation through the
//! following fiscal year.

use crate::breakpoints::{Breakpoints, CutSet, compute_breakpoints};
use crate::characteristics::{Characteristic, FirmCharacteristics};
use ffport_data::{CompanyId, Exchange};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Label used for non-positive values when a sort sets them apart.
pub const NON_POSITIVE_LABEL: &str = "<=0";

/// Which firms the breakpoints are computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceScreen {
    /// Exchanges in the reference subsample
    pub exchanges: Vec<Exchange>,
    /// Require positive book equity
    pub require_positive_book_equity: bool,
    /// Require positive June market equity
    pub require_positive_market_equity: bool,
    /// Minimum years of earlier accounting history
    pub min_history_years: usize,
    /// Populations below this mark a formation year as degenerate
    pub min_reference_firms: usize,
}

impl Default for ReferenceScreen {
    fn default() -> Self {
        Self {
            exchanges: vec![Exchange::Nyse],
            require_positive_book_equity: true,
            require_positive_market_equity: true,
            min_history_years: 0,
            min_reference_firms: 20,
        }
    }
}

impl ReferenceScreen {
    /// Whether a firm-year belongs to the reference subsample.
    pub fn admits(&self, firm: &FirmCharacteristics) -> bool {
        self.exchanges.contains(&firm.exchange)
            && (!self.require_positive_book_equity || firm.book_equity.is_some_and(|be| be > 0.0))
            && (!self.require_positive_market_equity || firm.june_me > 0.0)
            && firm.history_years >= self.min_history_years
    }
}

/// How bucket labels are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// `Lo 30`, `Med 40`, `Hi 30` from the cut levels
    LoMedHi,
    /// A prefix followed by the bucket number, e.g. `Qnt 1` or `OP1`
    Numbered(&'static str),
}

impl LabelStyle {
    /// Labels for every bucket of `cuts`, low to high.
    pub fn labels(&self, cuts: &CutSet) -> Vec<String> {
        match self {
            Self::Numbered(prefix) => (1..=cuts.bucket_count())
                .map(|i| format!("{prefix}{i}"))
                .collect(),
            Self::LoMedHi => {
                let mut edges = vec![0.0];
                edges.extend_from_slice(cuts.levels());
                edges.push(1.0);
                let n = edges.len() - 1;
                edges
                    .windows(2)
                    .enumerate()
                    .map(|(i, w)| {
                        let width = ((w[1] - w[0]) * 100.0).round() as i64;
                        let tag = match i {
                            0 => "Lo",
                            i if i + 1 == n => "Hi",
                            _ => "Med",
                        };
                        format!("{tag} {width}")
                    })
                    .collect()
            }
        }
    }
}

/// One firm's bucket for one formation year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAssignment {
    /// Company identifier
    pub company_id: CompanyId,
    /// Formation year; the bucket applies to fiscal year `formation_year`
    pub formation_year: i32,
    /// Bucket label
    pub bucket_label: String,
}

/// Bucket assignments of one sort, with labels in display order.
///
/// Lookups take the fiscal year of an observation, so an assignment made
/// in June `t` covers July `t` through June `t + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments {
    labels: Vec<String>,
    by_firm: HashMap<(CompanyId, i32), usize>,
}

impl Assignments {
    /// Empty assignments over `labels`.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            by_firm: HashMap::new(),
        }
    }

    /// Assign `company` in `formation_year` to the bucket at `index`.
    pub fn insert(&mut self, company: CompanyId, formation_year: i32, index: usize) {
        debug_assert!(index < self.labels.len());
        self.by_firm.insert((company, formation_year), index);
    }

    /// Bucket labels in display order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Bucket index of a firm for a fiscal year.
    pub fn index(&self, company: CompanyId, fiscal_year: i32) -> Option<usize> {
        self.by_firm.get(&(company, fiscal_year)).copied()
    }

    /// Bucket label of a firm for a fiscal year.
    pub fn label(&self, company: CompanyId, fiscal_year: i32) -> Option<&str> {
        self.index(company, fiscal_year)
            .map(|i| self.labels[i].as_str())
    }

    /// Number of firm-years assigned.
    pub fn len(&self) -> usize {
        self.by_firm.len()
    }

    /// Whether nothing was assigned.
    pub fn is_empty(&self) -> bool {
        self.by_firm.is_empty()
    }

    /// All assignments, ordered by formation year, company and label.
    pub fn to_records(&self) -> Vec<BucketAssignment> {
        let mut records: Vec<BucketAssignment> = self
            .by_firm
            .iter()
            .map(|((company, year), idx)| BucketAssignment {
                company_id: *company,
                formation_year: *year,
                bucket_label: self.labels[*idx].clone(),
            })
            .collect();
        records.sort_by(|a, b| {
            (a.formation_year, a.company_id).cmp(&(b.formation_year, b.company_id))
        });
        records
    }

    /// Firms per label for a formation year.
    pub fn population(&self, formation_year: i32) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for ((_, year), idx) in &self.by_firm {
            if *year == formation_year {
                *counts.entry(self.labels[*idx].as_str()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Cross two sorts into one with labels `"{a} {b}"`. Only firm-years
    /// assigned in both are kept.
    pub fn cross(&self, other: &Self) -> Self {
        let width = other.labels.len();
        let labels = self
            .labels
            .iter()
            .flat_map(|a| other.labels.iter().map(move |b| format!("{a} {b}")))
            .collect();
        let mut crossed = Self::new(labels);
        for (key, a) in &self.by_firm {
            if let Some(b) = other.by_firm.get(key) {
                crossed.by_firm.insert(*key, a * width + b);
            }
        }
        crossed
    }
}

/// A univariate sort on one characteristic.
#[derive(Debug, Clone, PartialEq)]
pub struct UnivariateSort {
    /// Sort name, e.g. `quintiles`
    pub name: &'static str,
    /// Characteristic sorted on
    pub characteristic: Characteristic,
    /// Quantile levels
    pub cuts: CutSet,
    /// Label style
    pub style: LabelStyle,
    /// Set non-positive values apart in their own bucket
    pub non_positive_bucket: bool,
}

/// Result of running a univariate sort.
#[derive(Debug, Clone, Default)]
pub struct SortOutcome {
    /// Assignments of every eligible firm-year
    pub assignments: Assignments,
    /// Breakpoints used
    pub breakpoints: Breakpoints,
    /// Eligible firm-years lacking the characteristic
    pub missing_characteristic: usize,
    /// Firm-years left unassigned because their formation year has no
    /// reference firms to cut on
    pub without_breakpoints: usize,
}

impl UnivariateSort {
    /// Compute breakpoints on the reference subsample and assign every
    /// eligible firm-year.
    ///
    /// With `non_positive_bucket`, values `<= 0` are left out of the
    /// breakpoints and assigned to [`NON_POSITIVE_LABEL`], the first label.
    pub fn run(
        &self,
        firms: &[FirmCharacteristics],
        screen: &ReferenceScreen,
        eligible: impl Fn(&FirmCharacteristics) -> bool,
    ) -> SortOutcome {
        let mut labels = Vec::new();
        if self.non_positive_bucket {
            labels.push(NON_POSITIVE_LABEL.to_string());
        }
        let offset = labels.len();
        labels.extend(self.style.labels(&self.cuts));

        let sorted_value = |firm: &FirmCharacteristics| {
            self.characteristic
                .value(firm)
                .filter(|v| !self.non_positive_bucket || *v > 0.0)
        };

        let reference = firms
            .iter()
            .filter(|f| eligible(f) && screen.admits(f))
            .filter_map(|f| sorted_value(f).map(|v| (f.formation_year, v)));
        let breakpoints = compute_breakpoints(reference, &self.cuts, screen.min_reference_firms);

        let mut assignments = Assignments::new(labels);
        let mut missing = 0usize;
        let mut without_breakpoints = 0usize;
        for firm in firms.iter().filter(|f| eligible(f)) {
            let Some(value) = self.characteristic.value(firm) else {
                missing += 1;
                continue;
            };
            if self.non_positive_bucket && value <= 0.0 {
                assignments.insert(firm.company_id, firm.formation_year, 0);
                continue;
            }
            match breakpoints.get(firm.formation_year) {
                Some(bp) => {
                    let idx = offset + bp.bucket(value);
                    assignments.insert(firm.company_id, firm.formation_year, idx);
                }
                None => without_breakpoints += 1,
            }
        }
        if without_breakpoints > 0 {
            warn!(
                sort = self.name,
                characteristic = %self.characteristic,
                without_breakpoints,
                "Firm-years without breakpoints left unassigned"
            );
        }

        debug!(
            sort = self.name,
            characteristic = %self.characteristic,
            assigned = assignments.len(),
            missing,
            "Assigned buckets"
        );
        SortOutcome {
            assignments,
            breakpoints,
            missing_characteristic: missing,
            without_breakpoints,
        }
    }
}
