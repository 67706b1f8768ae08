//! The staged pipeline from input panels to portfolio return matrices.
//!
//! Stages, in order:
//!
//! 1. universe filter on the listing exchange
//! 2. delisting return adjustment
//! 3. market index over the adjusted security panel
//! 4. company market equity and representative security
//! 5. July-to-June fiscal alignment and portfolio weights
//! 6. June formation snapshots joined to lagged accounting data
//! 7. per family: bucket assignment, then aggregation of every sort
//!
//! Every stage is a pure function of the previous one, so two runs over the
//! same panels produce identical output.

use crate::config::PipelineConfig;
use crate::error::Result;
use ffport_data::{
    DelistingStats, FundamentalYear, LinkResolver, LinkSpan, Panels, apply_delisting,
};
use ffport_output::{ExportFormat, Exporter, Report, ReportBuilder, SortReport, write_sort};
use ffport_portfolios::{
    Assignments, CompanyMonth, CutSet, Diagnostics, FirmCharacteristics, MarketIndexRow,
    OpInvFamily, PortfolioFamily, PortfolioReturns, ReferenceScreen, ReturnKind,
    WeightedObservation, aggregate_returns, align, characteristic_average, create_family,
    formation_snapshots, market_index, merge_characteristics, prepare_accounting,
    resolve_market_equity,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// One sort of a family: its assignments and result matrices.
#[derive(Debug, Clone)]
pub struct SortOutput {
    /// Sort name
    pub name: String,
    /// Bucket assignments per company and formation year
    pub assignments: Assignments,
    /// Return, count, size and characteristic matrices
    pub returns: PortfolioReturns,
    /// Eligible firm-years without the sorting characteristic
    pub missing_characteristic: usize,
}

/// All sorts of one family.
#[derive(Debug, Clone)]
pub struct FamilyOutput {
    /// Family name
    pub name: String,
    /// Sorts in family order
    pub sorts: Vec<SortOutput>,
}

/// Exclusion counters of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Security months outside the configured exchanges
    pub outside_universe: usize,
    /// Delisting adjustment outcomes
    pub delisting: DelistingStats,
    /// Engine counters
    pub portfolio: Diagnostics,
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Families in configuration order
    pub families: Vec<FamilyOutput>,
    /// Market index over the adjusted security panel
    pub market_index: Vec<MarketIndexRow>,
    /// Firm characteristics at each formation date
    pub firms: Vec<FirmCharacteristics>,
    /// Exclusion counters
    pub diagnostics: RunDiagnostics,
}

impl PipelineOutput {
    /// Look up a family by name.
    pub fn family(&self, name: &str) -> Option<&FamilyOutput> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Number of sorts over all families.
    pub fn sort_count(&self) -> usize {
        self.families.iter().map(|f| f.sorts.len()).sum()
    }

    /// Write every table, assignment file, the market index and
    /// `report.json` under `out`.
    pub fn write(&self, out: &Path, config: &PipelineConfig) -> Result<Report> {
        self.write_with_progress(out, config, |_, _| {})
    }

    /// Like [`write`](Self::write), calling `on_sort(family, sort)` after
    /// each sort is written.
    pub fn write_with_progress(
        &self,
        out: &Path,
        config: &PipelineConfig,
        mut on_sort: impl FnMut(&str, &str),
    ) -> Result<Report> {
        let format = config.format;
        fs::create_dir_all(out)?;

        let mut builder = ReportBuilder::new()
            .version(crate::VERSION)
            .config(config)?
            .diagnostics(&self.diagnostics)?;

        for family in &self.families {
            for sort in &family.sorts {
                let mut files = write_sort(out, &family.name, &sort.name, &sort.returns, format)?;
                files.push(write_assignments(out, &family.name, sort, format)?);
                builder = builder.sort(SortReport {
                    family: family.name.clone(),
                    sort: sort.name.clone(),
                    labels: sort.assignments.labels().to_vec(),
                    files,
                });
                on_sort(&family.name, &sort.name);
            }
        }

        let index_path = out.join(format!("market_index.{}", format.extension()));
        self.market_index.export_to_file(&index_path, format)?;

        let report = builder.build();
        report.write(&out.join("report.json"))?;
        info!("Wrote {} sorts to {}", self.sort_count(), out.display());
        Ok(report)
    }
}

fn write_assignments(
    out: &Path,
    family: &str,
    sort: &SortOutput,
    format: ExportFormat,
) -> Result<PathBuf> {
    let path = out
        .join(family)
        .join(format!("{}_assignments.{}", sort.name, format.extension()));
    sort.assignments.to_records().export_to_file(&path, format)?;
    Ok(path)
}

/// Runs every stage with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline.
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Instantiate the configured families. Unknown names are an error.
    pub fn families(&self) -> Result<Vec<Box<dyn PortfolioFamily>>> {
        self.config
            .families
            .iter()
            .map(|name| {
                let family: Box<dyn PortfolioFamily> = if name == "op_inv" {
                    let cuts = CutSet::new(self.config.op_inv_cuts.levels().to_vec())?;
                    Box::new(OpInvFamily::with_cuts(cuts))
                } else {
                    create_family(name)?
                };
                Ok(family)
            })
            .collect()
    }

    /// Run the whole pipeline over `panels`.
    #[instrument(skip_all)]
    pub fn run(&self, panels: Panels) -> Result<PipelineOutput> {
        let families = self.families()?;
        let config = &self.config;
        let mut diagnostics = RunDiagnostics::default();

        let Panels {
            mut security_months,
            fundamentals,
            links,
        } = panels;

        let before = security_months.len();
        security_months.retain(|row| config.universe.contains(&row.exchange));
        diagnostics.outside_universe = before - security_months.len();

        let (security_months, delisting) = apply_delisting(security_months, &config.delisting);
        diagnostics.delisting = delisting;
        debug!(?delisting, "Applied delisting adjustment");

        let market_index = market_index(&security_months);

        let resolved = resolve_market_equity(&security_months);
        diagnostics.portfolio.missing_market_equity = resolved.missing_market_equity;
        diagnostics.portfolio.representative_ties = resolved.ties;

        let observations = align(&resolved.months)?;
        let firms = characteristics(
            &resolved.months,
            &fundamentals,
            &links,
            config,
            &mut diagnostics,
        );

        let mut outputs = Vec::with_capacity(families.len());
        for family in &families {
            outputs.push(build_family(
                family.as_ref(),
                &firms,
                &observations,
                &config.reference,
                config.return_kind,
                &mut diagnostics.portfolio,
            )?);
        }

        let total = diagnostics.portfolio.total_degenerate_years();
        if total > 0 {
            warn!(
                sort_years = total,
                "Breakpoints computed from a low reference population"
            );
        }
        info!(
            families = outputs.len(),
            firm_years = firms.len(),
            months = market_index.len(),
            "Pipeline complete"
        );

        Ok(PipelineOutput {
            families: outputs,
            market_index,
            firms,
            diagnostics,
        })
    }
}

#[instrument(skip_all)]
fn characteristics(
    months: &[CompanyMonth],
    fundamentals: &[FundamentalYear],
    links: &[LinkSpan],
    config: &PipelineConfig,
    diagnostics: &mut RunDiagnostics,
) -> Vec<FirmCharacteristics> {
    let snapshots = formation_snapshots(months);
    let accounting = prepare_accounting(fundamentals, &config.characteristics);
    let resolver = LinkResolver::new(links, &config.links);
    let (firms, merge) =
        merge_characteristics(&snapshots, &accounting, &resolver, &config.characteristics);
    diagnostics.portfolio.record_merge(&merge);
    firms
}

#[instrument(skip_all, fields(family = family.name()))]
fn build_family(
    family: &dyn PortfolioFamily,
    firms: &[FirmCharacteristics],
    observations: &[WeightedObservation],
    screen: &ReferenceScreen,
    kind: ReturnKind,
    diagnostics: &mut Diagnostics,
) -> Result<FamilyOutput> {
    let sorts = family
        .assign(firms, screen)
        .into_iter()
        .map(|sort| -> Result<SortOutput> {
            let (mut returns, stats) = aggregate_returns(observations, &sort.assignments, kind)?;
            diagnostics.record_aggregation(&stats);
            let key = format!("{}/{}", family.name(), sort.name);
            diagnostics.record_degenerate_years(&key, sort.degenerate_years);
            diagnostics.record_without_breakpoints(&key, sort.without_breakpoints);
            returns.characteristic_averages = sort
                .characteristics
                .iter()
                .map(|c| characteristic_average(firms, &sort.assignments, *c))
                .collect::<ffport_portfolios::Result<_>>()?;
            debug!(
                sort = %sort.name,
                assigned = sort.assignments.len(),
                missing = sort.missing_characteristic,
                "Built sort"
            );
            Ok(SortOutput {
                name: sort.name,
                assignments: sort.assignments,
                returns,
                missing_characteristic: sort.missing_characteristic,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FamilyOutput {
        name: family.name().to_string(),
        sorts,
    })
}
