//! Panel loading: the [`PanelLoader`] boundary and typed [`Panels`].

use crate::error::{DataError, Result};
use crate::exchange::Exchange;
use crate::ids::{CompanyId, FundamentalsId, SecurityId};
use crate::panel::{FundamentalYear, LinkPrimary, LinkSpan, LinkType, SecurityMonth};
use crate::period::month_end;
use crate::schema::{FUNDAMENTALS, LINKS, SECURITY_MONTHS};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Source of the three raw input tables.
///
/// Implementations only fetch frames; validation and decoding happen in
/// [`Panels::load`].
pub trait PanelLoader {
    /// Monthly security panel.
    fn security_months(&self) -> Result<DataFrame>;

    /// Annual fundamentals panel.
    fn fundamentals(&self) -> Result<DataFrame>;

    /// Fundamentals-to-company link table.
    fn links(&self) -> Result<DataFrame>;
}

/// Reads `security_months.csv`, `fundamentals.csv` and `links.csv` from a
/// directory.
#[derive(Debug, Clone)]
pub struct CsvPanelLoader {
    dir: PathBuf,
}

impl CsvPanelLoader {
    /// File name of the monthly security panel.
    pub const SECURITY_MONTHS_FILE: &'static str = "security_months.csv";
    /// File name of the fundamentals panel.
    pub const FUNDAMENTALS_FILE: &'static str = "fundamentals.csv";
    /// File name of the link table.
    pub const LINKS_FILE: &'static str = "links.csv";

    /// Create a loader rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory the loader reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, file: &str) -> Result<DataFrame> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Err(DataError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        debug!("Reading {}", path.display());
        let df = LazyCsvReader::new(&path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .finish()?
            .collect()?;
        Ok(df)
    }
}

impl PanelLoader for CsvPanelLoader {
    fn security_months(&self) -> Result<DataFrame> {
        self.read(Self::SECURITY_MONTHS_FILE)
    }

    fn fundamentals(&self) -> Result<DataFrame> {
        self.read(Self::FUNDAMENTALS_FILE)
    }

    fn links(&self) -> Result<DataFrame> {
        self.read(Self::LINKS_FILE)
    }
}

/// Decoded, validated input panels.
#[derive(Debug, Clone, Default)]
pub struct Panels {
    /// Monthly security observations
    pub security_months: Vec<SecurityMonth>,
    /// Annual fundamentals rows
    pub fundamentals: Vec<FundamentalYear>,
    /// Link spans
    pub links: Vec<LinkSpan>,
}

impl Panels {
    /// Build panels from already-typed records.
    ///
    /// Periods are normalized to month end and the security panel key is
    /// checked for uniqueness.
    pub fn new(
        mut security_months: Vec<SecurityMonth>,
        fundamentals: Vec<FundamentalYear>,
        links: Vec<LinkSpan>,
    ) -> Result<Self> {
        for row in &mut security_months {
            row.period = month_end(row.period);
        }
        check_unique(&security_months)?;
        Ok(Self {
            security_months,
            fundamentals,
            links,
        })
    }

    /// Fetch, validate and decode all three tables from a loader.
    #[instrument(skip(loader))]
    pub fn load(loader: &dyn PanelLoader) -> Result<Self> {
        let security_months = decode_security_months(&loader.security_months()?)?;
        let fundamentals = decode_fundamentals(&loader.fundamentals()?)?;
        let links = decode_links(&loader.links()?)?;
        info!(
            "Loaded {} security months, {} fundamentals rows, {} links",
            security_months.len(),
            fundamentals.len(),
            links.len()
        );
        Self::new(security_months, fundamentals, links)
    }
}

fn check_unique(rows: &[SecurityMonth]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert((row.security_id, row.period)) {
            return Err(DataError::DuplicateKey {
                table: SECURITY_MONTHS.table,
                key: format!("({}, {})", row.security_id, row.period),
            });
        }
    }
    Ok(())
}

/// Compustat keys are six-digit zero-padded; CSV inference may have read
/// them as integers.
fn normalize_gvkey(raw: String) -> FundamentalsId {
    if !raw.is_empty() && raw.len() < 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
        FundamentalsId(format!("{raw:0>6}"))
    } else {
        FundamentalsId(raw)
    }
}

/// Validate and decode the monthly security panel.
pub fn decode_security_months(df: &DataFrame) -> Result<Vec<SecurityMonth>> {
    let table = SECURITY_MONTHS.resolve(df)?;
    let security_ids = table.required_ints("security_id")?;
    let company_ids = table.required_ints("company_id")?;
    let periods = table.required_dates("period")?;
    let rets = table.floats("return")?;
    let retxs = table.floats("return_ex_distribution")?;
    let shares = table.floats("shares_outstanding")?;
    let prices = table.floats("price")?;
    let exchanges = table.texts("exchange")?;
    let sics = table.ints("sic")?;
    let dlrets = table.floats("delisting_return")?;
    let dlstcds = table.ints("delisting_code")?;

    let rows = (0..table.height())
        .map(|i| SecurityMonth {
            security_id: SecurityId(security_ids[i]),
            company_id: CompanyId(company_ids[i]),
            period: month_end(periods[i]),
            ret: rets[i],
            retx: retxs[i],
            shares_outstanding: shares[i],
            price: prices[i],
            exchange: exchanges[i]
                .as_deref()
                .map_or(Exchange::Other, Exchange::parse),
            sic: sics[i],
            delisting_return: dlrets[i],
            delisting_code: dlstcds[i],
        })
        .collect::<Vec<_>>();
    debug!("Decoded {} security months", rows.len());
    Ok(rows)
}

/// Validate and decode the annual fundamentals panel.
pub fn decode_fundamentals(df: &DataFrame) -> Result<Vec<FundamentalYear>> {
    let table = FUNDAMENTALS.resolve(df)?;
    let ids = table.required_texts("fundamentals_id")?;
    let ends = table.required_dates("fiscal_period_end")?;
    let sales = table.floats("sales")?;
    let cogs = table.floats("cogs")?;
    let sga = table.floats("sga")?;
    let xint = table.floats("interest_expense")?;
    let at = table.floats("total_assets")?;
    let lt = table.floats("total_liabilities")?;
    let seq = table.floats("stockholders_equity")?;
    let ceq = table.floats("common_equity")?;
    let pstk = table.floats("preferred_stock")?;
    let pstkrv = table.floats("preferred_redemption")?;
    let pstkl = table.floats("preferred_liquidating")?;
    let txditc = table.floats("deferred_taxes_itc")?;
    let txdb = table.floats("deferred_taxes")?;
    let itcb = table.floats("investment_tax_credit")?;
    let ni = table.floats("net_income")?;
    let ebit = table.floats("ebit")?;
    let dp = table.floats("depreciation")?;
    let oancf = table.floats("operating_cash_flow")?;
    let sic = table.ints("sic")?;

    Ok(ids
        .into_iter()
        .zip(ends)
        .enumerate()
        .map(|(i, (id, end))| FundamentalYear {
            fundamentals_id: normalize_gvkey(id),
            fiscal_period_end: end,
            sales: sales[i],
            cogs: cogs[i],
            sga: sga[i],
            interest_expense: xint[i],
            total_assets: at[i],
            total_liabilities: lt[i],
            stockholders_equity: seq[i],
            common_equity: ceq[i],
            preferred_stock: pstk[i],
            preferred_redemption: pstkrv[i],
            preferred_liquidating: pstkl[i],
            deferred_taxes_itc: txditc[i],
            deferred_taxes: txdb[i],
            investment_tax_credit: itcb[i],
            net_income: ni[i],
            ebit: ebit[i],
            depreciation: dp[i],
            operating_cash_flow: oancf[i],
            sic: sic[i],
        })
        .collect())
}

/// Validate and decode the link table.
pub fn decode_links(df: &DataFrame) -> Result<Vec<LinkSpan>> {
    let table = LINKS.resolve(df)?;
    let ids = table.required_texts("fundamentals_id")?;
    let companies = table.required_ints("company_id")?;
    let starts = table.required_dates("link_start")?;
    let ends = table.dates("link_end")?;
    let types = table.texts("link_type")?;
    let primaries = table.texts("link_primary")?;

    // Absent type/primary columns mean the table was pre-filtered upstream.
    let default_type = if table.has("link_type") {
        LinkType::Other
    } else {
        LinkType::Lc
    };
    let default_primary = if table.has("link_primary") {
        LinkPrimary::Other
    } else {
        LinkPrimary::Primary
    };

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| LinkSpan {
            fundamentals_id: normalize_gvkey(id),
            company_id: CompanyId(companies[i]),
            link_start: starts[i],
            link_end: ends[i],
            link_type: types[i]
                .as_deref()
                .map_or(default_type, LinkType::parse),
            primary: primaries[i]
                .as_deref()
                .map_or(default_primary, LinkPrimary::parse),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FrameLoader {
        months: DataFrame,
        fundamentals: DataFrame,
        links: DataFrame,
    }

    impl PanelLoader for FrameLoader {
        fn security_months(&self) -> Result<DataFrame> {
            Ok(self.months.clone())
        }

        fn fundamentals(&self) -> Result<DataFrame> {
            Ok(self.fundamentals.clone())
        }

        fn links(&self) -> Result<DataFrame> {
            Ok(self.links.clone())
        }
    }

    fn loader(months: DataFrame) -> FrameLoader {
        FrameLoader {
            months,
            fundamentals: df! {
                "gvkey" => [1690i64],
                "datadate" => ["2019-09-30"],
                "at" => [100.0],
                "seq" => [40.0],
            }
            .unwrap(),
            links: df! {
                "gvkey" => ["001690"],
                "lpermco" => [7i64],
                "linkdt" => ["1980-01-01"],
                "linkenddt" => [None::<&str>],
                "linktype" => ["LC"],
                "linkprim" => ["P"],
            }
            .unwrap(),
        }
    }

    #[test]
    fn test_load_decodes_and_normalizes() {
        let months = df! {
            "permno" => [14593i64, 14593],
            "permco" => [7i64, 7],
            "date" => ["2020-01-15", "2020-02-28"],
            "ret" => [0.05, -0.02],
            "retx" => [0.05, -0.02],
            "shrout" => [4_000.0, 4_000.0],
            "prc" => [300.0, -290.0],
            "exchcd" => [3i64, 3],
        }
        .unwrap();
        let panels = Panels::load(&loader(months)).unwrap();

        assert_eq!(panels.security_months.len(), 2);
        let first = &panels.security_months[0];
        assert_eq!(first.period, NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
        assert_eq!(first.exchange, Exchange::Nasdaq);
        assert!(first.delisting_code.is_none());

        assert_eq!(panels.fundamentals[0].fundamentals_id.0, "001690");
        assert_eq!(panels.fundamentals[0].total_assets, Some(100.0));
        assert!(panels.fundamentals[0].sales.is_none());

        let link = &panels.links[0];
        assert_eq!(link.company_id, CompanyId(7));
        assert!(link.link_end.is_none());
        assert_eq!(link.link_type, LinkType::Lc);
        assert_eq!(link.primary, LinkPrimary::Primary);
    }

    #[test]
    fn test_duplicate_security_period_is_fatal() {
        let months = df! {
            "permno" => [1i64, 1],
            "permco" => [1i64, 1],
            "date" => ["2020-01-02", "2020-01-31"],
            "ret" => [0.0, 0.0],
            "retx" => [0.0, 0.0],
            "shrout" => [1.0, 1.0],
            "prc" => [1.0, 1.0],
        }
        .unwrap();
        let err = Panels::load(&loader(months)).unwrap_err();
        assert!(matches!(err, DataError::DuplicateKey { .. }));
    }

    #[test]
    fn test_csv_loader_reports_missing_file() {
        let loader = CsvPanelLoader::new("/nonexistent/ffport");
        assert!(matches!(loader.links(), Err(DataError::Io(_))));
    }

    #[test]
    fn test_csv_loader_reads_directory() {
        let dir = std::env::temp_dir().join(format!("ffport-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(CsvPanelLoader::SECURITY_MONTHS_FILE),
            "permno,permco,date,ret,retx,shrout,prc,exchcd\n\
             10001,1,2020-01-31,0.01,0.01,100,10.0,1\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(CsvPanelLoader::FUNDAMENTALS_FILE),
            "gvkey,datadate,at\n001000,2019-12-31,50\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(CsvPanelLoader::LINKS_FILE),
            "gvkey,lpermco,linkdt,linkenddt,linktype,linkprim\n001000,1,1990-01-01,,LU,C\n",
        )
        .unwrap();

        let panels = Panels::load(&CsvPanelLoader::new(&dir)).unwrap();
        assert_eq!(panels.security_months[0].exchange, Exchange::Nyse);
        assert_eq!(panels.fundamentals[0].fundamentals_id.0, "001000");
        assert_eq!(panels.links[0].link_type, LinkType::Lu);
        assert_eq!(panels.links[0].primary, LinkPrimary::CrspPrimary);

        std::fs::remove_dir_all(&dir).ok();
    }
}
