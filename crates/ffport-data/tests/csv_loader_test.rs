//! Loading panels from CSV files with CRSP/Compustat column names.

use ffport_data::{
    CompanyId, CsvPanelLoader, DataError, Exchange, LinkType, Panels, SecurityId,
};
use std::fs;
use std::path::PathBuf;

const SECURITY_MONTHS: &str = "\
permno,permco,date,ret,retx,shrout,altprc,exchcd,siccd,dlret,dlstcd
10001,7,2020-06-30,0.01,0.01,1000,20.0,1,2834,,
10001,7,2020-07-31,0.02,0.015,1000,-20.4,1,2834,,
10002,7,2020-07-31,0.00,0.00,50,18.0,1,2834,,
10003,9,2020-07-31,,,200,5.0,3,7372,-0.3,552
";

const FUNDAMENTALS: &str = "\
gvkey,datadate,sale,cogs,xsga,xint,at,lt,seq,txditc,pstkrv,ni,ebit,dp,sich
1690,2019-12-31,500,200,100,10,1000,600,400,5,,40,60,20,2834
";

const LINKS: &str = "\
gvkey,lpermco,linkdt,linkenddt,linktype,linkprim
001690,7,1980-01-01,,LC,P
";

fn write_dir(name: &str, months: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(CsvPanelLoader::SECURITY_MONTHS_FILE), months).unwrap();
    fs::write(dir.join(CsvPanelLoader::FUNDAMENTALS_FILE), FUNDAMENTALS).unwrap();
    fs::write(dir.join(CsvPanelLoader::LINKS_FILE), LINKS).unwrap();
    dir
}

#[test]
fn test_load_csv_directory() {
    let dir = write_dir("ffport_data_csv_loader", SECURITY_MONTHS);
    let panels = Panels::load(&CsvPanelLoader::new(&dir)).unwrap();

    assert_eq!(panels.security_months.len(), 4);
    let july = panels
        .security_months
        .iter()
        .find(|r| r.security_id == SecurityId(10001) && r.period.to_string() == "2020-07-31")
        .unwrap();
    assert_eq!(july.price, Some(-20.4));
    assert_eq!(july.market_equity(), Some(20.4 * 1000.0));
    assert_eq!(july.exchange, Exchange::Nyse);

    let delisted = panels
        .security_months
        .iter()
        .find(|r| r.security_id == SecurityId(10003))
        .unwrap();
    assert!(delisted.ret.is_none());
    assert_eq!(delisted.delisting_code, Some(552));
    assert_eq!(delisted.exchange, Exchange::Nasdaq);

    let f = &panels.fundamentals[0];
    assert_eq!(f.fundamentals_id.0, "001690");
    assert_eq!(f.sga, Some(100.0));
    assert!(f.preferred_redemption.is_none());

    let link = &panels.links[0];
    assert_eq!(link.company_id, CompanyId(7));
    assert_eq!(link.link_type, LinkType::Lc);
    assert!(link.link_end.is_none());
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_required_column_names_table_and_column() {
    let months = "permno,permco,date,ret,retx,altprc\n10001,7,2020-06-30,0.01,0.01,20.0\n";
    let dir = write_dir("ffport_data_csv_missing_column", months);
    let err = Panels::load(&CsvPanelLoader::new(&dir)).unwrap_err();
    assert!(matches!(
        err,
        DataError::MissingColumn {
            table: "security_months",
            column: "shares_outstanding",
        }
    ));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_duplicate_security_month_is_fatal() {
    let months = "\
permno,permco,date,ret,retx,shrout,prc
10001,7,2020-06-01,0.01,0.01,1000,20.0
10001,7,2020-06-30,0.02,0.02,1000,20.0
";
    let dir = write_dir("ffport_data_csv_duplicate", months);
    let err = Panels::load(&CsvPanelLoader::new(&dir)).unwrap_err();
    assert!(matches!(err, DataError::DuplicateKey { .. }));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_file() {
    let dir = std::env::temp_dir().join("ffport_data_csv_empty_dir");
    fs::create_dir_all(&dir).unwrap();
    let err = Panels::load(&CsvPanelLoader::new(&dir)).unwrap_err();
    assert!(err.to_string().contains(CsvPanelLoader::SECURITY_MONTHS_FILE));
    fs::remove_dir_all(dir).ok();
}
