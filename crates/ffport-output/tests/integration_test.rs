//! Integration tests for export, summary and comparison.

use ffport_output::{
    ExportFormat, Exporter, ReportBuilder, SortReport, compare, describe, read_matrix_csv,
    write_sort,
};
use ffport_portfolios::{PortfolioMatrix, PortfolioReturns, RowKey};
use std::fs;

fn monthly(name: &str, shift: f64) -> PortfolioMatrix {
    let labels = vec!["Qnt 1".to_string(), "Qnt 2".to_string()];
    let mut m = PortfolioMatrix::new(name, labels);
    for month in 1..=12 {
        let key = RowKey::parse(&format!("2001{month:02}")).unwrap();
        let v = month as f64 / 100.0;
        m.insert_row(key, vec![Some(v + shift), Some(-v)]).unwrap();
    }
    m
}

#[test]
fn test_export_read_compare_workflow() {
    let out = std::env::temp_dir().join("ffport_output_workflow");
    let returns = PortfolioReturns {
        vw_monthly: monthly("vw_monthly", 0.0),
        ew_monthly: monthly("ew_monthly", 0.001),
        vw_annual: PortfolioMatrix::new("vw_annual", vec![]),
        ew_annual: PortfolioMatrix::new("ew_annual", vec![]),
        firm_count: PortfolioMatrix::new("firm_count", vec![]),
        avg_size: PortfolioMatrix::new("avg_size", vec![]),
        characteristic_averages: vec![],
    };

    let files = write_sort(&out, "ep", "quintiles", &returns, ExportFormat::Csv).unwrap();
    assert_eq!(files.len(), 6);
    assert!(out.join("ep").join("quintiles_ew_monthly.csv").exists());

    let vw = read_matrix_csv(&files[0]).unwrap();
    let ew = read_matrix_csv(&files[1]).unwrap();
    assert_eq!(vw.len(), 12);

    let cmp = compare(&ew, &vw, 1.0);
    assert_eq!(cmp.columns.len(), 2);
    assert!((cmp.columns[0].mean_abs_diff.unwrap() - 0.001).abs() < 1e-9);
    assert!((cmp.columns[0].correlation.unwrap() - 1.0).abs() < 1e-9);
    assert!(cmp.columns[1].max_abs_diff.unwrap() < 1e-12);

    let summary = describe(&vw);
    assert_eq!(summary.columns[0].count, 12);
    assert_eq!(summary.first.as_deref(), Some("200101"));

    let report = ReportBuilder::new()
        .version(ffport_portfolios::VERSION)
        .sort(SortReport {
            family: "ep".into(),
            sort: "quintiles".into(),
            labels: vw.labels.clone(),
            files,
        })
        .build();
    let report_path = out.join("report.json");
    report.write(&report_path).unwrap();
    let text = fs::read_to_string(&report_path).unwrap();
    assert!(text.contains("quintiles_vw_monthly.csv"));

    fs::remove_dir_all(out).ok();
}

#[test]
fn test_json_export_of_matrix() {
    let json = monthly("vw_monthly", 0.0)
        .export_to_string(ExportFormat::Json)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["rows"].as_array().unwrap().len(), 12);
    assert_eq!(value["rows"][0]["period"], "200101");
}
