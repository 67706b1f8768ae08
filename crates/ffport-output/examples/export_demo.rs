//! Demonstration of the export and summary functionality in ffport-output.

use ffport_output::{ExportFormat, Exporter, compare, describe};
use ffport_portfolios::{PortfolioMatrix, RowKey};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ffport Export Demo ===\n");

    let labels = vec!["Lo 30".to_string(), "Med 40".to_string(), "Hi 30".to_string()];
    let mut replicated = PortfolioMatrix::new("vw_annual", labels.clone());
    let mut reference = PortfolioMatrix::new("reference", labels);
    for (i, year) in (1990..2000).enumerate() {
        let base = 0.01 * (i as f64 - 4.0);
        let row = vec![Some(base), Some(base + 0.02), Some(base + 0.04)];
        let published = row
            .iter()
            .map(|v| v.map(|v| (v + 0.001) * 100.0))
            .collect();
        replicated.insert_row(RowKey::Year(year), row)?;
        reference.insert_row(RowKey::Year(year), published)?;
    }

    println!("1. CSV\n");
    println!("{}", replicated.export_to_string(ExportFormat::Csv)?);

    println!("2. Pretty JSON (first 200 chars)\n");
    let json = replicated.export_to_string(ExportFormat::PrettyJson)?;
    println!("{}\n", &json[..json.len().min(200)]);

    println!("3. Summary");
    println!("{}", describe(&replicated).to_ascii_table(100.0));

    println!("4. Against a reference published in percent");
    println!("{}", compare(&replicated, &reference, 0.01));

    Ok(())
}
