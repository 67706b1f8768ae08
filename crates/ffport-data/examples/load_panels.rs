//! Load a directory of CSV panels and report what was decoded.
//!
//! Usage: `cargo run -p ffport-data --example load_panels -- <data-dir>`

use ffport_data::{
    CsvPanelLoader, DelistingConfig, LinkConfig, LinkResolver, Panels, apply_delisting,
};
use std::collections::BTreeSet;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let panels = Panels::load(&CsvPanelLoader::new(&dir))?;

    let securities: BTreeSet<_> = panels
        .security_months
        .iter()
        .map(|r| r.security_id)
        .collect();
    let companies: BTreeSet<_> = panels.security_months.iter().map(|r| r.company_id).collect();
    println!("Security months: {}", panels.security_months.len());
    println!("  securities: {}", securities.len());
    println!("  companies:  {}", companies.len());
    println!("Fundamentals rows: {}", panels.fundamentals.len());

    let resolver = LinkResolver::new(&panels.links, &LinkConfig::default());
    println!("Companies with an eligible link: {}", resolver.len());

    let (_, stats) = apply_delisting(panels.security_months, &DelistingConfig::default());
    println!("\nDelisting outcomes");
    println!("  not delisted:      {}", stats.not_delisted);
    println!("  delisting return:  {}", stats.delisting_return_used);
    println!("  liquidation:       {}", stats.liquidation);
    println!("  neutral:           {}", stats.neutral);
    println!("  excluded:          {}", stats.excluded);
    Ok(())
}
