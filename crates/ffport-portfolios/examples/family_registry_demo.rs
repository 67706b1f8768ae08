//! Demonstration of the portfolio family registry
//!
//! This example shows how to:
//! - List all available families
//! - Look up families by characteristic
//! - Instantiate a family by name
//!
//! Run with: cargo run --example family_registry_demo -p ffport-portfolios

use ffport_portfolios::{
    Characteristic, FamilyInfo, available_families, create_family, families_using, family_info,
};

fn main() {
    println!("Portfolio Family Registry");
    println!("=========================\n");

    let families = available_families();
    println!("Families available: {}\n", families.len());
    for info in &families {
        print_family(info);
    }

    println!("Families by characteristic:");
    println!("---------------------------");
    for characteristic in Characteristic::all() {
        let names: Vec<&str> = families_using(characteristic)
            .iter()
            .map(|f| f.name)
            .collect();
        println!("  {:4} {}", characteristic.code(), names.join(", "));
    }

    println!("\nLookup 'op_inv':");
    if let Some(info) = family_info("op_inv") {
        print_family(&info);
    }

    match create_family("industry49") {
        Ok(family) => println!("Created {}", family.name()),
        Err(e) => println!("Error: {e}"),
    }
}

fn print_family(info: &FamilyInfo) {
    println!("  {} - {}", info.name, info.description);
    println!("    sorts: {}", info.sorts.join(", "));
    if !info.required_characteristics.is_empty() {
        let codes: Vec<&str> = info
            .required_characteristics
            .iter()
            .map(|c| c.code())
            .collect();
        println!("    characteristics: {}", codes.join(", "));
    }
    println!();
}
