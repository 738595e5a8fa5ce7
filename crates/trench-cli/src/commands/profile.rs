use std::path::Path;

use trench_core::authority::{AuthorityParser, AuthorityRegistry};
use trench_core::error::TrenchError;
use trench_core::model::Authority;
use trench_core::profile::builtin::load_builtin;
use trench_core::profile::load_profile;
use trench_core::profile::schema::{Formula, HeaderRole, SchemaDef};

pub fn authorities() -> Result<(), TrenchError> {
    let registry = AuthorityRegistry::builtin()?;
    println!("Supported authorities:\n");
    for authority in registry.supported() {
        let parser = registry.get(authority)?;
        let description = parser.profile()?.description.clone().unwrap_or_default();
        println!("  {:<12} {}", authority.to_string(), description);
    }
    println!("\nComing soon:\n");
    for authority in registry.coming_soon() {
        println!("  {authority}");
    }
    Ok(())
}

fn describe(role: &HeaderRole) -> String {
    match role {
        HeaderRole::Static { value } => format!("= \"{value}\""),
        HeaderRole::Extracted { field } => format!("<- {field}"),
        HeaderRole::Derived { field, formula } => {
            let expr = match formula {
                Formula::Sum { of } => of
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(" + "),
                Formula::Copy { from } => from.to_string(),
                Formula::DaysSince { date } => format!("days since {date}"),
            };
            format!("{field} = {expr}")
        }
        HeaderRole::Manual => "manual".to_string(),
    }
}

fn print_schema(schema: &SchemaDef) {
    println!("{} ({} headers):\n", schema.name, schema.headers.len());
    for (i, header) in schema.headers.iter().enumerate() {
        let marker = if header.editable { "*" } else { " " };
        let name: String = header.name.chars().take(60).collect();
        println!(
            "  {:>2}. {marker} {:<60}  {:<9} {}",
            i + 1,
            name,
            header.role.label(),
            describe(&header.role)
        );
    }
    println!();
}

pub fn show(authority: &str, json: bool) -> Result<(), TrenchError> {
    let authority = Authority::from_str_loose(authority)
        .ok_or_else(|| TrenchError::UnknownAuthority(authority.to_string()))?;
    let profile = load_builtin(authority)?;

    if json {
        return crate::output::json::print(&profile);
    }

    println!("{}", profile.authority);
    if let Some(ref desc) = profile.description {
        println!("{desc}");
    }
    println!(
        "Tables: vector pages {:?}, raster page {}\n",
        profile.tables.vector_pages,
        profile
            .tables
            .raster_page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".into())
    );
    print_schema(&profile.non_refundable);
    print_schema(&profile.sd);
    println!("(* = editable by the operator)");
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), TrenchError> {
    let profile = load_profile(file)?;
    println!(
        "Valid profile for {}: {} non-refundable headers, {} SD headers",
        profile.authority,
        profile.non_refundable.headers.len(),
        profile.sd.headers.len()
    );
    Ok(())
}
