//! List checks command implementation.

use treewalk_checks::{default_modules, minimal_modules, standard_registry};
use treewalk_core::{CheckMetadata, ModuleFactory, ModuleKind};

/// One row of the module table.
fn rows() -> Vec<(String, String, String)> {
    let registry = standard_registry();
    registry
        .names()
        .into_iter()
        .map(|(name, kind)| {
            let class = match kind {
                ModuleKind::Check => registry
                    .create_check(name)
                    .ok()
                    .and_then(|check| check.mutability())
                    .map_or_else(|| "unspecified".to_string(), |m| m.to_string()),
                ModuleKind::Filter | ModuleKind::FileFilter => "-".to_string(),
            };
            (name.to_string(), kind.to_string(), class)
        })
        .collect()
}

fn preset_line(modules: &[treewalk_core::ModuleEntry]) -> String {
    modules.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Runs the list-checks command.
pub fn run() {
    println!("Available modules:\n");
    println!("{:<30} {:<12} Mutability", "Name", "Kind");
    println!("{}", "-".repeat(60));

    for (name, kind, class) in rows() {
        println!("{name:<30} {kind:<12} {class}");
    }

    println!("\nPresets:");
    println!("  default  - {}", preset_line(&default_modules()));
    println!("  minimal  - {}", preset_line(&minimal_modules()));
}
