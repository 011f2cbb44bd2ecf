//! The `reforge templates` command.

use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;

use reforge_core::templates::{SessionConfig, TemplateKey};

#[derive(Serialize)]
struct TemplateListing {
    key: TemplateKey,
    name: &'static str,
    description: &'static str,
    config: SessionConfig,
}

pub fn execute(format: String) -> Result<()> {
    let presets: Vec<_> = TemplateKey::ALL.iter().map(|k| k.preset()).collect();

    match format.as_str() {
        "json" => {
            let listing: Vec<TemplateListing> = presets
                .into_iter()
                .map(|p| TemplateListing {
                    key: p.key,
                    name: p.display_name,
                    description: p.description,
                    config: p.config,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        "text" => {
            let mut table = Table::new();
            table.set_header(vec![
                "Key",
                "Name",
                "Minutes",
                "Easy/Med/Hard %",
                "Patterns",
                "Quick win",
                "Emphasis",
            ]);
            for p in &presets {
                let c = &p.config;
                let d = &c.difficulty_distribution;
                table.add_row(vec![
                    Cell::new(p.key),
                    Cell::new(p.display_name),
                    Cell::new(c.duration_min),
                    Cell::new(format!(
                        "{:.0}/{:.0}/{:.0}",
                        d.easy_percent, d.medium_percent, d.hard_percent
                    )),
                    Cell::new(format!("{} (max {} each)", c.pattern_mode, c.max_same_pattern)),
                    Cell::new(if c.require_quick_win { "yes" } else { "no" }),
                    Cell::new(c.scoring_emphasis),
                ]);
            }
            println!("{table}");
            for p in &presets {
                println!("  {}: {}", p.key, p.description);
            }
        }
        other => anyhow::bail!("unknown format '{other}', expected text or json"),
    }
    Ok(())
}
