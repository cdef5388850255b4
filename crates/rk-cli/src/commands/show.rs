use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use rk_bot::CardProvider;

pub fn run(cards: &Path, config: Option<&Path>, name: &str, json: bool) -> Result<(), String> {
    let registry = super::load_config(config)?.alias_registry();
    let store = super::load_cards(cards, &registry)?;
    let card = store
        .card_by_name(name)
        .ok_or_else(|| format!("card not found: \"{name}\""))?;

    if json {
        let text = serde_json::to_string_pretty(card.data()).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!("  {} [{}]", card.name(), card.kind());

    let mut entries = Table::new();
    entries.set_content_arrangement(ContentArrangement::Dynamic);
    entries.set_header(vec!["Entry", "Value", "Category"]);
    for e in card.entries() {
        let category = if e.readonly {
            format!("{} (read-only)", e.category)
        } else {
            e.category.to_string()
        };
        entries.add_row(vec![e.key, e.value.to_string(), category]);
    }
    println!("{entries}");

    let abilities = card.abilities();
    if !abilities.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Ability", "Expression"]);
        for a in abilities {
            table.add_row(vec![a.key, a.expression]);
        }
        println!("{table}");
    }

    let marked = card.growth_marked_skills();
    if !marked.is_empty() {
        println!("  growth: {}", marked.join(", "));
    }
    Ok(())
}
