pub mod check;
pub mod roll;
pub mod show;

use std::fs;
use std::path::Path;

use rk_bot::{ChannelConfig, MemoryCards};
use rk_core::AliasRegistry;

/// Read a TOML channel configuration. No path means the defaults.
fn load_config(path: Option<&Path>) -> Result<ChannelConfig, String> {
    let Some(path) = path else {
        return Ok(ChannelConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    toml::from_str(&text).map_err(|e| format!("invalid configuration {}: {e}", path.display()))
}

/// Read a JSON card file.
fn load_cards(path: &Path, registry: &AliasRegistry) -> Result<MemoryCards, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    MemoryCards::from_json(&text, registry).map_err(|e| format!("{}: {e}", path.display()))
}

/// Write a JSON card file back.
fn save_cards(path: &Path, cards: &MemoryCards) -> Result<(), String> {
    let json = cards.to_json().map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))
}
