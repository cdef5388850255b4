#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CARDS: &str = r#"{
  "cards": [
    {
      "type": "coc",
      "name": "Alice",
      "basic": { "理智": 60 },
      "props": { "力量": 50 },
      "skills": { "侦察": 40 },
      "abilities": { "loop": "$loop+1" }
    },
    {
      "type": "dnd",
      "name": "Bren",
      "basic": { "生命": 0, "生命上限": 20 },
      "props": { "力量": 16 }
    }
  ],
  "links": { "u1": "Alice", "u2": "Bren" }
}"#;

/// A temp directory holding `cards.json`.
fn table() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cards.json"), CARDS).unwrap();
    dir
}

fn cards_path(dir: &TempDir) -> String {
    dir.path().join("cards.json").to_str().unwrap().to_string()
}

fn saved(dir: &TempDir) -> serde_json::Value {
    let text = fs::read_to_string(dir.path().join("cards.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn rk() -> Command {
    Command::cargo_bin("rk").unwrap()
}

fn roll(dir: &TempDir, command: &str) -> Command {
    let mut cmd = rk();
    cmd.args(["roll", command, "-c", &cards_path(dir), "-u", "u1", "-s", "7"]);
    cmd
}

fn write_config(dir: &Path, text: &str) -> String {
    let path = dir.join("channel.toml");
    fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// roll
// ---------------------------------------------------------------------------

#[test]
fn roll_checks_a_skill_with_difficulty() {
    let dir = table();
    roll(&dir, ".r 困难侦察")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice进行困难侦察检定").and(predicate::str::contains("/20 ")));
}

#[test]
fn roll_with_same_seed_is_reproducible() {
    let dir = table();
    let first = roll(&dir, "r 3d6").output().unwrap();
    let second = roll(&dir, "r 3d6").output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn stat_adjustment_is_written_back() {
    let dir = table();
    roll(&dir, "st 力量+1d6")
        .assert()
        .success()
        .stdout(predicate::str::contains("力量: 50→"));
    let strength = saved(&dir)["cards"][0]["props"]["力量"].as_i64().unwrap();
    assert!((51..=56).contains(&strength), "{strength}");
}

#[test]
fn dry_run_leaves_the_file_alone() {
    let dir = table();
    roll(&dir, "st 力量60")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry run]"));
    assert_eq!(saved(&dir)["cards"][0]["props"]["力量"], 50);
}

#[test]
fn hidden_roll_prints_private_text() {
    let dir = table();
    roll(&dir, "rh 侦察")
        .assert()
        .success()
        .stdout(predicate::str::contains("暗骰").and(predicate::str::contains("[private]")));
}

#[test]
fn mention_targets_another_card() {
    let dir = table();
    roll(&dir, "r d20")
        .args(["--mention", "u2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Bren掷骰"));
}

#[test]
fn card_link_is_saved() {
    let dir = table();
    rk().args(["roll", "pc Bren", "-c", &cards_path(&dir), "-u", "u9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("已绑定角色卡Bren"));
    assert_eq!(saved(&dir)["links"]["u9"], "Bren");
}

#[test]
fn stat_write_policy_from_config() {
    let dir = table();
    let config = write_config(dir.path(), "stat_write = \"managers\"\n");
    roll(&dir, "st 力量60")
        .args(["--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("不允许"));
    roll(&dir, "st 力量60")
        .args(["--config", &config, "--manager"])
        .assert()
        .success();
    assert_eq!(saved(&dir)["cards"][0]["props"]["力量"], 60);
}

#[test]
fn self_referencing_ability_is_abandoned() {
    let dir = table();
    roll(&dir, "r $loop")
        .assert()
        .failure()
        .stderr(predicate::str::contains("abandoned"));
}

#[test]
fn missing_card_file_fails() {
    rk().args(["roll", "r d6", "-c", "/nonexistent/cards.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// ---------------------------------------------------------------------------
// check-config
// ---------------------------------------------------------------------------

#[test]
fn check_config_accepts_valid_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
system = "coc"

[[alias_rules]]
id = "ra"
scope = "command"
trigger = { prefix = "ra" }
replacement = "r"
"#,
    );
    rk().args(["check-config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"));
}

#[test]
fn check_config_reports_bad_tier() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[[coc.tiers]]
name = "broken"
kind = "success"
expression = "roll <="
"#,
    );
    rk().args(["check-config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 problem"));
}

#[test]
fn check_config_rejects_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "system = [");
    rk().args(["check-config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[test]
fn show_lists_entries() {
    let dir = table();
    rk().args(["show", "Alice", "-c", &cards_path(&dir)])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("侦察")
                .and(predicate::str::contains("40"))
                .and(predicate::str::contains("loop")),
        );
}

#[test]
fn show_json() {
    let dir = table();
    rk().args(["show", "Bren", "-c", &cards_path(&dir), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"dnd\""));
}

#[test]
fn show_unknown_card_fails() {
    let dir = table();
    rk().args(["show", "Nobody", "-c", &cards_path(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("card not found"));
}
