// Integration tests for the permc shell contract: --json stdout shape and
// exit codes.
//
// Run with: cargo test -p permcascade-cli --test cli_contract -- --nocapture

use std::process::{Command, Output};

const CATALOG: &str = "tests/fixtures/catalog.json";
const CYCLIC: &str = "tests/fixtures/cyclic.json";
const TEMPLATES: &str = "tests/fixtures/templates.toml";
const SUBJECTS: &str = "tests/fixtures/subjects.json";

fn permc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_permc"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    // Keep the developer's own settings and env out of the picture.
    cmd.env("PERMC_CONFIG", "tests/fixtures/no-such-settings.toml");
    cmd.env_remove("PERMC_CATALOG");
    cmd.env_remove("PERMC_TEMPLATES");
    cmd.env_remove("PERMC_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    permc().args(args).output().expect("spawn permc")
}

fn code(output: &Output) -> Option<i32> {
    output.status.code()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(
        !trimmed.is_empty(),
        "stdout should not be empty\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {}\nstdout:\n{}", e, trimmed)
    })
}

fn ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .expect("array of ids")
        .iter()
        .map(|v| v.as_str().expect("id is a string").to_string())
        .collect()
}

fn notice_ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .expect("array of notices")
        .iter()
        .map(|n| n["id"].as_str().expect("notice id").to_string())
        .collect()
}

// ===========================================================================
// permc check
// ===========================================================================

#[test]
fn check_clean_catalog() {
    let output = run(&["check", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(val["permission_count"], 4);
    assert_eq!(val["edge_count"], 2);
    assert!(val["cycles"].as_array().unwrap().is_empty());
    assert!(val["dangling"].as_array().unwrap().is_empty());
}

#[test]
fn check_reports_cycles_and_dangling() {
    let output = run(&["check", "--catalog", CYCLIC, "--json"]);
    assert_eq!(code(&output), Some(0), "cycles only fail under --strict");

    let val = assert_single_json(&output);
    assert_eq!(val["cycles"], serde_json::json!([["A", "B"]]));
    assert_eq!(val["dangling"][0]["permission"], "C");
    assert_eq!(val["dangling"][0]["missing"], "ghost");
}

#[test]
fn check_strict_exits_3_on_cycles() {
    let output = run(&["check", "--strict", "--catalog", CYCLIC, "--json"]);
    assert_eq!(code(&output), Some(3));
    assert_single_json(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));

    let output = run(&["check", "--strict", "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(0));
}

// ===========================================================================
// permc closure / dependents / diff
// ===========================================================================

#[test]
fn closure_reports_auto_added_with_labels() {
    let output = run(&["closure", "3", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(ids(&val["requested"]), ["3"]);
    assert_eq!(ids(&val["selection"]), ["1", "2", "3"]);
    assert_eq!(notice_ids(&val["auto_added"]), ["1", "2"]);
    assert_eq!(val["auto_added"][0]["label"], "View users");
}

#[test]
fn closure_text_output() {
    let output = run(&["closure", "2,deliveries.track", "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("selection:  1, 2, deliveries.track"), "{stdout}");
    assert!(stdout.contains("auto-added: 1 (View users)"), "{stdout}");
}

#[test]
fn dependents_within_selection() {
    let output = run(&[
        "dependents", "1", "--selection", "1,2,3,deliveries.track", "--catalog", CATALOG, "--json",
    ]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(val["target"], "1");
    assert_eq!(notice_ids(&val["dependents"]), ["2", "3"]);
    assert_eq!(ids(&val["remaining"]), ["deliveries.track"]);
}

#[test]
fn dependents_of_unselected_target_is_empty() {
    let output = run(&["dependents", "1", "--selection", "2,3", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert!(notice_ids(&val["dependents"]).is_empty());
    assert_eq!(ids(&val["remaining"]), ["2", "3"]);
}

#[test]
fn dependents_blank_id_is_invalid_argument() {
    let output = run(&["dependents", " ", "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(6));
}

#[test]
fn diff_json_shape() {
    let output = run(&["diff", "--original", "1,2", "--current", "2,3", "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(
        val,
        serde_json::json!({"added": ["3"], "removed": ["1"], "has_changes": true})
    );
}

// ===========================================================================
// permc edit
// ===========================================================================

#[test]
fn edit_add_then_remove_cascades() {
    let output = run(&["edit", "add:3", "remove:1", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    let steps = val["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["op"], "add:3");
    assert_eq!(notice_ids(&steps[0]["auto_added"]), ["1", "2"]);
    assert_eq!(notice_ids(&steps[1]["removed_extra"]), ["2", "3"]);
    assert!(ids(&val["selection"]).is_empty());
    assert_eq!(val["changes"]["has_changes"], false);
}

#[test]
fn edit_with_seed_category_and_template() {
    let output = run(&[
        "edit", "--seed", "deliveries.track", "template:Basic", "category:deliveries",
        "--catalog", CATALOG, "--templates", TEMPLATES, "--json",
    ]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(ids(&val["selection"]), ["1", "2"]);
    assert_eq!(ids(&val["changes"]["added"]), ["1", "2"]);
    assert_eq!(ids(&val["changes"]["removed"]), ["deliveries.track"]);
}

#[test]
fn edit_unknown_template_exits_5_with_hint() {
    let output = run(&["edit", "template:Admin", "--catalog", CATALOG, "--templates", TEMPLATES]);
    assert_eq!(code(&output), Some(5));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Admin"), "{stderr}");
    assert!(stderr.contains("hint:"), "{stderr}");
}

#[test]
fn edit_unknown_category_exits_6() {
    let output = run(&["edit", "category:billing", "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(6));
}

#[test]
fn edit_malformed_op_is_usage_error() {
    let output = run(&["edit", "grant:1", "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(2));
}

// ===========================================================================
// permc templates / bulk
// ===========================================================================

#[test]
fn templates_list_closure_sizes() {
    let output = run(&["templates", "--catalog", CATALOG, "--templates", TEMPLATES, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    let list = val.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["name"], "Basic");
    assert_eq!(list[0]["closure_size"], 2);
    assert_eq!(list[1]["name"], "Courier");
    assert_eq!(list[1]["closure_size"], 1);
}

#[test]
fn bulk_add_keeps_subject_order() {
    let output = run(&["bulk", "--subjects", SUBJECTS, "--add", "3", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    let outcomes = val.as_array().unwrap();
    let subjects: Vec<_> = outcomes.iter().map(|o| o["subject"].as_str().unwrap()).collect();
    assert_eq!(subjects, ["alice", "bob", "carol"]);

    assert_eq!(ids(&outcomes[0]["auto_added"]), ["1", "2"]);
    assert_eq!(outcomes[1]["changes"]["has_changes"], false);
    assert_eq!(ids(&outcomes[2]["selection"]), ["1", "2", "3", "deliveries.track"]);
}

#[test]
fn bulk_remove_cascades_per_subject() {
    let output = run(&["bulk", "--subjects", SUBJECTS, "--remove", "1", "--catalog", CATALOG, "--json"]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(ids(&val[1]["removed_extra"]), ["2", "3"]);
    assert!(ids(&val[1]["selection"]).is_empty());
    assert_eq!(val[2]["changes"]["has_changes"], false);
}

#[test]
fn bulk_template() {
    let output = run(&[
        "bulk", "--subjects", SUBJECTS, "--template", "Courier",
        "--catalog", CATALOG, "--templates", TEMPLATES, "--json",
    ]);
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(ids(&val[0]["selection"]), ["deliveries.track"]);
    assert_eq!(val[2]["changes"]["has_changes"], false);
}

#[test]
fn bulk_blank_seed_id_exits_6() {
    let dir = tempfile::tempdir().unwrap();
    let subjects = dir.path().join("subjects.json");
    std::fs::write(&subjects, r#"{"alice": [1], "bob": [""]}"#).unwrap();

    let output = run(&[
        "bulk", "--subjects", subjects.to_str().unwrap(), "--add", "2", "--catalog", CATALOG,
        "--json",
    ]);
    assert_eq!(code(&output), Some(6));
    assert!(output.stdout.is_empty(), "no partial plan on stdout");
    assert!(String::from_utf8_lossy(&output.stderr).contains("bob"));
}

#[test]
fn bulk_requires_exactly_one_action() {
    let output = run(&["bulk", "--subjects", SUBJECTS, "--catalog", CATALOG]);
    assert_eq!(code(&output), Some(2));

    let output = run(&[
        "bulk", "--subjects", SUBJECTS, "--add", "1", "--remove", "2", "--catalog", CATALOG,
    ]);
    assert_eq!(code(&output), Some(2));
}

// ===========================================================================
// Inputs
// ===========================================================================

#[test]
fn missing_catalog_is_usage_error() {
    let output = run(&["closure", "1"]);
    assert_eq!(code(&output), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--catalog"));

    let output = run(&["closure", "1", "--catalog", "tests/fixtures/absent.json"]);
    assert_eq!(code(&output), Some(2));
}

#[test]
fn malformed_catalog_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"permissions": [{"label": "no id"}]}"#).unwrap();

    let output = run(&["check", "--catalog", path.to_str().unwrap()]);
    assert_eq!(code(&output), Some(4));
}

#[test]
fn catalog_from_env() {
    let output = permc()
        .env("PERMC_CATALOG", CATALOG)
        .args(["closure", "2", "--json"])
        .output()
        .expect("spawn permc");
    assert_eq!(code(&output), Some(0));

    let val = assert_single_json(&output);
    assert_eq!(ids(&val["selection"]), ["1", "2"]);
}

#[test]
fn catalog_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(CATALOG);
    let settings = dir.path().join("settings.toml");
    std::fs::write(&settings, format!("catalog = {:?}\n", catalog.to_str().unwrap())).unwrap();

    let output = permc()
        .env("PERMC_CONFIG", &settings)
        .args(["closure", "1", "--json"])
        .output()
        .expect("spawn permc");
    assert_eq!(code(&output), Some(0));
    assert_single_json(&output);
}
