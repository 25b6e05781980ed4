use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "glyph-rain"])
        .status()
        .expect("failed to invoke cargo check for glyph-rain CLI binary");

    assert!(status.success(), "cargo check --bin glyph-rain should succeed");
}

#[test]
fn cli_prints_a_json_report() {
    let output = Command::new(env!("CARGO_BIN_EXE_glyph-rain"))
        .args(["--rounds", "1", "--seed", "42", "--difficulty", "easy", "--speed", "slow"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run glyph-rain");

    assert!(output.status.success(), "glyph-rain exited with {}", output.status);
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout holds a JSON report");
    assert_eq!(report["seed"], 42);
    assert_eq!(report["difficulty"], "easy");
    assert_eq!(report["speed"], "slow");
    assert_eq!(report["rounds"].as_array().map(Vec::len), Some(1));
}

#[test]
fn cli_rejects_missing_scenario_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_glyph-rain"))
        .args(["--config", "does-not-exist.toml"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run glyph-rain");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read scenario file"), "{stderr}");
}
