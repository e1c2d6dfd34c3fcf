//! Binary tests for forecast-sync.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn forecast_sync() -> Command {
    let mut cmd = Command::cargo_bin("forecast-sync").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn publish_prints_what_companion_received() {
    forecast_sync()
        .args(["publish", "--weather-id", "800", "--high", "75°", "--low", "52°"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Published forecast to /forecast"))
        .stdout(predicate::str::contains(
            "Companion received: weather 800 high 75° low 52°",
        ));
}

#[test]
fn publish_with_icon_reports_size() {
    let dir = tempdir().unwrap();
    let icon = dir.path().join("icon.png");
    fs::write(&icon, [0u8; 64]).unwrap();

    forecast_sync()
        .args(["publish", "--weather-id", "500", "--high", "60°", "--low", "48°"])
        .arg("--icon")
        .arg(&icon)
        .assert()
        .success()
        .stdout(predicate::str::contains("icon: 64 bytes"));
}

#[test]
fn configured_asset_limit_rejects_icon() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("forecast.toml");
    fs::write(&config, "[transport]\nmax_asset_bytes = 16\n").unwrap();
    let icon = dir.path().join("icon.png");
    fs::write(&icon, [0u8; 64]).unwrap();

    forecast_sync()
        .arg("--config")
        .arg(&config)
        .args(["publish", "--weather-id", "800", "--high", "75°", "--low", "52°"])
        .arg("--icon")
        .arg(&icon)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Publish failed"));
}

#[test]
fn configured_paths_are_used() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("forecast.toml");
    fs::write(
        &config,
        "[sync]\nforecast_path = \"/wx\"\ntrigger_path = \"/wx_now\"\n",
    )
    .unwrap();

    forecast_sync()
        .arg("--config")
        .arg(&config)
        .args(["publish", "--weather-id", "800", "--high", "75°", "--low", "52°"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Published forecast to /wx"));

    forecast_sync()
        .arg("--config")
        .arg(&config)
        .arg("request-sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync requested at /wx_now"));
}

#[test]
fn request_sync_fires_primary_trigger() {
    forecast_sync()
        .arg("request-sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Primary trigger fired (1 total)"));
}

#[test]
fn encode_then_decode() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("forecast.bin");

    forecast_sync()
        .args(["encode", "--weather-id", "801", "--high", "70°", "--low", "50°"])
        .args(["--timestamp", "1700000000000"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    forecast_sync()
        .arg("decode")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Weather id: 801"))
        .stdout(predicate::str::contains("Timestamp:  1700000000000"))
        .stdout(predicate::str::contains("Icon:       none"));
}

#[test]
fn decode_garbage_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("garbage.bin");
    fs::write(&file, b"definitely not a data item").unwrap();

    forecast_sync()
        .arg("decode")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a data item"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();

    forecast_sync()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("request-sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}
