//! Artifact bundle written to disk and read back.

use tradelab_runner::export::{generate_report, load_artifacts, save_artifacts};
use tradelab_runner::{run_from_config, RunConfig};

fn config() -> RunConfig {
    RunConfig::from_toml(
        r#"
[data]
source = "random_walk"
n_bars = 80
n_assets = 3

[strategy]
type = "buy_and_hold"
lot = 10.0

[cost]
model = "proportional"
commission_bps = 2.5
"#,
    )
    .unwrap()
}

#[test]
fn save_and_load_artifacts() {
    let temp_dir = tempfile::tempdir().unwrap();
    let report = run_from_config(&config()).unwrap();

    let run_dir = save_artifacts(&report, temp_dir.path()).unwrap();
    assert!(run_dir.starts_with(temp_dir.path()));
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("buy_and_hold_"));

    for name in [
        "report.json",
        "trades.csv",
        "portfolio.csv",
        "history.csv",
        "transaction.csv",
        "summary.md",
    ] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.dataset_hash, report.dataset_hash);
    assert_eq!(loaded.result.valuations.len(), 3);

    let portfolio = std::fs::read_to_string(run_dir.join("portfolio.csv")).unwrap();
    assert_eq!(portfolio.lines().count(), 1 + report.result.portfolio.len());

    let summary = std::fs::read_to_string(run_dir.join("summary.md")).unwrap();
    assert_eq!(summary, generate_report(&report));
}

#[test]
fn same_config_writes_same_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let a = save_artifacts(&run_from_config(&config()).unwrap(), temp_dir.path()).unwrap();
    let b = save_artifacts(&run_from_config(&config()).unwrap(), temp_dir.path()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn load_from_missing_dir_fails_with_context() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = load_artifacts(&temp_dir.path().join("nope")).unwrap_err();
    assert!(format!("{err:#}").contains("report.json"));
}

#[test]
fn rejected_trades_survive_save_and_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = RunConfig::from_toml(
        r#"
[data]
source = "random_walk"
n_bars = 20
n_assets = 2

[strategy]
type = "trades"

[[strategy.trades]]
open = 0
close = 10
quantities = { "0" = 1.0 }

[[strategy.trades]]
open = 2
take = -1.0
quantities = { "1" = 1.0 }
"#,
    )
    .unwrap();
    let report = run_from_config(&config).unwrap();
    assert_eq!(report.result.failures.len(), 1);
    assert_eq!(report.result.failures[0].trade_index, 1);

    let run_dir = save_artifacts(&report, temp_dir.path()).unwrap();
    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.result.failures, report.result.failures);
    assert_eq!(loaded.result.valuations.len(), 1);
}
