//! Run configuration and unit record loading
//!
//! Tests that touch UPA_CONFIG are marked #[serial] so they don't race on the
//! process environment.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use upa_common::config::{load_units, resolve_config_path, RunConfig, CONFIG_ENV_VAR};
use upa_common::{
    price_units, AttributeValue, CalibrationMode, Error, OversoldMethod, PricingStrategy,
    UnitStatus,
};

const FULL_CONFIG: &str = r#"
[logging]
level = "debug"

[pricing]
strategy = "bound_clamp"
calibration = "median_split"

[static_params]
bargainGap = 5.0
current_price_per_sqm = 1000.0
minimum_liq_refusal_price = 800.0
maximum_liq_refusal_price = 1200.0
oversold_method = "area"

[distribution]
type = "bimodal"
params = { mean1 = 0.2, mean2 = 0.8 }

[importance]
floor = 3.0
view = 1.0

[[priority_tables]]
field = "view"
groups = [
    { name = "inner", values = ["yard", "wall"], priority = 2 },
    { name = "sea", values = ["sea"], priority = 1 },
]

[[income_plans]]
price_per_sqm = 1000.0
period_begin = "2025-01-01"

[[income_plans]]
price_per_sqm = 1400.0
period_begin = "2025-09-01"
period_end = "2026-03-01"
"#;

const UNITS_JSON: &str = r#"[
    { "id": "a", "floor": 1, "unitNumber": "101", "area": 42.5, "attributes": { "view": "sea" } },
    { "id": "b", "floor": 2, "unit_number": "201", "area": 55.0, "attributes": { "view": "yard" } },
    { "id": "c", "floor": 3, "unit_number": "301", "area": 61.0, "status": "sold",
      "attributes": { "view": "wall" }, "price_per_sqm": 1100.0 }
]"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_temp(FULL_CONFIG);
    let config = RunConfig::load(file.path()).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.pricing.strategy, PricingStrategy::BoundClamp);
    assert_eq!(config.pricing.calibration, CalibrationMode::MedianSplit);
    assert_eq!(config.static_params.bargain_gap, 5.0);
    assert_eq!(config.static_params.oversold_method, OversoldMethod::Area);
    assert_eq!(config.distribution.kind, "bimodal");
    assert_eq!(config.income_plans.len(), 2);
    assert!(config.income_plans[1].period_end.is_some());

    let importance = config.importance_config();
    assert!((importance.weight("floor") - 0.75).abs() < 1e-12);
    assert!((importance.total_weight() - 1.0).abs() < 1e-9);
}

#[test]
fn test_priority_tables_are_resequenced() {
    let config = RunConfig::from_toml_str(FULL_CONFIG).unwrap();
    let tables = config.priority_table_map();
    let view = &tables["view"];

    assert_eq!(view.groups()[0].name, "sea");
    assert_eq!(view.priority_of(&AttributeValue::from("wall")), Some(2));
    assert_eq!(view.max_priority(), 2);
}

#[test]
fn test_missing_config_file() {
    let err = RunConfig::load(Path::new("/nonexistent/upa/config.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_load_units_with_aliases() {
    let file = write_temp(UNITS_JSON);
    let units = load_units(file.path()).unwrap();

    assert_eq!(units.len(), 3);
    assert_eq!(units[0].unit_number, "101");
    assert_eq!(units[0].status, UnitStatus::Available);
    assert_eq!(units[2].status, UnitStatus::Sold);
    assert_eq!(units[2].committed_price_per_sqm, Some(1100.0));
    assert_eq!(units[1].attribute("view"), Some(AttributeValue::from("yard")));
}

#[test]
fn test_duplicate_unit_ids_rejected() {
    let file = write_temp(r#"[{ "id": "a", "area": 10.0 }, { "id": "a", "area": 12.0 }]"#);
    let err = load_units(file.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_malformed_units_json() {
    let file = write_temp("{ not json");
    assert!(matches!(load_units(file.path()).unwrap_err(), Error::Json(_)));
}

#[test]
fn test_config_and_units_price_end_to_end() {
    let config = RunConfig::from_toml_str(FULL_CONFIG).unwrap();
    let units_file = write_temp(UNITS_JSON);
    let units = load_units(units_file.path()).unwrap();

    let table = price_units(&config.pricing_input(units));
    assert_eq!(table.len(), 2);
    assert_eq!(table.summary.strategy, PricingStrategy::BoundClamp);
    assert_eq!(table.summary.distribution, "Bimodal");
    for row in &table.rows {
        assert!(row.final_price >= 800.0 && row.final_price <= 1200.0);
        assert_eq!(row.committed_price, row.final_price);
    }
}

#[test]
#[serial]
fn test_resolve_prefers_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/upa-from-env.toml");
    let cli = PathBuf::from("/tmp/upa-from-cli.toml");

    let resolved = resolve_config_path(Some(&cli), CONFIG_ENV_VAR).unwrap();
    assert_eq!(resolved, cli);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_uses_env_var() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.toml");
    env::set_var(CONFIG_ENV_VAR, &path);

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR).unwrap();
    assert_eq!(resolved, path);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_ignores_blank_env_var() {
    env::set_var(CONFIG_ENV_VAR, "   ");
    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);

    // Falls through to the platform default, which may or may not exist
    match resolved {
        Ok(path) => assert!(path.ends_with("upa/config.toml")),
        Err(e) => assert!(matches!(e, Error::Config(_))),
    }

    env::remove_var(CONFIG_ENV_VAR);
}
