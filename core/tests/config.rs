use chrono::NaiveDate;
use saas_bi_core::{
    clock::ReportingClock,
    config::{AmountRange, DayRange, PipelineConfig},
    error::PipelineError,
    pipeline::PipelineEngine,
};
use std::io::Write;

fn clock() -> ReportingClock {
    ReportingClock::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
}

fn assert_config_error(config: PipelineConfig) {
    match PipelineEngine::new(config, clock()) {
        Err(PipelineError::Configuration { .. }) => {}
        Err(other) => panic!("expected configuration error, got {other}"),
        Ok(_) => panic!("expected configuration error, got a valid engine"),
    }
}

#[test]
fn defaults_are_valid() {
    PipelineConfig::default().validate().unwrap();
    PipelineConfig::default_test().validate().unwrap();
}

#[test]
fn zero_windows_are_rejected_before_generation() {
    assert_config_error(PipelineConfig {
        usage_window_days: 0,
        ..PipelineConfig::default()
    });
    assert_config_error(PipelineConfig {
        signup_window_days: 0,
        ..PipelineConfig::default()
    });
}

#[test]
fn bad_probabilities_and_ranges_are_rejected() {
    assert_config_error(PipelineConfig {
        churn_probability: 1.5,
        ..PipelineConfig::default()
    });
    assert_config_error(PipelineConfig {
        upgrade_offset_days: DayRange { min: 300, max: 30 },
        ..PipelineConfig::default()
    });
    assert_config_error(PipelineConfig {
        max_features_per_login: 6,
        ..PipelineConfig::default()
    });
}

/// Offsets and windows beyond a century are rejected up front instead of
/// overflowing date arithmetic mid-run.
#[test]
fn oversized_offsets_and_windows_are_rejected() {
    assert_config_error(PipelineConfig {
        churn_probability: 1.0,
        churn_offset_days: DayRange { min: 0, max: i64::MAX },
        ..PipelineConfig::default_test()
    });
    assert_config_error(PipelineConfig {
        upgrade_offset_days: DayRange { min: 30, max: 36_501 },
        ..PipelineConfig::default_test()
    });
    assert_config_error(PipelineConfig {
        signup_window_days: u32::MAX,
        ..PipelineConfig::default_test()
    });
    assert_config_error(PipelineConfig {
        usage_window_days: 40_000,
        ..PipelineConfig::default_test()
    });
}

/// The largest accepted offset still runs to completion.
#[test]
fn century_offset_runs_without_overflow() {
    let config = PipelineConfig {
        churn_probability: 1.0,
        churn_offset_days: DayRange { min: 0, max: 36_500 },
        ..PipelineConfig::default_test()
    };
    let output = PipelineEngine::new(config, clock()).unwrap().run().unwrap();
    assert_eq!(output.schema.dim_customer.len(), 50);
}

/// Non-finite fees or CAC bounds would leak NaN into kpis.json.
#[test]
fn non_finite_amounts_are_rejected() {
    let mut config = PipelineConfig::default_test();
    config.plans[0].monthly_fee = f64::NAN;
    assert_config_error(config);

    let mut config = PipelineConfig::default_test();
    config.plans[2].monthly_fee = f64::INFINITY;
    assert_config_error(config);

    assert_config_error(PipelineConfig {
        cac_range: AmountRange { min: 100.0, max: f64::NAN },
        ..PipelineConfig::default_test()
    });
    assert_config_error(PipelineConfig {
        cac_range: AmountRange { min: 100.0, max: f64::INFINITY },
        ..PipelineConfig::default_test()
    });
}

#[test]
fn duplicate_plans_are_rejected() {
    let mut config = PipelineConfig::default();
    let dup = config.plans[0].clone();
    config.plans.push(dup);
    assert_config_error(config);
}

/// A partial JSON file keeps the defaults for every field it omits.
#[test]
fn partial_config_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "seed": 9, "customer_count": 10 }}"#).unwrap();

    let config = PipelineConfig::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.seed, 9);
    assert_eq!(config.customer_count, 10);
    assert_eq!(config.usage_window_days, 90);
    assert_eq!(config.plans.len(), 3);
    assert_eq!(config.features.len(), 5);
}

#[test]
fn invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "login_probability": 2.0 }}"#).unwrap();
    assert!(PipelineConfig::load(file.path().to_str().unwrap()).is_err());
}
