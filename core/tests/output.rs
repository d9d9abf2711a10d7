use chrono::NaiveDate;
use saas_bi_core::{
    clock::ReportingClock,
    lifecycle::CustomerLifecycle,
    output::{self, ArtifactWriter, CUSTOMER_COLUMNS, REVENUE_COLUMNS},
    pipeline::PipelineEngine,
    revenue::RevenueRecord,
    usage::UsageEvent,
};
use std::fs;

fn clock() -> ReportingClock {
    ReportingClock::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
}

#[test]
fn write_all_produces_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let output = PipelineEngine::build_test(42, clock()).unwrap().run().unwrap();

    let written = ArtifactWriter::new(dir.path()).write_all(&output).unwrap();
    assert_eq!(written.len(), 10);

    for name in ["customers.csv", "usage_logs.csv", "revenue.csv"] {
        assert!(dir.path().join("raw").join(name).is_file(), "missing raw/{name}");
    }
    for name in [
        "dim_customer.csv",
        "dim_plan.csv",
        "dim_time.csv",
        "fact_usage.csv",
        "fact_revenue.csv",
        "feature_adoption_trends.csv",
        "kpis.json",
    ] {
        assert!(dir.path().join("processed").join(name).is_file(), "missing processed/{name}");
    }

    // No temp files left behind.
    for sub in ["raw", "processed"] {
        for entry in fs::read_dir(dir.path().join(sub)).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(!name.to_string_lossy().ends_with(".tmp"), "leftover {name:?}");
        }
    }
}

#[test]
fn header_order_matches_file_contract() {
    let dir = tempfile::tempdir().unwrap();
    let output = PipelineEngine::build_test(1, clock()).unwrap().run().unwrap();
    ArtifactWriter::new(dir.path()).write_all(&output).unwrap();

    let read_header = |rel: &str| {
        let text = fs::read_to_string(dir.path().join(rel)).unwrap();
        text.lines().next().unwrap_or_default().to_string()
    };
    assert_eq!(
        read_header("raw/customers.csv"),
        "customer_id,signup_date,plan_id,current_plan_id,cancel_date,upgrade_date,cac"
    );
    assert_eq!(read_header("raw/usage_logs.csv"), "date,customer_id,feature,usage_count");
    assert_eq!(read_header("raw/revenue.csv"), "date,customer_id,mrr,arr");
    assert_eq!(read_header("processed/dim_plan.csv"), "plan_id,plan_name,monthly_fee");
    assert_eq!(read_header("processed/dim_time.csv"), "date,day,week,month,year");
    assert!(read_header("processed/feature_adoption_trends.csv").starts_with("month,"));
}

/// Absent optional dates serialize as empty fields and read back as None.
#[test]
fn customers_read_back_with_optional_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.csv");
    let customers = vec![
        CustomerLifecycle {
            customer_id: 1,
            signup_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            original_plan_id: 1,
            current_plan_id: 2,
            cancel_date: None,
            upgrade_date: NaiveDate::from_ymd_opt(2024, 3, 9),
            cac: 321.5,
        },
        CustomerLifecycle {
            customer_id: 2,
            signup_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            original_plan_id: 3,
            current_plan_id: 3,
            cancel_date: NaiveDate::from_ymd_opt(2024, 4, 30),
            upgrade_date: None,
            cac: 120.0,
        },
    ];
    output::write_rows(&path, CUSTOMER_COLUMNS, &customers).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("1,2024-01-05,1,2,,2024-03-09,321.5"), "{text}");
    assert!(text.contains("2,2024-02-01,3,3,2024-04-30,,120"), "{text}");

    let back: Vec<CustomerLifecycle> = output::read_rows(&path).unwrap();
    assert_eq!(back, customers);
}

#[test]
fn append_rows_extends_without_second_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revenue.csv");
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    output::write_rows(&path, REVENUE_COLUMNS, &[RevenueRecord::new(day, 1, 50.0)]).unwrap();
    output::append_rows(&path, &[RevenueRecord::new(day, 2, 100.0)]).unwrap();

    let rows: Vec<RevenueRecord> = output::read_rows(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].customer_id, 2);
    assert_eq!(rows[1].arr, 1200.0);
}

/// An empty table still carries its header.
#[test]
fn empty_table_keeps_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage_logs.csv");
    output::write_rows::<UsageEvent>(&path, output::USAGE_COLUMNS, &[]).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "date,customer_id,feature,usage_count");
    let rows: Vec<UsageEvent> = output::read_rows(&path).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn kpis_json_has_the_five_numeric_keys() {
    let dir = tempfile::tempdir().unwrap();
    let output = PipelineEngine::build_test(42, clock()).unwrap().run().unwrap();
    ArtifactWriter::new(dir.path()).write_all(&output).unwrap();

    let text = fs::read_to_string(dir.path().join("processed/kpis.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), 5);
    for key in [
        "churn_rate",
        "average_dau",
        "average_mau",
        "expansion_revenue",
        "ltv_cac_ratio",
    ] {
        assert!(obj[key].is_number(), "{key} is not a number: {}", obj[key]);
    }
}
