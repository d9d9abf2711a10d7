use chrono::{Duration, NaiveDate};
use saas_bi_core::{
    clock::{month_start, next_month_start, ReportingClock},
    error::PipelineError,
    lifecycle::CustomerLifecycle,
    pipeline::PipelineEngine,
    plan_catalog::PlanCatalog,
    revenue::RevenueLedgerBuilder,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn now() -> NaiveDate {
    d(2024, 6, 15)
}

fn basic_customer(signup: NaiveDate) -> CustomerLifecycle {
    CustomerLifecycle {
        customer_id: 1,
        signup_date: signup,
        original_plan_id: 1,
        current_plan_id: 1,
        cancel_date: None,
        upgrade_date: None,
        cac: 250.0,
    }
}

fn ledger(customer: &CustomerLifecycle) -> Vec<saas_bi_core::revenue::RevenueRecord> {
    let catalog = PlanCatalog::default();
    RevenueLedgerBuilder::new(&catalog, ReportingClock::new(now()))
        .customer_months(customer)
        .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// Signup 100 days ago on Basic: one row per calendar month through the
/// reporting month, each at 50 MRR / 600 ARR.
#[test]
fn never_churned_basic_customer_billed_every_month() {
    let signup = now() - Duration::days(100); // 2024-03-07
    let rows = ledger(&basic_customer(signup));

    let months: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(months, vec![d(2024, 3, 1), d(2024, 4, 1), d(2024, 5, 1), d(2024, 6, 1)]);
    for r in &rows {
        assert_eq!(r.mrr, 50.0);
        assert_eq!(r.arr, 600.0);
        assert_eq!(r.customer_id, 1);
    }
}

/// Cancelling inside the signup month still bills that month once.
#[test]
fn cancel_in_signup_month_still_bills_once() {
    let customer = CustomerLifecycle {
        cancel_date: Some(d(2024, 2, 25)),
        ..basic_customer(d(2024, 2, 3))
    };
    let rows = ledger(&customer);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, d(2024, 2, 1));
}

/// Billing stops at the cancellation month, inclusive.
#[test]
fn churned_customer_billed_through_cancel_month() {
    let customer = CustomerLifecycle {
        cancel_date: Some(d(2024, 4, 2)),
        ..basic_customer(d(2024, 1, 20))
    };
    let months: Vec<NaiveDate> = ledger(&customer).iter().map(|r| r.date).collect();
    assert_eq!(months, vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1), d(2024, 4, 1)]);
}

/// An upgrade dated exactly on a month boundary bills that month on the new plan.
#[test]
fn upgrade_on_month_boundary_bills_new_plan_that_month() {
    let customer = CustomerLifecycle {
        current_plan_id: 3,
        upgrade_date: Some(d(2024, 4, 1)),
        ..basic_customer(d(2024, 2, 10))
    };
    let fees: Vec<(NaiveDate, f64)> = ledger(&customer).iter().map(|r| (r.date, r.mrr)).collect();
    assert_eq!(
        fees,
        vec![
            (d(2024, 2, 1), 50.0),
            (d(2024, 3, 1), 50.0),
            (d(2024, 4, 1), 250.0),
            (d(2024, 5, 1), 250.0),
            (d(2024, 6, 1), 250.0),
        ]
    );
}

/// A mid-month upgrade switches from that month onward.
#[test]
fn mid_month_upgrade_switches_in_its_month() {
    let customer = CustomerLifecycle {
        current_plan_id: 2,
        upgrade_date: Some(d(2024, 5, 19)),
        ..basic_customer(d(2024, 3, 30))
    };
    let fees: Vec<f64> = ledger(&customer).iter().map(|r| r.mrr).collect();
    assert_eq!(fees, vec![50.0, 50.0, 100.0, 100.0]);
}

/// A plan id missing from the catalog is fatal, not silently defaulted.
#[test]
fn unknown_plan_is_fatal() {
    let customer = CustomerLifecycle {
        original_plan_id: 7,
        current_plan_id: 7,
        ..basic_customer(d(2024, 5, 1))
    };
    let catalog = PlanCatalog::default();
    let err = RevenueLedgerBuilder::new(&catalog, ReportingClock::new(now()))
        .build(&[customer])
        .unwrap_err();
    assert!(matches!(err, PipelineError::PlanNotFound { plan_id: 7 }), "{err}");
}

// ── Generated population ─────────────────────────────────────────────────────

/// For every generated customer, coverage is contiguous from the signup month
/// through the churn/horizon month, and each fee matches the plan in force.
#[test]
fn generated_ledger_is_contiguous_and_priced_by_plan_in_force() {
    let clock = ReportingClock::new(now());
    for seed in [1u64, 42, 1234] {
        let engine = PipelineEngine::build_test(seed, clock).unwrap();
        let output = engine.run().unwrap();
        let schema = &output.schema;

        for c in &schema.dim_customer {
            let rows: Vec<_> = schema
                .fact_revenue
                .iter()
                .filter(|r| r.customer_id == c.customer_id)
                .collect();

            let last = month_start(c.cancel_date.unwrap_or(now()));
            let mut expected = month_start(c.signup_date);
            for r in &rows {
                assert_eq!(r.date, expected, "gap or duplicate for {c:?}");

                let plan = match c.upgrade_date {
                    Some(u) if r.date >= month_start(u) => c.current_plan_id,
                    _ => c.original_plan_id,
                };
                let fee = engine.catalog().monthly_fee(plan).unwrap();
                assert_eq!(r.mrr, fee, "wrong fee in {} for {c:?}", r.date);
                assert_eq!(r.arr, fee * 12.0);

                expected = next_month_start(expected).unwrap();
            }
            assert_eq!(rows.last().map(|r| r.date), Some(last), "{c:?}");
        }
    }
}
