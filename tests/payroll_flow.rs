//! End-to-end payroll generation tests over the in-memory store: stub and
//! batch generation, run lifecycle, and the totals invariants.

mod common;

use common::{at, day, TestApp};
use planilla::errors::AppError;
use planilla::models::{
    BatchStubInput, GenerateBatchRequest, GenerateStubRequest, PayrollType, RunStatus, StubFilter,
    StubStatus,
};
use planilla::store::PayrollStore;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn stub_request(employee_id: Uuid, pay_period: chrono::NaiveDate) -> GenerateStubRequest {
    GenerateStubRequest {
        employee_id,
        pay_period,
        payment_date: Some(pay_period),
        base_salary: dec!(2400),
        working_days: None,
        days_worked: None,
        payroll_type: None,
        sub_period: None,
        deductions: vec![],
        allowances: vec![],
    }
}

#[tokio::test]
async fn generate_stub_computes_panama_deductions() {
    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let (stub, run) = app
        .service
        .generate_stub(app.company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("generate stub");

    assert_eq!(stub.prorated_salary, dec!(2400.00));
    assert_eq!(stub.social_security, dec!(210.00));
    // educational insurance (1.25%) is carried as an other deduction
    assert_eq!(stub.other_deductions, dec!(30.00));
    // taxable 2190 sits inside the exempt ISR bracket
    assert_eq!(stub.income_tax, dec!(0));
    assert_eq!(stub.total_deductions, dec!(240.00));
    assert_eq!(stub.net_salary, dec!(2160.00));
    assert_eq!(stub.status, StubStatus::Draft);
    assert!(stub.payroll_number.starts_with("PR-"));

    // the owning run was created on demand and already carries the totals
    assert_eq!(run.period_date, day(2024, 6, 1));
    assert_eq!(run.status, RunStatus::Draft);
    assert_eq!(run.stub_count, 1);
    assert_eq!(run.total_gross, dec!(2400.00));
    assert_eq!(run.total_net, dec!(2160.00));
}

#[tokio::test]
async fn stubs_in_the_same_month_share_one_run() {
    let app = TestApp::seeded().await;
    let first = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    let second = app.employee("8-222-222", dec!(1800), day(2021, 1, 1)).await;

    let (_, run_a) = app
        .service
        .generate_stub(app.company_id, stub_request(first.id, day(2024, 6, 3)), at(2024, 6, 3))
        .await
        .expect("first stub");
    let mut req = stub_request(second.id, day(2024, 6, 28));
    req.base_salary = dec!(1800);
    let (_, run_b) = app
        .service
        .generate_stub(app.company_id, req, at(2024, 6, 28))
        .await
        .expect("second stub");

    assert_eq!(run_a.id, run_b.id);
    assert_eq!(run_b.stub_count, 2);
    assert_eq!(run_b.total_gross, dec!(2400.00) + dec!(1800.00));
}

#[tokio::test]
async fn duplicate_stub_for_the_same_period_is_a_conflict() {
    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    app.service
        .generate_stub(app.company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("first stub");
    let err = app
        .service
        .generate_stub(app.company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 16))
        .await
        .expect_err("duplicate must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn rejected_stubs_stay_in_run_totals() {
    let app = TestApp::seeded().await;
    let first = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    let second = app.employee("8-222-222", dec!(2400), day(2020, 1, 1)).await;

    let (stub, _) = app
        .service
        .generate_stub(app.company_id, stub_request(first.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("first stub");
    app.service
        .generate_stub(app.company_id, stub_request(second.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("second stub");

    let (rejected, run) = app
        .service
        .reject_stub(app.company_id, stub.id, at(2024, 6, 20))
        .await
        .expect("reject stub");
    assert_eq!(rejected.status, StubStatus::Rejected);

    // rejection does not shrink the run: both stubs still count
    assert_eq!(run.stub_count, 2);
    assert_eq!(run.total_net, dec!(2160.00) * dec!(2));

    // a full recompute is a no-op on an already consistent run
    let recomputed = app
        .service
        .recompute_run(app.company_id, run.id)
        .await
        .expect("recompute");
    assert_eq!(recomputed.total_gross, run.total_gross);
    assert_eq!(recomputed.total_net, run.total_net);
    assert_eq!(recomputed.stub_count, run.stub_count);
}

#[tokio::test]
async fn batch_skips_bad_inputs_and_creates_the_rest() {
    let app = TestApp::seeded().await;
    let good = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    let inactive = app.employee("8-222-222", dec!(2400), day(2020, 1, 1)).await;
    app.store
        .deactivate_employee(app.company_id, inactive.id)
        .await
        .expect("deactivate");
    let unknown = Uuid::new_v4();

    let input = |employee_id| BatchStubInput {
        employee_id,
        base_salary: None,
        working_days: None,
        days_worked: None,
        deductions: vec![],
        allowances: vec![],
    };
    let result = app
        .service
        .generate_batch(
            app.company_id,
            GenerateBatchRequest {
                period_date: day(2024, 6, 1),
                payment_date: Some(day(2024, 6, 30)),
                sub_period: None,
                payroll_type: None,
                stubs: vec![input(good.id), input(inactive.id), input(unknown)],
            },
            at(2024, 6, 30),
        )
        .await
        .expect("batch");

    assert_eq!(result.created, 1);
    assert_eq!(result.skipped, 2);
    let run = result.run.expect("run created");
    assert_eq!(run.stub_count, 1);
    let reasons: Vec<&str> = result.skips.iter().map(|s| s.reason.as_str()).collect();
    assert!(reasons.iter().any(|r| r.contains("inactive")), "reasons: {:?}", reasons);
    assert!(reasons.iter().any(|r| r.contains("not found")), "reasons: {:?}", reasons);
}

#[tokio::test]
async fn malformed_bracket_table_fails_the_whole_batch() {
    use planilla::models::{ParameterCategory, ParameterType};
    use planilla::store::NewLegalParameter;

    let app = TestApp::empty().await;
    let employee = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    // two brackets covering overlapping income ranges
    for (ordinal, min, max) in [(1, dec!(0), dec!(12000)), (2, dec!(6000), dec!(36000))] {
        app.store
            .create_parameter(NewLegalParameter {
                company_id: app.company_id,
                key: format!("isr_bracket_{}", ordinal),
                name: format!("ISR bracket {}", ordinal),
                category: ParameterCategory::Isr,
                param_type: ParameterType::Employee,
                percentage: dec!(15),
                min_range: Some(min),
                max_range: Some(max),
                description: None,
                effective_date: day(2024, 1, 1),
            })
            .await
            .expect("seed bracket");
    }

    let err = app
        .service
        .generate_batch(
            app.company_id,
            GenerateBatchRequest {
                period_date: day(2024, 6, 1),
                payment_date: None,
                sub_period: None,
                payroll_type: None,
                stubs: vec![BatchStubInput {
                    employee_id: employee.id,
                    base_salary: None,
                    working_days: None,
                    days_worked: None,
                    deductions: vec![],
                    allowances: vec![],
                }],
            },
            at(2024, 6, 30),
        )
        .await
        .expect_err("bad brackets must fail the batch");
    assert!(matches!(err, AppError::Configuration(_)), "got {:?}", err);

    // the failure happened before any run was created
    let runs = app.store.list_runs(app.company_id).await.expect("list runs");
    assert!(runs.is_empty());
}

#[tokio::test]
async fn concurrent_generation_converges_on_one_run() {
    let app = TestApp::seeded().await;
    let mut employees = Vec::new();
    for i in 0..8 {
        employees.push(app.employee(&format!("8-{:03}-000", i), dec!(2400), day(2020, 1, 1)).await);
    }

    let mut handles = Vec::new();
    for employee in employees {
        let service = app.service.clone();
        let company_id = app.company_id;
        handles.push(tokio::spawn(async move {
            service
                .generate_stub(company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 15))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("generate stub");
    }

    let runs = app.store.list_runs(app.company_id).await.expect("list runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].stub_count, 8);
}

#[tokio::test]
async fn approved_run_is_terminal() {
    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let (stub, run) = app
        .service
        .generate_stub(app.company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("generate stub");
    let run = app
        .service
        .approve_run(app.company_id, run.id)
        .await
        .expect("approve run");
    assert_eq!(run.status, RunStatus::Approved);

    // stubs of an approved run can no longer change status
    let err = app
        .service
        .reject_stub(app.company_id, stub.id, at(2024, 6, 20))
        .await
        .expect_err("stub change after run approval must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    // and the approval itself is one-shot
    let err = app
        .service
        .approve_run(app.company_id, run.id)
        .await
        .expect_err("second approval must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn approved_run_refuses_new_stubs() {
    let app = TestApp::seeded().await;
    let first = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    let second = app.employee("8-222-222", dec!(2400), day(2020, 1, 1)).await;

    let (_, run) = app
        .service
        .generate_stub(app.company_id, stub_request(first.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("first stub");
    let run = app
        .service
        .approve_run(app.company_id, run.id)
        .await
        .expect("approve run");
    assert_eq!(run.total_net, dec!(2160.00));

    // a stub for the same period key must not land in the approved run
    let err = app
        .service
        .generate_stub(app.company_id, stub_request(second.id, day(2024, 6, 20)), at(2024, 6, 20))
        .await
        .expect_err("stub into approved run must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    // and its totals are exactly what was approved
    let frozen = app
        .store
        .find_run(app.company_id, run.id)
        .await
        .expect("find run")
        .expect("run exists");
    assert_eq!(frozen.stub_count, 1);
    assert_eq!(frozen.total_net, dec!(2160.00));

    // a different sub-period is a different run key and goes through
    let mut req = stub_request(second.id, day(2024, 6, 20));
    req.sub_period = Some(2);
    let (_, correction_run) = app
        .service
        .generate_stub(app.company_id, req, at(2024, 6, 20))
        .await
        .expect("correction stub under a new key");
    assert_ne!(correction_run.id, run.id);
}

#[tokio::test]
async fn batch_into_approved_run_is_refused() {
    let app = TestApp::seeded().await;
    let first = app.employee("8-111-111", dec!(2400), day(2020, 1, 1)).await;
    let second = app.employee("8-222-222", dec!(2400), day(2020, 1, 1)).await;

    let (_, run) = app
        .service
        .generate_stub(app.company_id, stub_request(first.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("first stub");
    app.service
        .approve_run(app.company_id, run.id)
        .await
        .expect("approve run");

    let err = app
        .service
        .generate_batch(
            app.company_id,
            GenerateBatchRequest {
                period_date: day(2024, 6, 1),
                payment_date: None,
                sub_period: None,
                payroll_type: None,
                stubs: vec![BatchStubInput {
                    employee_id: second.id,
                    base_salary: None,
                    working_days: None,
                    days_worked: None,
                    deductions: vec![],
                    allowances: vec![],
                }],
            },
            at(2024, 6, 20),
        )
        .await
        .expect_err("batch into approved run must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn all_skip_batch_leaves_no_run_behind() {
    let app = TestApp::seeded().await;

    let result = app
        .service
        .generate_batch(
            app.company_id,
            GenerateBatchRequest {
                period_date: day(2024, 6, 1),
                payment_date: None,
                sub_period: None,
                payroll_type: None,
                stubs: vec![BatchStubInput {
                    employee_id: Uuid::new_v4(),
                    base_salary: None,
                    working_days: None,
                    days_worked: None,
                    deductions: vec![],
                    allowances: vec![],
                }],
            },
            at(2024, 6, 30),
        )
        .await
        .expect("batch");
    assert_eq!(result.created, 0);
    assert_eq!(result.skipped, 1);
    assert!(result.run.is_none());

    let runs = app.store.list_runs(app.company_id).await.expect("list runs");
    assert!(runs.is_empty());
}

#[tokio::test]
async fn stub_status_changes_only_from_draft() {
    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let (stub, _) = app
        .service
        .generate_stub(app.company_id, stub_request(employee.id, day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("generate stub");
    let (approved, _) = app
        .service
        .approve_stub(app.company_id, stub.id, "hr@acme.test".to_string(), at(2024, 6, 20))
        .await
        .expect("approve stub");
    assert_eq!(approved.status, StubStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("hr@acme.test"));
    assert!(approved.approval_date.is_some());

    let err = app
        .service
        .reject_stub(app.company_id, stub.id, at(2024, 6, 21))
        .await
        .expect_err("approved stub cannot be rejected");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn thirteenth_month_batch_prorates_for_mid_year_hires() {
    let app = TestApp::seeded().await;
    let veteran = app.employee("8-111-111", dec!(2400), day(2019, 7, 1)).await;
    let newcomer = app.employee("8-222-222", dec!(2400), day(2024, 3, 1)).await;

    let input = |employee_id| BatchStubInput {
        employee_id,
        base_salary: None,
        working_days: None,
        days_worked: None,
        deductions: vec![],
        allowances: vec![],
    };
    let result = app
        .service
        .generate_batch(
            app.company_id,
            GenerateBatchRequest {
                period_date: day(2024, 12, 1),
                payment_date: Some(day(2024, 12, 15)),
                sub_period: None,
                payroll_type: Some(PayrollType::ThirteenthMonth),
                stubs: vec![input(veteran.id), input(newcomer.id)],
            },
            at(2024, 12, 15),
        )
        .await
        .expect("batch");
    assert_eq!(result.created, 2);
    let run = result.run.expect("run created");
    assert_eq!(run.payroll_type, PayrollType::ThirteenthMonth);

    let stubs = app
        .store
        .list_stubs(
            app.company_id,
            StubFilter {
                run_id: Some(run.id),
                ..StubFilter::default()
            },
        )
        .await
        .expect("list stubs");
    assert_eq!(stubs.len(), 2);

    let veteran_stub = stubs.iter().find(|s| s.employee_id == veteran.id).expect("veteran stub");
    assert_eq!(veteran_stub.bonus_amount, dec!(2400.00));
    assert_eq!(
        veteran_stub.bonus_note.as_deref(),
        Some("Full thirteenth month (12 months worked)")
    );

    let newcomer_stub = stubs.iter().find(|s| s.employee_id == newcomer.id).expect("newcomer stub");
    assert_eq!(newcomer_stub.bonus_amount, dec!(2200.00));
    assert_eq!(
        newcomer_stub.bonus_note.as_deref(),
        Some("Prorated thirteenth month: 11 months worked this year")
    );
}

#[tokio::test]
async fn itemized_rows_survive_the_round_trip() {
    use planilla::models::{AllowanceInput, DeductionInput};

    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let mut req = stub_request(employee.id, day(2024, 6, 15));
    req.deductions = vec![DeductionInput {
        deduction_type: Some("LOAN".to_string()),
        description: Some("Company loan repayment".to_string()),
        amount: dec!(75.50),
        is_fixed: Some(true),
    }];
    req.allowances = vec![AllowanceInput {
        allowance_type: Some("TRANSPORT".to_string()),
        description: None,
        amount: dec!(120.00),
    }];

    let (stub, _) = app
        .service
        .generate_stub(app.company_id, req, at(2024, 6, 15))
        .await
        .expect("generate stub");
    assert_eq!(stub.total_allowances, dec!(120.00));
    assert_eq!(stub.gross_salary, dec!(2520.00));
    // 210.00 SSS + 30.00 educational + 75.50 loan
    assert_eq!(stub.total_deductions, dec!(315.50));

    let detail = app
        .store
        .find_stub(app.company_id, stub.id)
        .await
        .expect("find stub")
        .expect("stub exists");
    assert_eq!(detail.deductions.len(), 1);
    assert_eq!(detail.deductions[0].deduction_type, "LOAN");
    assert!(detail.deductions[0].is_fixed);
    assert_eq!(detail.allowances.len(), 1);
    assert_eq!(detail.allowances[0].amount, dec!(120.00));
}
