//! Legal parameter lifecycle and employee uniqueness rules.

mod common;

use common::{at, day, TestApp};
use planilla::errors::AppError;
use planilla::models::{
    GenerateStubRequest, ParameterCategory, ParameterStatus, ParameterType,
};
use planilla::store::{NewEmployee, NewLegalParameter, ParameterRevision, PayrollStore};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn parameter_revision_affects_later_stubs_only() {
    let app = TestApp::seeded().await;
    let employee = app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let request = |pay_period| GenerateStubRequest {
        employee_id: employee.id,
        pay_period,
        payment_date: Some(pay_period),
        base_salary: dec!(2400),
        working_days: None,
        days_worked: None,
        payroll_type: None,
        sub_period: None,
        deductions: vec![],
        allowances: vec![],
    };

    let (june_stub, _) = app
        .service
        .generate_stub(app.company_id, request(day(2024, 6, 15)), at(2024, 6, 15))
        .await
        .expect("june stub");
    assert_eq!(june_stub.social_security, dec!(210.00));

    // revise the employee social security rate to 9.75%
    let sss = app
        .store
        .find_active_parameters(app.company_id, Some(ParameterCategory::SocialSecurity))
        .await
        .expect("list parameters")
        .into_iter()
        .find(|p| p.key == "sss_employee")
        .expect("sss parameter");
    let successor = app
        .store
        .supersede_parameter(
            app.company_id,
            sss.id,
            ParameterRevision {
                percentage: dec!(9.75),
                min_range: None,
                max_range: None,
                description: None,
                effective_date: day(2024, 7, 1),
            },
        )
        .await
        .expect("supersede");
    assert_eq!(successor.percentage, dec!(9.75));
    assert_eq!(successor.status, ParameterStatus::Active);

    // the original row is deactivated, never mutated
    let old = app
        .store
        .find_parameter(app.company_id, sss.id)
        .await
        .expect("find parameter")
        .expect("old row still exists");
    assert_eq!(old.status, ParameterStatus::Inactive);
    assert_eq!(old.percentage, dec!(8.75));

    // a later stub picks up the new rate; the June stub is untouched
    let (july_stub, _) = app
        .service
        .generate_stub(app.company_id, request(day(2024, 7, 15)), at(2024, 7, 15))
        .await
        .expect("july stub");
    assert_eq!(july_stub.social_security, dec!(234.00));

    let june_again = app
        .store
        .find_stub(app.company_id, june_stub.id)
        .await
        .expect("find stub")
        .expect("stub exists");
    assert_eq!(june_again.stub.social_security, dec!(210.00));
}

#[tokio::test]
async fn duplicate_key_and_effective_date_is_a_conflict() {
    let app = TestApp::seeded().await;
    let err = app
        .store
        .create_parameter(NewLegalParameter {
            company_id: app.company_id,
            key: "sss_employee".to_string(),
            name: "Duplicate".to_string(),
            category: ParameterCategory::SocialSecurity,
            param_type: ParameterType::Employee,
            percentage: dec!(9.00),
            min_range: None,
            max_range: None,
            description: None,
            effective_date: day(2024, 1, 1),
        })
        .await
        .expect_err("duplicate must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn only_inactive_parameters_can_be_deleted() {
    let app = TestApp::seeded().await;
    let param = app
        .store
        .find_active_parameters(app.company_id, Some(ParameterCategory::EducationalInsurance))
        .await
        .expect("list parameters")
        .pop()
        .expect("educational parameter");

    let err = app
        .store
        .delete_parameter(app.company_id, param.id)
        .await
        .expect_err("active parameter must not be deletable");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    app.store
        .set_parameter_status(app.company_id, param.id, ParameterStatus::Inactive)
        .await
        .expect("deactivate");
    app.store
        .delete_parameter(app.company_id, param.id)
        .await
        .expect("delete inactive parameter");
    assert!(app
        .store
        .find_parameter(app.company_id, param.id)
        .await
        .expect("find parameter")
        .is_none());
}

#[tokio::test]
async fn cedula_is_unique_within_a_company() {
    let app = TestApp::seeded().await;
    app.employee("8-123-456", dec!(2400), day(2020, 2, 15)).await;

    let err = app
        .store
        .create_employee(NewEmployee {
            company_id: app.company_id,
            cedula: "8-123-456".to_string(),
            first_name: "Bela".to_string(),
            last_name: "Diaz".to_string(),
            email: "bela@acme.test".to_string(),
            position: None,
            base_salary: dec!(1800),
            hire_date: day(2023, 5, 1),
            access_user_id: None,
        })
        .await
        .expect_err("duplicate cedula must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn access_user_links_at_most_one_employee() {
    let app = TestApp::seeded().await;
    let user_id = Uuid::new_v4();

    let new = |cedula: &str| NewEmployee {
        company_id: app.company_id,
        cedula: cedula.to_string(),
        first_name: "Ana".to_string(),
        last_name: "Reyes".to_string(),
        email: format!("{}@acme.test", cedula),
        position: None,
        base_salary: dec!(2000),
        hire_date: day(2022, 3, 1),
        access_user_id: Some(user_id),
    };
    app.store.create_employee(new("8-111-111")).await.expect("first link");
    let err = app
        .store
        .create_employee(new("8-222-222"))
        .await
        .expect_err("second link must be refused");
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}
