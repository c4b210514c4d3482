/// manual schedule - import a paper schedule and read the member statement
use installment_allocation::chrono::{Months, NaiveDate, TimeZone, Utc};
use installment_allocation::views::StatementView;
use installment_allocation::{
    AllocationEngine, ContractContext, EngineConfig, InstallmentStatus, ManualInstallment,
    ManualScheduleRequest, MemberRegistry, MemoryStore, Money, NewMember, PaymentRequest,
    ReportingAggregator, SafeTimeProvider, ScheduleGenerator, ScheduleReconciler, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== manual schedule example ===\n");

    let store = MemoryStore::new();
    let config = EngineConfig::default();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
    ));

    let member = MemberRegistry::new(&store).register(
        NewMember {
            national_id: "43556677".to_string(),
            stage: 3,
            given_names: "Elena".to_string(),
            paternal_surname: "Vargas".to_string(),
            maternal_surname: "Soto".to_string(),
            block: Some("C".to_string()),
            lot: Some("7".to_string()),
            total_obligation: Money::from_major(600),
        },
        &time,
    )?;

    // first two installments were settled before the system existed
    let installments: Vec<ManualInstallment> = (1..=6)
        .map(|sequence| ManualInstallment {
            sequence,
            // september 2024 through february 2025
            due_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap() + Months::new(sequence),
            due_amount: Money::from_major(100),
            paid_amount: None,
            status: (sequence <= 2).then_some(InstallmentStatus::Paid),
        })
        .collect();

    let generator = ScheduleGenerator::new(&store, &config);
    let request = ManualScheduleRequest {
        member_id: member.id,
        installments,
        contract: ContractContext {
            signing_city: Some("Cusco".to_string()),
            signing_date: Some(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()),
            ..ContractContext::default()
        },
    };
    let outcome = generator.create_manual(request.clone(), &time)?;
    println!("imported {} installments into contract {}", outcome.created, outcome.contract_id);

    // running the same import again changes nothing
    let again = generator.create_manual(request, &time)?;
    println!("re-import: {} created, {} skipped", again.created, again.skipped);

    // the overdue ones get paid
    let schedule = ScheduleReconciler::new(&store).schedule_for_contract(outcome.contract_id, &time)?;
    for installment in &schedule {
        println!("  #{} {} {}", installment.sequence, installment.due_date, installment.status);
    }
    AllocationEngine::new(&store, &config).allocate(
        PaymentRequest::new(member.id, Money::from_major(250)).with_note("pago atrasado"),
        &time,
    )?;

    let statement = ReportingAggregator::new(&store).member_statement("43556677", 3)?;
    println!("\n{}", StatementView::from_statement(&statement).to_json_pretty()?);

    Ok(())
}
