/// surplus distribution - one payment spread over several installments
use installment_allocation::chrono::{NaiveDate, TimeZone, Utc};
use installment_allocation::views::PaymentView;
use installment_allocation::{
    AllocationEngine, EngineConfig, EngineError, MemberRegistry, MemoryStore, Money, NewMember,
    PaymentRequest, SafeTimeProvider, ScheduleGenerator, ScheduleLine, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== surplus distribution example ===\n");

    let store = MemoryStore::new();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let member = MemberRegistry::new(&store).register(
        NewMember {
            national_id: "40998877".to_string(),
            stage: 2,
            given_names: "Rosa".to_string(),
            paternal_surname: "Quispe".to_string(),
            maternal_surname: "Mamani".to_string(),
            block: Some("B".to_string()),
            lot: Some("12".to_string()),
            total_obligation: Money::from_major(400),
        },
        &time,
    )?;

    // four monthly installments of 100.00 due on the 10th
    let config = EngineConfig::default();
    let lines = (1..=4)
        .map(|month| ScheduleLine {
            due_date: NaiveDate::from_ymd_opt(2025, month, 10).unwrap(),
            due_amount: Money::from_major(100),
        })
        .collect();
    let schedule = ScheduleGenerator::new(&store, &config).replace(member.id, None, lines, &time)?;
    println!("schedule total: {}", schedule.total());

    // 250.00 aimed at the first installment; the rest flows to #2 and #3
    let engine = AllocationEngine::new(&store, &config);
    let allocation = engine.allocate(
        PaymentRequest::new(member.id, Money::from_major(250))
            .targeting(schedule.installments[0].id)
            .dated(Utc.with_ymd_and_hms(2025, 1, 5, 11, 0, 0).unwrap())
            .with_note("deposito en ventanilla")
            .with_receipt("uploads/voucher-0142.jpg"),
        &time,
    )?;
    for application in &allocation.applications {
        println!(
            "installment #{}: applied {} -> paid {} ({}, {})",
            application.sequence,
            application.applied,
            application.paid_amount,
            application.status,
            application.punctuality
        );
    }
    println!("\n{}", PaymentView::from_allocation(&allocation).to_json_pretty()?);

    // paying more than the remaining debt parks the excess in suspense
    let allocation = engine.allocate(PaymentRequest::new(member.id, Money::from_major(200)), &time)?;
    println!("\nunapplied and held in suspense: {}", allocation.unapplied);

    // a strict engine refuses the same overpayment outright
    let strict = EngineConfig::strict();
    match AllocationEngine::new(&store, &strict).allocate(PaymentRequest::new(member.id, Money::from_major(50)), &time) {
        Err(EngineError::PaymentExceedsDebt { unapplied }) => {
            println!("strict engine rejected payment, {} could not be applied", unapplied)
        }
        other => println!("unexpected result: {:?}", other),
    }

    Ok(())
}
