/// quick start - register a member, build a schedule, take a payment
use installment_allocation::chrono::NaiveDate;
use installment_allocation::views::ScheduleView;
use installment_allocation::{
    AllocationEngine, EngineConfig, GenerateRequest, MemberRegistry, MemoryStore, Money,
    NewMember, PaymentRequest, SafeTimeProvider, ScheduleGenerator, Store, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    installment_allocation::init_tracing();

    let store = MemoryStore::new();
    let config = EngineConfig::default();
    let time = SafeTimeProvider::new(TimeSource::System);

    // register a member of stage 1
    let member = MemberRegistry::new(&store).register(
        NewMember {
            national_id: "45879632".to_string(),
            stage: 1,
            given_names: "Julio".to_string(),
            paternal_surname: "Ccori".to_string(),
            maternal_surname: "Huaman".to_string(),
            block: Some("A".to_string()),
            lot: Some("4".to_string()),
            total_obligation: Money::from_major(300),
        },
        &time,
    )?;

    // three installments of 100.00
    let outcome = ScheduleGenerator::new(&store, &config).generate(
        GenerateRequest {
            member_id: member.id,
            contract_id: None,
            total_amount: Money::from_major(300),
            count: 3,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).ok_or("bad date")?,
            end_date: NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("bad date")?,
        },
        &time,
    )?;

    // pay the first one
    AllocationEngine::new(&store, &config).allocate(
        PaymentRequest::new(member.id, Money::from_major(100)).targeting(outcome.installments[0].id),
        &time,
    )?;

    let installments = store.read(|r| r.installments_for_member(member.id))?;
    println!("{}", ScheduleView::new(&member, &installments).to_json_pretty()?);

    Ok(())
}
