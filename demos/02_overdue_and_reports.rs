/// overdue and reports - time passes, installments fall behind, reports summarize
use installment_allocation::chrono::{Duration, NaiveDate, TimeZone, Utc};
use installment_allocation::views::ScheduleView;
use installment_allocation::{
    AllocationEngine, EngineConfig, GenerateRequest, MemberRegistry, MemoryStore, Money,
    NewMember, PaymentRequest, ReportQuery, ReportingAggregator, SafeTimeProvider,
    ScheduleGenerator, ScheduleReconciler, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== overdue and reports example ===\n");

    let store = MemoryStore::new();
    let config = EngineConfig::default();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let registry = MemberRegistry::new(&store);
    let generator = ScheduleGenerator::new(&store, &config);
    let mut members = Vec::new();
    for (national_id, name) in [("41000001", "Ana"), ("41000002", "Luis"), ("41000003", "Marta")] {
        let member = registry.register(
            NewMember {
                national_id: national_id.to_string(),
                stage: 1,
                given_names: name.to_string(),
                paternal_surname: "Torres".to_string(),
                maternal_surname: "Vilca".to_string(),
                block: None,
                lot: None,
                total_obligation: Money::from_major(1_200),
            },
            &time,
        )?;
        generator.generate(
            GenerateRequest {
                member_id: member.id,
                contract_id: None,
                total_amount: Money::from_major(1_200),
                count: 12,
                start_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            },
            &time,
        )?;
        members.push(member);
    }

    // the first member pays three installments up front
    let engine = AllocationEngine::new(&store, &config);
    engine.allocate(PaymentRequest::new(members[0].id, Money::from_major(300)), &time)?;

    // the second pays late
    controller.advance(Duration::days(40));
    engine.allocate(PaymentRequest::new(members[1].id, Money::from_major(100)), &time)?;
    println!("now: {}", time.now().format("%Y-%m-%d"));

    // reading a schedule marks stale installments overdue
    controller.advance(Duration::days(60));
    let reconciler = ScheduleReconciler::new(&store);
    for member in &members {
        let installments = reconciler.schedule_for_member(member.id, &time)?;
        let view = ScheduleView::new(member, &installments);
        let overdue = view
            .installments
            .iter()
            .filter(|i| i.status == installment_allocation::InstallmentStatus::Overdue)
            .count();
        println!("{}: paid {} of {}, {} overdue", view.member_name, view.total_paid, view.total_due, overdue);
    }

    let reports = ReportingAggregator::new(&store);

    let compliance = reports.compliance(ReportQuery::new(1), &time)?;
    println!("\ncompliance {}..{}", compliance.window.start, compliance.window.end);
    println!("  on time: {} ({}%)", compliance.on_time.count, compliance.on_time.percentage);
    println!("  late:    {} ({}%)", compliance.late.count, compliance.late.percentage);
    println!("  unpaid:  {} ({}%)", compliance.unpaid.count, compliance.unpaid.percentage);

    let first_quarter = ReportQuery::new(1).between(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    );
    let income = reports.income(first_quarter, &time)?;
    println!(
        "\nq1 income: projected {}, collected {}, difference {} ({}%)",
        income.projected, income.collected, income.difference, income.collected_percentage
    );

    println!("\ndebt by member:");
    for debt in reports.member_debts(1)? {
        println!(
            "  {} {}: debt {} ({} overdue, {}% paid)",
            debt.national_id, debt.full_name, debt.debt, debt.overdue_installments, debt.compliance
        );
    }

    Ok(())
}
