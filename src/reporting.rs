use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::{Money, Percentage};
use crate::errors::{EngineError, Result};
use crate::records::{Installment, Member, Payment, PaymentDetail};
use crate::store::{Reader, Store};
use crate::types::{DateWindow, InstallmentStatus, MemberId, Punctuality};

/// stage plus optional window bounds; missing bounds fall back to the current year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub stage: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportQuery {
    pub fn new(stage: u32) -> Self {
        Self {
            stage,
            start: None,
            end: None,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountShare {
    pub count: usize,
    pub percentage: Percentage,
}

/// punctuality of installments due inside the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceBreakdown {
    pub stage: u32,
    pub window: DateWindow,
    pub total: usize,
    pub on_time: CountShare,
    pub late: CountShare,
    pub unpaid: CountShare,
}

/// projected (due) versus collected (paid) income for the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSummary {
    pub stage: u32,
    pub window: DateWindow,
    pub projected: Money,
    pub collected: Money,
    /// collected minus projected
    pub difference: Money,
    pub collected_percentage: Percentage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDebt {
    pub member_id: MemberId,
    pub national_id: String,
    pub full_name: String,
    pub stage: u32,
    pub block: Option<String>,
    pub lot: Option<String>,
    pub total: Money,
    pub paid: Money,
    pub debt: Money,
    pub overdue_installments: usize,
    pub compliance: Percentage,
}

/// one payment detail with the installment it went to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub detail: PaymentDetail,
    /// absent when the installment has since been replaced
    pub installment: Option<Installment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementEntry {
    pub payment: Payment,
    pub lines: Vec<StatementLine>,
}

/// payment history of one member, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatement {
    pub member: Member,
    pub entries: Vec<StatementEntry>,
    pub total_paid: Money,
    pub suspense: Money,
}

/// read-only statistics over a stage
pub struct ReportingAggregator<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> ReportingAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn compliance(&self, query: ReportQuery, time_provider: &SafeTimeProvider) -> Result<ComplianceBreakdown> {
        let window = resolve_window(&query, time_provider)?;

        let installments = self.store.read(|r| stage_installments(r, query.stage))?;
        let in_window: Vec<&Installment> = installments
            .iter()
            .filter(|i| window.contains(i.due_date))
            .collect();

        let total = in_window.len();
        let paid_with = |punctuality: Punctuality| {
            in_window
                .iter()
                .filter(|i| i.status == InstallmentStatus::Paid && i.punctuality == punctuality)
                .count()
        };
        let on_time = paid_with(Punctuality::OnTime);
        let late = paid_with(Punctuality::Late);
        let unpaid = in_window.iter().filter(|i| !i.is_paid()).count();

        debug!(stage = query.stage, total, on_time, late, unpaid, "compliance computed");

        let share = |count: usize| CountShare {
            count,
            percentage: Percentage::of_counts(count, total),
        };
        Ok(ComplianceBreakdown {
            stage: query.stage,
            window,
            total,
            on_time: share(on_time),
            late: share(late),
            unpaid: share(unpaid),
        })
    }

    pub fn income(&self, query: ReportQuery, time_provider: &SafeTimeProvider) -> Result<IncomeSummary> {
        let window = resolve_window(&query, time_provider)?;

        let (projected, collected) = self.store.read(|r| {
            let mut projected = Money::ZERO;
            let mut collected = Money::ZERO;
            for member in r.members_in_stage(query.stage)? {
                projected += r
                    .installments_for_member(member.id)?
                    .iter()
                    .filter(|i| window.contains(i.due_date))
                    .map(|i| i.due_amount)
                    .sum::<Money>();
                collected += r
                    .payments_for_member(member.id)?
                    .iter()
                    .filter(|p| window.contains(p.date.date_naive()))
                    .map(|p| p.amount)
                    .sum::<Money>();
            }
            Ok((projected, collected))
        })?;

        Ok(IncomeSummary {
            stage: query.stage,
            window,
            projected,
            collected,
            difference: collected - projected,
            collected_percentage: collected.percentage_of(projected),
        })
    }

    /// debt per member of the stage over the whole schedule, largest first
    pub fn member_debts(&self, stage: u32) -> Result<Vec<MemberDebt>> {
        check_stage(stage)?;

        let mut debts = self.store.read(|r| {
            r.members_in_stage(stage)?
                .into_iter()
                .map(|member| {
                    let installments = r.installments_for_member(member.id)?;
                    Ok(member_debt(member, &installments))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        debts.sort_by(|a, b| b.debt.cmp(&a.debt).then_with(|| a.national_id.cmp(&b.national_id)));
        Ok(debts)
    }

    pub fn member_statement(&self, national_id: &str, stage: u32) -> Result<MemberStatement> {
        check_stage(stage)?;

        self.store.read(|r| {
            let member = r
                .member_by_key(national_id, stage)?
                .ok_or_else(|| EngineError::MemberKeyNotFound {
                    national_id: national_id.to_string(),
                    stage,
                })?;

            let mut payments = r.payments_for_member(member.id)?;
            payments.sort_by(|a, b| b.date.cmp(&a.date));

            let total_paid = payments.iter().map(|p| p.amount).sum();
            let entries = payments
                .into_iter()
                .map(|payment| {
                    let lines = r
                        .details_for_payment(payment.id)?
                        .into_iter()
                        .map(|detail| {
                            let installment = r.installment(detail.installment_id)?;
                            Ok(StatementLine { detail, installment })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(StatementEntry { payment, lines })
                })
                .collect::<Result<Vec<_>>>()?;
            let suspense = r.suspense_balance(member.id)?;

            Ok(MemberStatement {
                member,
                entries,
                total_paid,
                suspense,
            })
        })
    }
}

fn check_stage(stage: u32) -> Result<()> {
    if stage < 1 {
        return Err(EngineError::InvalidStage { stage });
    }
    Ok(())
}

fn resolve_window(query: &ReportQuery, time_provider: &SafeTimeProvider) -> Result<DateWindow> {
    check_stage(query.stage)?;
    let today = time_provider.now().date_naive();
    Ok(DateWindow::or_current_year(query.start, query.end, today))
}

fn stage_installments(r: &dyn Reader, stage: u32) -> Result<Vec<Installment>> {
    let mut rows = Vec::new();
    for member in r.members_in_stage(stage)? {
        rows.extend(r.installments_for_member(member.id)?);
    }
    Ok(rows)
}

fn member_debt(member: Member, installments: &[Installment]) -> MemberDebt {
    let total: Money = installments.iter().map(|i| i.due_amount).sum();
    let paid: Money = installments.iter().map(|i| i.paid_amount).sum();
    let overdue_installments = installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Overdue)
        .count();

    MemberDebt {
        member_id: member.id,
        full_name: member.full_name(),
        national_id: member.national_id,
        stage: member.stage,
        block: member.block,
        lot: member.lot,
        total,
        paid,
        debt: total - paid,
        overdue_installments,
        compliance: paid.percentage_of(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationEngine, PaymentRequest};
    use crate::config::EngineConfig;
    use crate::members::MemberRegistry;
    use crate::reconciler::ScheduleReconciler;
    use crate::records::NewMember;
    use crate::schedule::{ScheduleGenerator, ScheduleLine};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()))
    }

    fn member_with_schedule(store: &MemoryStore, national_id: &str, stage: u32, time: &SafeTimeProvider) -> (MemberId, Vec<Installment>) {
        let member = MemberRegistry::new(store)
            .register(
                NewMember {
                    national_id: national_id.to_string(),
                    stage,
                    given_names: "Pedro".to_string(),
                    paternal_surname: "Huanca".to_string(),
                    maternal_surname: "Tito".to_string(),
                    block: Some("F".to_string()),
                    lot: None,
                    total_obligation: Money::from_major(400),
                },
                time,
            )
            .unwrap();
        let config = EngineConfig::default();
        let lines = (1..=4)
            .map(|month| ScheduleLine {
                due_date: date(2025, month, 10),
                due_amount: Money::from_major(100),
            })
            .collect();
        let outcome = ScheduleGenerator::new(store, &config)
            .replace(member.id, None, lines, time)
            .unwrap();
        (member.id, outcome.installments)
    }

    /// stage 1: one member paid jan on time and feb late, march and april open
    fn populated() -> (MemoryStore, SafeTimeProvider, MemberId) {
        let store = MemoryStore::new();
        let time = at(2025, 1, 1);
        let (member_id, rows) = member_with_schedule(&store, "48000001", 1, &time);
        member_with_schedule(&store, "48000002", 1, &time);
        member_with_schedule(&store, "48000003", 2, &time);

        let config = EngineConfig::default();
        let engine = AllocationEngine::new(&store, &config);
        engine
            .allocate(
                PaymentRequest::new(member_id, Money::from_major(100))
                    .targeting(rows[0].id)
                    .dated(Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap()),
                &time,
            )
            .unwrap();
        engine
            .allocate(
                PaymentRequest::new(member_id, Money::from_major(150))
                    .targeting(rows[1].id)
                    .dated(Utc.with_ymd_and_hms(2025, 2, 20, 0, 0, 0).unwrap()),
                &time,
            )
            .unwrap();

        let later = at(2025, 3, 15);
        for member in MemberRegistry::new(&store).in_stage(1).unwrap() {
            ScheduleReconciler::new(&store).reconcile_overdue(member.id, &later).unwrap();
        }
        (store, later, member_id)
    }

    #[test]
    fn test_compliance_breakdown() {
        let (store, time, _) = populated();
        let report = ReportingAggregator::new(&store)
            .compliance(ReportQuery::new(1), &time)
            .unwrap();

        assert_eq!(report.window, DateWindow::calendar_year(2025));
        assert_eq!(report.total, 8);
        assert_eq!(report.on_time.count, 1);
        assert_eq!(report.late.count, 1);
        assert_eq!(report.unpaid.count, 6);
        assert_eq!(report.on_time.percentage.as_decimal(), dec!(12.50));
        assert_eq!(report.unpaid.percentage.to_string(), "75.00");
    }

    #[test]
    fn test_compliance_window_is_inclusive() {
        let (store, time, _) = populated();
        let query = ReportQuery::new(1).between(date(2025, 1, 10), date(2025, 2, 10));
        let report = ReportingAggregator::new(&store).compliance(query, &time).unwrap();
        assert_eq!(report.total, 4);
    }

    #[test]
    fn test_income_projection_against_collection() {
        let (store, time, _) = populated();
        let aggregator = ReportingAggregator::new(&store);

        let report = aggregator.income(ReportQuery::new(1), &time).unwrap();
        assert_eq!(report.projected, Money::from_major(800));
        assert_eq!(report.collected, Money::from_major(250));
        assert_eq!(report.difference, Money::from_major(-550));
        assert_eq!(report.collected_percentage.to_string(), "31.25");

        let january = ReportQuery::new(1).between(date(2025, 1, 1), date(2025, 1, 31));
        let report = aggregator.income(january, &time).unwrap();
        assert_eq!(report.projected, Money::from_major(200));
        assert_eq!(report.collected, Money::from_major(100));
    }

    #[test]
    fn test_member_debts_sorted_by_debt() {
        let (store, _, member_id) = populated();
        let debts = ReportingAggregator::new(&store).member_debts(1).unwrap();

        assert_eq!(debts.len(), 2);
        assert_eq!(debts[0].debt, Money::from_major(400));
        assert_eq!(debts[0].overdue_installments, 3);
        assert_eq!(debts[1].member_id, member_id);
        assert_eq!(debts[1].paid, Money::from_major(250));
        assert_eq!(debts[1].debt, Money::from_major(150));
        assert_eq!(debts[1].compliance.to_string(), "62.50");
        // march was only partly covered by the surplus
        assert_eq!(debts[1].overdue_installments, 1);
    }

    #[test]
    fn test_empty_stage_yields_zero_summaries() {
        let store = MemoryStore::new();
        let time = at(2025, 6, 1);
        let aggregator = ReportingAggregator::new(&store);

        let compliance = aggregator.compliance(ReportQuery::new(7), &time).unwrap();
        assert_eq!(compliance.total, 0);
        assert_eq!(compliance.on_time.percentage.to_string(), "0.00");
        assert_eq!(
            serde_json::to_value(compliance.on_time).unwrap(),
            serde_json::json!({ "count": 0, "percentage": "0.00" })
        );

        let income = aggregator.income(ReportQuery::new(7), &time).unwrap();
        assert!(income.projected.is_zero());
        assert_eq!(income.collected_percentage.to_string(), "0.00");
        let json = serde_json::to_value(&income).unwrap();
        assert_eq!(json["projected"], "0.00");
        assert_eq!(json["collected_percentage"], "0.00");

        assert!(aggregator.member_debts(7).unwrap().is_empty());
    }

    #[test]
    fn test_stage_zero_rejected() {
        let store = MemoryStore::new();
        let time = at(2025, 6, 1);
        let aggregator = ReportingAggregator::new(&store);

        assert_eq!(
            aggregator.compliance(ReportQuery::new(0), &time),
            Err(EngineError::InvalidStage { stage: 0 })
        );
        assert_eq!(aggregator.member_debts(0), Err(EngineError::InvalidStage { stage: 0 }));
        assert!(matches!(
            aggregator.member_statement("48000001", 0),
            Err(EngineError::InvalidStage { stage: 0 })
        ));
    }

    #[test]
    fn test_member_statement_newest_first() {
        let (store, _, _) = populated();
        let aggregator = ReportingAggregator::new(&store);

        let statement = aggregator.member_statement("48000001", 1).unwrap();
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.entries[0].payment.amount, Money::from_major(150));
        assert_eq!(statement.entries[0].lines.len(), 2);
        assert_eq!(
            statement.entries[0].lines[1].installment.as_ref().map(|i| i.sequence),
            Some(3)
        );
        assert_eq!(statement.total_paid, Money::from_major(250));
        assert!(statement.suspense.is_zero());

        assert!(matches!(
            aggregator.member_statement("48000001", 2),
            Err(EngineError::MemberKeyNotFound { .. })
        ));
    }
}
