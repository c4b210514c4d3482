use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::errors::{EngineError, Result};
use crate::events::Event;
use crate::records::Installment;
use crate::store::{Reader, Store, Transaction};
use crate::types::{ContractId, MemberId};

/// flips stale PENDING installments to OVERDUE whenever a schedule is read
pub struct ScheduleReconciler<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> ScheduleReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// mark PENDING installments due before today as OVERDUE, returning how many changed
    pub fn reconcile_overdue(&self, member_id: MemberId, time_provider: &SafeTimeProvider) -> Result<usize> {
        self.store.transaction(|tx| reconcile(tx, member_id, time_provider))
    }

    /// reconcile, then return the member's whole schedule by sequence
    pub fn schedule_for_member(
        &self,
        member_id: MemberId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        self.store.transaction(|tx| {
            reconcile(tx, member_id, time_provider)?;
            tx.installments_for_member(member_id)
        })
    }

    /// reconcile the contract's member, then return the contract's schedule
    pub fn schedule_for_contract(
        &self,
        contract_id: ContractId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        self.store.transaction(|tx| {
            let contract = tx
                .contract(contract_id)?
                .ok_or(EngineError::ContractNotFound { id: contract_id })?;
            reconcile(tx, contract.member_id, time_provider)?;

            let installments = tx.installments_for_contract(contract_id)?;
            if installments.is_empty() {
                return Err(EngineError::NoScheduleForContract { id: contract_id });
            }
            Ok(installments)
        })
    }
}

fn reconcile(tx: &mut dyn Transaction, member_id: MemberId, time_provider: &SafeTimeProvider) -> Result<usize> {
    if tx.member(member_id)?.is_none() {
        return Err(EngineError::MemberNotFound { id: member_id });
    }

    let today = time_provider.now().date_naive();
    let flipped = tx.mark_overdue(member_id, today)?;

    if flipped > 0 {
        tx.record(Event::InstallmentsOverdue {
            member_id,
            count: flipped,
            as_of: today,
        });
        info!(%member_id, count = flipped, %today, "installments marked overdue");
    } else {
        debug!(%member_id, %today, "no overdue installments");
    }

    Ok(flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::decimal::Money;
    use crate::members::MemberRegistry;
    use crate::records::NewMember;
    use crate::schedule::{ContractContext, ManualInstallment, ManualScheduleRequest, ScheduleGenerator, ScheduleLine};
    use crate::store::MemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (MemoryStore, SafeTimeProvider, MemberId) {
        let store = MemoryStore::new();
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        ));
        let member = MemberRegistry::new(&store)
            .register(
                NewMember {
                    national_id: "42424242".to_string(),
                    stage: 1,
                    given_names: "Maria".to_string(),
                    paternal_surname: "Flores".to_string(),
                    maternal_surname: "Ramos".to_string(),
                    block: None,
                    lot: None,
                    total_obligation: Money::from_major(300),
                },
                &time,
            )
            .unwrap();
        let config = EngineConfig::default();
        let lines = (1..=3)
            .map(|month| ScheduleLine {
                due_date: date(2025, month, 15),
                due_amount: Money::from_major(100),
            })
            .collect();
        ScheduleGenerator::new(&store, &config)
            .replace(member.id, None, lines, &time)
            .unwrap();
        (store, time, member.id)
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let (store, time, member_id) = setup();
        let reconciler = ScheduleReconciler::new(&store);

        time.test_control().unwrap().advance(Duration::days(14));
        assert_eq!(reconciler.reconcile_overdue(member_id, &time).unwrap(), 0);

        time.test_control().unwrap().advance(Duration::days(1));
        assert_eq!(reconciler.reconcile_overdue(member_id, &time).unwrap(), 1);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let (store, time, member_id) = setup();
        let reconciler = ScheduleReconciler::new(&store);
        time.test_control().unwrap().advance(Duration::days(60));

        let first = reconciler.schedule_for_member(member_id, &time).unwrap();
        let second = reconciler.schedule_for_member(member_id, &time).unwrap();
        assert_eq!(first, second);

        let statuses: Vec<InstallmentStatus> = second.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![InstallmentStatus::Overdue, InstallmentStatus::Overdue, InstallmentStatus::Pending]
        );

        let overdue_events = store
            .audit_log()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::InstallmentsOverdue { count: 2, .. }))
            .count();
        assert_eq!(overdue_events, 1);
    }

    #[test]
    fn test_unknown_member() {
        let (store, time, _) = setup();
        let ghost = uuid::Uuid::new_v4();
        assert_eq!(
            ScheduleReconciler::new(&store).reconcile_overdue(ghost, &time),
            Err(EngineError::MemberNotFound { id: ghost })
        );
    }

    #[test]
    fn test_contract_schedule_read() {
        let (store, time, member_id) = setup();
        let config = EngineConfig::default();
        let outcome = ScheduleGenerator::new(&store, &config)
            .create_manual(
                ManualScheduleRequest {
                    member_id,
                    installments: vec![ManualInstallment {
                        sequence: 1,
                        due_date: date(2024, 10, 1),
                        due_amount: Money::from_major(80),
                        paid_amount: None,
                        status: None,
                    }],
                    contract: ContractContext::default(),
                },
                &time,
            )
            .unwrap();

        let reconciler = ScheduleReconciler::new(&store);
        let rows = reconciler.schedule_for_contract(outcome.contract_id, &time).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, InstallmentStatus::Overdue);

        let ghost = uuid::Uuid::new_v4();
        assert_eq!(
            reconciler.schedule_for_contract(ghost, &time),
            Err(EngineError::ContractNotFound { id: ghost })
        );
    }

    #[test]
    fn test_contract_without_installments() {
        let (store, time, member_id) = setup();
        let contract_id = store
            .transaction(|tx| {
                let template = tx.upsert_template(&crate::types::TemplateKind::new("ESTANDAR"), "estandar.docx", "Contrato estandar")?;
                let contract = tx.insert_contract(crate::records::NewContract {
                    member_id,
                    template_id: template.id,
                    stage: 1,
                    document_path: "contratos/42424242.docx".to_string(),
                    amount_in_words: None,
                    signing_city: None,
                    signing_date: None,
                    status: crate::types::ContractStatus::Vigente,
                })?;
                Ok(contract.id)
            })
            .unwrap();

        assert_eq!(
            ScheduleReconciler::new(&store).schedule_for_contract(contract_id, &time),
            Err(EngineError::NoScheduleForContract { id: contract_id })
        );
    }
}
