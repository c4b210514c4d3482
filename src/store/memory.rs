use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::records::{
    Contract, ContractTemplate, Installment, Member, NewContract, NewInstallment, NewMember,
    NewPayment, Payment, PaymentDetail, SuspenseEntry,
};
use crate::types::{
    ContractId, ContractStatus, InstallmentId, InstallmentStatus, MemberId, PaymentId,
    Punctuality, ScheduleScope, TemplateId, TemplateKind,
};

use super::{Reader, Store, Transaction};

/// all rows held by the in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    members: Vec<Member>,
    templates: Vec<ContractTemplate>,
    contracts: Vec<Contract>,
    installments: Vec<Installment>,
    payments: Vec<Payment>,
    details: Vec<PaymentDetail>,
    suspense: Vec<SuspenseEntry>,
}

/// tables plus the append-only audit log, which transactions never copy
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    tables: Tables,
    audit: Vec<Event>,
}

fn by_sequence(mut rows: Vec<Installment>) -> Vec<Installment> {
    rows.sort_by_key(|i| i.sequence);
    rows
}

impl Reader for Tables {
    fn member(&self, id: MemberId) -> Result<Option<Member>> {
        Ok(self.members.iter().find(|m| m.id == id).cloned())
    }

    fn member_by_key(&self, national_id: &str, stage: u32) -> Result<Option<Member>> {
        Ok(self
            .members
            .iter()
            .find(|m| m.national_id == national_id && m.stage == stage)
            .cloned())
    }

    fn members_in_stage(&self, stage: u32) -> Result<Vec<Member>> {
        Ok(self.members.iter().filter(|m| m.stage == stage).cloned().collect())
    }

    fn template_by_kind(&self, kind: &TemplateKind) -> Result<Option<ContractTemplate>> {
        Ok(self.templates.iter().find(|t| &t.kind == kind).cloned())
    }

    fn contract(&self, id: ContractId) -> Result<Option<Contract>> {
        Ok(self.contracts.iter().find(|c| c.id == id).cloned())
    }

    fn active_contract(
        &self,
        member_id: MemberId,
        template_id: TemplateId,
        stage: u32,
    ) -> Result<Option<Contract>> {
        Ok(self
            .contracts
            .iter()
            .find(|c| {
                c.member_id == member_id
                    && c.template_id == template_id
                    && c.stage == stage
                    && c.status == ContractStatus::Vigente
            })
            .cloned())
    }

    fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        Ok(self.installments.iter().find(|i| i.id == id).cloned())
    }

    fn installments_for_member(&self, member_id: MemberId) -> Result<Vec<Installment>> {
        Ok(by_sequence(
            self.installments
                .iter()
                .filter(|i| i.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    fn installments_for_contract(&self, contract_id: ContractId) -> Result<Vec<Installment>> {
        Ok(by_sequence(
            self.installments
                .iter()
                .filter(|i| i.contract_id == Some(contract_id))
                .cloned()
                .collect(),
        ))
    }

    fn installments_in_scope(&self, scope: ScheduleScope) -> Result<Vec<Installment>> {
        Ok(by_sequence(
            self.installments
                .iter()
                .filter(|i| i.member_id == scope.member_id && i.contract_id == scope.contract_id)
                .cloned()
                .collect(),
        ))
    }

    fn unpaid_installments(
        &self,
        member_id: MemberId,
        excluding: Option<InstallmentId>,
    ) -> Result<Vec<Installment>> {
        Ok(by_sequence(
            self.installments
                .iter()
                .filter(|i| i.member_id == member_id && !i.is_paid() && Some(i.id) != excluding)
                .cloned()
                .collect(),
        ))
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.iter().find(|p| p.id == id).cloned())
    }

    fn payments_for_member(&self, member_id: MemberId) -> Result<Vec<Payment>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.member_id == member_id)
            .cloned()
            .collect())
    }

    fn details_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentDetail>> {
        Ok(self
            .details
            .iter()
            .filter(|d| d.payment_id == payment_id)
            .cloned()
            .collect())
    }

    fn applied_to_installment(&self, installment_id: InstallmentId) -> Result<Money> {
        Ok(self
            .details
            .iter()
            .filter(|d| d.installment_id == installment_id)
            .map(|d| d.amount)
            .sum())
    }

    fn suspense_balance(&self, member_id: MemberId) -> Result<Money> {
        Ok(self
            .suspense
            .iter()
            .filter(|s| s.member_id == member_id)
            .map(|s| s.amount)
            .sum())
    }
}

/// scratch copy of the tables; swapped in on commit, dropped on failure
struct MemoryTransaction {
    tables: Tables,
    events: EventStore,
}

impl Reader for MemoryTransaction {
    fn member(&self, id: MemberId) -> Result<Option<Member>> {
        self.tables.member(id)
    }

    fn member_by_key(&self, national_id: &str, stage: u32) -> Result<Option<Member>> {
        self.tables.member_by_key(national_id, stage)
    }

    fn members_in_stage(&self, stage: u32) -> Result<Vec<Member>> {
        self.tables.members_in_stage(stage)
    }

    fn template_by_kind(&self, kind: &TemplateKind) -> Result<Option<ContractTemplate>> {
        self.tables.template_by_kind(kind)
    }

    fn contract(&self, id: ContractId) -> Result<Option<Contract>> {
        self.tables.contract(id)
    }

    fn active_contract(
        &self,
        member_id: MemberId,
        template_id: TemplateId,
        stage: u32,
    ) -> Result<Option<Contract>> {
        self.tables.active_contract(member_id, template_id, stage)
    }

    fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.tables.installment(id)
    }

    fn installments_for_member(&self, member_id: MemberId) -> Result<Vec<Installment>> {
        self.tables.installments_for_member(member_id)
    }

    fn installments_for_contract(&self, contract_id: ContractId) -> Result<Vec<Installment>> {
        self.tables.installments_for_contract(contract_id)
    }

    fn installments_in_scope(&self, scope: ScheduleScope) -> Result<Vec<Installment>> {
        self.tables.installments_in_scope(scope)
    }

    fn unpaid_installments(
        &self,
        member_id: MemberId,
        excluding: Option<InstallmentId>,
    ) -> Result<Vec<Installment>> {
        self.tables.unpaid_installments(member_id, excluding)
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.tables.payment(id)
    }

    fn payments_for_member(&self, member_id: MemberId) -> Result<Vec<Payment>> {
        self.tables.payments_for_member(member_id)
    }

    fn details_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentDetail>> {
        self.tables.details_for_payment(payment_id)
    }

    fn applied_to_installment(&self, installment_id: InstallmentId) -> Result<Money> {
        self.tables.applied_to_installment(installment_id)
    }

    fn suspense_balance(&self, member_id: MemberId) -> Result<Money> {
        self.tables.suspense_balance(member_id)
    }
}

impl Transaction for MemoryTransaction {
    fn insert_member(&mut self, member: NewMember, registered_at: DateTime<Utc>) -> Result<Member> {
        if self.tables.member_by_key(&member.national_id, member.stage)?.is_some() {
            return Err(EngineError::DuplicateMember {
                national_id: member.national_id,
                stage: member.stage,
            });
        }

        let row = Member {
            id: Uuid::new_v4(),
            national_id: member.national_id,
            stage: member.stage,
            given_names: member.given_names,
            paternal_surname: member.paternal_surname,
            maternal_surname: member.maternal_surname,
            block: member.block,
            lot: member.lot,
            total_obligation: member.total_obligation,
            registered_at,
        };
        self.tables.members.push(row.clone());
        Ok(row)
    }

    fn update_member(&mut self, member: &Member) -> Result<()> {
        let row = self
            .tables
            .members
            .iter_mut()
            .find(|m| m.id == member.id)
            .ok_or(EngineError::MemberNotFound { id: member.id })?;
        *row = member.clone();
        Ok(())
    }

    fn delete_member(&mut self, id: MemberId) -> Result<bool> {
        let before = self.tables.members.len();
        self.tables.members.retain(|m| m.id != id);
        if self.tables.members.len() == before {
            return Ok(false);
        }

        let payment_ids: Vec<PaymentId> = self
            .tables
            .payments
            .iter()
            .filter(|p| p.member_id == id)
            .map(|p| p.id)
            .collect();

        self.tables.details.retain(|d| !payment_ids.contains(&d.payment_id));
        self.tables.payments.retain(|p| p.member_id != id);
        self.tables.installments.retain(|i| i.member_id != id);
        self.tables.contracts.retain(|c| c.member_id != id);
        self.tables.suspense.retain(|s| s.member_id != id);
        Ok(true)
    }

    fn upsert_template(
        &mut self,
        kind: &TemplateKind,
        file: &str,
        description: &str,
    ) -> Result<ContractTemplate> {
        if let Some(existing) = self.tables.template_by_kind(kind)? {
            return Ok(existing);
        }

        let template = ContractTemplate {
            id: Uuid::new_v4(),
            kind: kind.clone(),
            file: file.to_string(),
            description: description.to_string(),
        };
        self.tables.templates.push(template.clone());
        Ok(template)
    }

    fn insert_contract(&mut self, contract: NewContract) -> Result<Contract> {
        let row = Contract {
            id: Uuid::new_v4(),
            member_id: contract.member_id,
            template_id: contract.template_id,
            stage: contract.stage,
            document_path: contract.document_path,
            amount_in_words: contract.amount_in_words,
            signing_city: contract.signing_city,
            signing_date: contract.signing_date,
            status: contract.status,
        };
        self.tables.contracts.push(row.clone());
        Ok(row)
    }

    fn insert_installments(&mut self, rows: Vec<NewInstallment>) -> Result<Vec<Installment>> {
        let created: Vec<Installment> = rows
            .into_iter()
            .map(|row| Installment {
                id: Uuid::new_v4(),
                member_id: row.member_id,
                contract_id: row.contract_id,
                sequence: row.sequence,
                due_date: row.due_date,
                due_amount: row.due_amount,
                paid_amount: row.paid_amount,
                status: row.status,
                punctuality: Punctuality::Pending,
                version: 0,
            })
            .collect();
        self.tables.installments.extend(created.iter().cloned());
        Ok(created)
    }

    fn update_installment(&mut self, installment: &Installment) -> Result<Installment> {
        let row = self
            .tables
            .installments
            .iter_mut()
            .find(|i| i.id == installment.id)
            .ok_or(EngineError::InstallmentNotFound { id: installment.id })?;

        if row.version != installment.version {
            warn!(
                installment_id = %installment.id,
                stored = row.version,
                presented = installment.version,
                "stale installment write rejected"
            );
            return Err(EngineError::TransactionConflict {
                installment_id: installment.id,
            });
        }

        *row = Installment {
            version: installment.version + 1,
            ..installment.clone()
        };
        Ok(row.clone())
    }

    fn delete_scope(&mut self, scope: ScheduleScope) -> Result<usize> {
        let before = self.tables.installments.len();
        self.tables
            .installments
            .retain(|i| !(i.member_id == scope.member_id && i.contract_id == scope.contract_id));
        Ok(before - self.tables.installments.len())
    }

    fn mark_overdue(&mut self, member_id: MemberId, today: NaiveDate) -> Result<usize> {
        let mut flipped = 0;
        for row in self.tables.installments.iter_mut().filter(|i| {
            i.member_id == member_id && i.status == InstallmentStatus::Pending && i.due_date < today
        }) {
            row.status = InstallmentStatus::Overdue;
            row.version += 1;
            flipped += 1;
        }
        Ok(flipped)
    }

    fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment> {
        let row = Payment {
            id: Uuid::new_v4(),
            member_id: payment.member_id,
            target_installment_id: payment.target_installment_id,
            amount: payment.amount,
            date: payment.date,
            note: payment.note,
            receipt: payment.receipt,
        };
        self.tables.payments.push(row.clone());
        Ok(row)
    }

    fn insert_detail(
        &mut self,
        payment_id: PaymentId,
        installment_id: InstallmentId,
        amount: Money,
    ) -> Result<PaymentDetail> {
        let row = PaymentDetail {
            id: Uuid::new_v4(),
            payment_id,
            installment_id,
            amount,
        };
        self.tables.details.push(row.clone());
        Ok(row)
    }

    fn insert_suspense(&mut self, entry: SuspenseEntry) -> Result<()> {
        self.tables.suspense.push(entry);
        Ok(())
    }

    fn record(&mut self, event: Event) {
        self.events.emit(event);
    }
}

/// transactional in-memory store; write transactions are serialized
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| EngineError::PersistenceFailure {
            message: "store lock poisoned".to_string(),
        })
    }

    /// serialize every table to json
    pub fn snapshot_json(&self) -> Result<String> {
        let state = self.lock()?;
        serde_json::to_string_pretty(&*state).map_err(|e| EngineError::PersistenceFailure {
            message: format!("snapshot failed: {}", e),
        })
    }

    /// rebuild a store from `snapshot_json` output
    pub fn from_snapshot_json(json: &str) -> Result<Self> {
        let state: StoreState =
            serde_json::from_str(json).map_err(|e| EngineError::PersistenceFailure {
                message: format!("snapshot unreadable: {}", e),
            })?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>,
    {
        let mut guard = self.lock()?;
        let mut tx = MemoryTransaction {
            tables: guard.tables.clone(),
            events: EventStore::new(),
        };

        match work(&mut tx) {
            Ok(value) => {
                let MemoryTransaction { tables, mut events } = tx;
                guard.tables = tables;
                guard.audit.extend(events.take_events());
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn Reader) -> Result<T>,
    {
        let guard = self.lock()?;
        work(&guard.tables)
    }

    fn audit_log(&self) -> Result<Vec<Event>> {
        Ok(self.lock()?.audit.clone())
    }
}
