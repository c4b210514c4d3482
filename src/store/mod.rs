pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::decimal::Money;
use crate::errors::Result;
use crate::events::Event;
use crate::records::{
    Contract, ContractTemplate, Installment, Member, NewContract, NewInstallment, NewMember,
    NewPayment, Payment, PaymentDetail, SuspenseEntry,
};
use crate::types::{
    ContractId, InstallmentId, MemberId, PaymentId, ScheduleScope, TemplateId, TemplateKind,
};

pub use memory::MemoryStore;

/// read side of a unit of work
pub trait Reader {
    fn member(&self, id: MemberId) -> Result<Option<Member>>;
    fn member_by_key(&self, national_id: &str, stage: u32) -> Result<Option<Member>>;
    fn members_in_stage(&self, stage: u32) -> Result<Vec<Member>>;

    fn template_by_kind(&self, kind: &TemplateKind) -> Result<Option<ContractTemplate>>;
    fn contract(&self, id: ContractId) -> Result<Option<Contract>>;
    /// active (VIGENTE) contract for a member, template and stage
    fn active_contract(
        &self,
        member_id: MemberId,
        template_id: TemplateId,
        stage: u32,
    ) -> Result<Option<Contract>>;

    fn installment(&self, id: InstallmentId) -> Result<Option<Installment>>;
    /// ordered by ascending sequence number
    fn installments_for_member(&self, member_id: MemberId) -> Result<Vec<Installment>>;
    /// ordered by ascending sequence number
    fn installments_for_contract(&self, contract_id: ContractId) -> Result<Vec<Installment>>;
    fn installments_in_scope(&self, scope: ScheduleScope) -> Result<Vec<Installment>>;
    /// non-paid installments in ascending sequence order, optionally skipping one
    fn unpaid_installments(
        &self,
        member_id: MemberId,
        excluding: Option<InstallmentId>,
    ) -> Result<Vec<Installment>>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    fn payments_for_member(&self, member_id: MemberId) -> Result<Vec<Payment>>;
    fn details_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentDetail>>;
    /// sum of payment details recorded against an installment
    fn applied_to_installment(&self, installment_id: InstallmentId) -> Result<Money>;
    fn suspense_balance(&self, member_id: MemberId) -> Result<Money>;
}

/// unit of work; everything written through one transaction commits or rolls back together
pub trait Transaction: Reader {
    fn insert_member(&mut self, member: NewMember, registered_at: DateTime<Utc>) -> Result<Member>;
    fn update_member(&mut self, member: &Member) -> Result<()>;
    /// removes the member with its schedule, payments, contracts and suspense entries
    fn delete_member(&mut self, id: MemberId) -> Result<bool>;

    fn upsert_template(
        &mut self,
        kind: &TemplateKind,
        file: &str,
        description: &str,
    ) -> Result<ContractTemplate>;
    fn insert_contract(&mut self, contract: NewContract) -> Result<Contract>;

    fn insert_installments(&mut self, rows: Vec<NewInstallment>) -> Result<Vec<Installment>>;
    /// writes the row if its version still matches the stored one
    fn update_installment(&mut self, installment: &Installment) -> Result<Installment>;
    fn delete_scope(&mut self, scope: ScheduleScope) -> Result<usize>;
    /// single conditional update: PENDING rows due before `today` become OVERDUE
    fn mark_overdue(&mut self, member_id: MemberId, today: NaiveDate) -> Result<usize>;

    fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment>;
    fn insert_detail(
        &mut self,
        payment_id: PaymentId,
        installment_id: InstallmentId,
        amount: Money,
    ) -> Result<PaymentDetail>;
    fn insert_suspense(&mut self, entry: SuspenseEntry) -> Result<()>;

    fn record(&mut self, event: Event);
}

/// persistence handle passed explicitly to every component
pub trait Store: Send + Sync {
    /// run `work` as one atomic unit of work
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>;

    /// run read-only queries against a consistent view
    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn Reader) -> Result<T>;

    /// committed audit events, oldest first
    fn audit_log(&self) -> Result<Vec<Event>>;
}
