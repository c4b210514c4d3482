pub mod even_split;
pub mod manual;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::Event;
use crate::records::{Installment, NewInstallment};
use crate::store::{Reader, Store, Transaction};
use crate::types::{ContractId, InstallmentStatus, MemberId, ScheduleScope};

pub use even_split::{plan_even_split, PlannedInstallment};
pub use manual::{ContractContext, ManualInstallment, ManualScheduleOutcome, ManualScheduleRequest};

/// even-split schedule request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub member_id: MemberId,
    pub contract_id: Option<ContractId>,
    pub total_amount: Money,
    pub count: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// caller-edited schedule line; sequence is taken from the position in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLine {
    pub due_date: NaiveDate,
    pub due_amount: Money,
}

/// result of replacing a schedule scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub scope: ScheduleScope,
    pub removed: usize,
    pub installments: Vec<Installment>,
}

impl ScheduleOutcome {
    pub fn total(&self) -> Money {
        self.installments.iter().map(|i| i.due_amount).sum()
    }
}

/// builds and edits member schedules
pub struct ScheduleGenerator<'a, S: Store> {
    store: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: Store> ScheduleGenerator<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// preview an even split without touching the store
    pub fn plan(
        &self,
        total: Money,
        count: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PlannedInstallment>> {
        plan_even_split(total, count, start, end)
    }

    /// generate an even-split schedule, replacing the prior one in the same scope
    pub fn generate(
        &self,
        request: GenerateRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<ScheduleOutcome> {
        let planned = plan_even_split(
            request.total_amount,
            request.count,
            request.start_date,
            request.end_date,
        )?;

        let scope = ScheduleScope::new(request.member_id, request.contract_id);
        let rows = planned
            .into_iter()
            .map(|line| new_row(scope, line.sequence, line.due_date, line.due_amount))
            .collect();

        self.store
            .transaction(|tx| replace_scope(tx, scope, rows, time_provider))
    }

    /// replace a scope with caller-edited lines, renumbered 1..n in list order
    pub fn replace(
        &self,
        member_id: MemberId,
        contract_id: Option<ContractId>,
        lines: Vec<ScheduleLine>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ScheduleOutcome> {
        if lines.is_empty() {
            return Err(EngineError::invalid_schedule("no installments supplied"));
        }
        if let Some(bad) = lines.iter().find(|l| !l.due_amount.is_positive()) {
            return Err(EngineError::invalid_schedule(format!(
                "installment due {} has non-positive amount {}",
                bad.due_date, bad.due_amount
            )));
        }

        let scope = ScheduleScope::new(member_id, contract_id);
        let rows = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| new_row(scope, i as u32 + 1, line.due_date, line.due_amount))
            .collect();

        self.store
            .transaction(|tx| replace_scope(tx, scope, rows, time_provider))
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }
}

fn new_row(scope: ScheduleScope, sequence: u32, due_date: NaiveDate, due_amount: Money) -> NewInstallment {
    NewInstallment {
        member_id: scope.member_id,
        contract_id: scope.contract_id,
        sequence,
        due_date,
        due_amount,
        paid_amount: Money::ZERO,
        status: InstallmentStatus::Pending,
    }
}

/// delete-then-insert inside the caller's transaction
fn replace_scope(
    tx: &mut dyn Transaction,
    scope: ScheduleScope,
    rows: Vec<NewInstallment>,
    time_provider: &SafeTimeProvider,
) -> Result<ScheduleOutcome> {
    if tx.member(scope.member_id)?.is_none() {
        return Err(EngineError::MemberNotFound { id: scope.member_id });
    }
    if let Some(contract_id) = scope.contract_id {
        match tx.contract(contract_id)? {
            Some(contract) if contract.member_id == scope.member_id => {}
            _ => return Err(EngineError::ContractNotFound { id: contract_id }),
        }
    }

    // deleting rows with payments would orphan their payment details
    let mut paid_installments = 0;
    for existing in tx.installments_in_scope(scope)? {
        if existing.paid_amount.is_positive() || tx.applied_to_installment(existing.id)?.is_positive() {
            paid_installments += 1;
        }
    }
    if paid_installments > 0 {
        return Err(EngineError::ScheduleHasPayments { paid_installments });
    }

    let removed = tx.delete_scope(scope)?;
    let installments = tx.insert_installments(rows)?;
    let total: Money = installments.iter().map(|i| i.due_amount).sum();

    tx.record(Event::ScheduleReplaced {
        member_id: scope.member_id,
        contract_id: scope.contract_id,
        removed,
        created: installments.len(),
        total,
        timestamp: time_provider.now(),
    });

    info!(
        member_id = %scope.member_id,
        contract_id = ?scope.contract_id,
        removed,
        created = installments.len(),
        %total,
        "schedule replaced"
    );

    Ok(ScheduleOutcome {
        scope,
        removed,
        installments,
    })
}
