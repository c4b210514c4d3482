use std::collections::HashSet;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::Event;
use crate::records::{Contract, Member, NewContract, NewInstallment};
use crate::store::{Reader, Store, Transaction};
use crate::types::{ContractId, ContractStatus, InstallmentStatus, MemberId, TemplateId};

use super::ScheduleGenerator;

/// installment imported from a paper schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualInstallment {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub due_amount: Money,
    /// defaults to the due amount for PAID rows and to zero otherwise
    pub paid_amount: Option<Money>,
    pub status: Option<InstallmentStatus>,
}

/// contract the imported installments hang off
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractContext {
    /// existing contract to attach to; otherwise the member's active external contract is used
    pub contract_id: Option<ContractId>,
    /// defaults to the member's stage
    pub stage: Option<u32>,
    pub document_path: Option<String>,
    pub amount_in_words: Option<String>,
    pub signing_city: Option<String>,
    pub signing_date: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualScheduleRequest {
    pub member_id: MemberId,
    pub installments: Vec<ManualInstallment>,
    pub contract: ContractContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualScheduleOutcome {
    pub contract_id: ContractId,
    pub template_id: TemplateId,
    pub created: usize,
    /// sequence numbers already present on the contract, or repeated in the request
    pub skipped: usize,
}

impl<'a, S: Store> ScheduleGenerator<'a, S> {
    /// import a historical schedule under an external contract
    ///
    /// Rows whose sequence number already exists on the contract are skipped rather
    /// than overwritten, so re-running the same import is harmless.
    pub fn create_manual(
        &self,
        request: ManualScheduleRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<ManualScheduleOutcome> {
        if request.installments.is_empty() {
            return Err(EngineError::invalid_schedule("no installments supplied"));
        }
        let resolved = request
            .installments
            .iter()
            .map(resolve_line)
            .collect::<Result<Vec<_>>>()?;

        let external = &self.config().external_contract;

        self.store.transaction(|tx| {
            let member = tx
                .member(request.member_id)?
                .ok_or(EngineError::MemberNotFound { id: request.member_id })?;

            let contract = match request.contract.contract_id {
                Some(contract_id) => match tx.contract(contract_id)? {
                    Some(contract) if contract.member_id == member.id => contract,
                    _ => return Err(EngineError::ContractNotFound { id: contract_id }),
                },
                None => {
                    let template = tx.upsert_template(
                        &external.template_kind,
                        &external.template_file,
                        &external.template_description,
                    )?;
                    open_external_contract(
                        tx,
                        &member,
                        template.id,
                        &request.contract,
                        &external.default_document_path,
                        time_provider,
                    )?
                }
            };

            let mut taken: HashSet<u32> = tx
                .installments_for_contract(contract.id)?
                .iter()
                .map(|i| i.sequence)
                .collect();

            let mut rows = Vec::new();
            let mut skipped = 0;
            for (line, (paid_amount, status)) in request.installments.iter().zip(resolved) {
                if !taken.insert(line.sequence) {
                    debug!(contract_id = %contract.id, sequence = line.sequence, "sequence already present, skipping");
                    skipped += 1;
                    continue;
                }
                rows.push(NewInstallment {
                    member_id: member.id,
                    contract_id: Some(contract.id),
                    sequence: line.sequence,
                    due_date: line.due_date,
                    due_amount: line.due_amount,
                    paid_amount,
                    status,
                });
            }

            let created = tx.insert_installments(rows)?.len();

            tx.record(Event::ManualScheduleCreated {
                member_id: member.id,
                contract_id: contract.id,
                template_id: contract.template_id,
                created,
                skipped,
                timestamp: time_provider.now(),
            });

            info!(
                member_id = %member.id,
                contract_id = %contract.id,
                created,
                skipped,
                "manual schedule imported"
            );

            Ok(ManualScheduleOutcome {
                contract_id: contract.id,
                template_id: contract.template_id,
                created,
                skipped,
            })
        })
    }
}

/// reuse the member's active contract for the template and stage, or open one
fn open_external_contract(
    tx: &mut dyn Transaction,
    member: &Member,
    template_id: TemplateId,
    context: &ContractContext,
    default_document_path: &str,
    time_provider: &SafeTimeProvider,
) -> Result<Contract> {
    let stage = context.stage.unwrap_or(member.stage);
    if let Some(existing) = tx.active_contract(member.id, template_id, stage)? {
        return Ok(existing);
    }

    let contract = tx.insert_contract(NewContract {
        member_id: member.id,
        template_id,
        stage,
        document_path: context
            .document_path
            .clone()
            .unwrap_or_else(|| default_document_path.to_string()),
        amount_in_words: context.amount_in_words.clone(),
        signing_city: context.signing_city.clone(),
        signing_date: context.signing_date,
        status: context.status.unwrap_or(ContractStatus::Vigente),
    })?;

    tx.record(Event::ContractOpened {
        member_id: member.id,
        contract_id: contract.id,
        stage,
        timestamp: time_provider.now(),
    });

    Ok(contract)
}

/// settle paid amount and status for one imported row
fn resolve_line(line: &ManualInstallment) -> Result<(Money, InstallmentStatus)> {
    if line.sequence < 1 {
        return Err(EngineError::invalid_schedule("sequence numbers start at 1"));
    }
    if !line.due_amount.is_positive() {
        return Err(EngineError::invalid_schedule(format!(
            "installment {} has non-positive amount {}",
            line.sequence, line.due_amount
        )));
    }

    let status = line.status.unwrap_or(InstallmentStatus::Pending);
    let paid_amount = match (line.paid_amount, status) {
        (Some(paid), _) => paid,
        (None, InstallmentStatus::Paid) => line.due_amount,
        (None, _) => Money::ZERO,
    };

    if paid_amount.is_negative() || paid_amount > line.due_amount {
        return Err(EngineError::invalid_schedule(format!(
            "installment {} paid amount {} outside 0..={}",
            line.sequence, paid_amount, line.due_amount
        )));
    }
    if status.is_paid() && paid_amount < line.due_amount {
        return Err(EngineError::invalid_schedule(format!(
            "installment {} marked paid with only {} of {}",
            line.sequence, paid_amount, line.due_amount
        )));
    }

    let status = if paid_amount == line.due_amount {
        InstallmentStatus::Paid
    } else {
        status
    };
    Ok((paid_amount, status))
}
