mod application;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SurplusPolicy};
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::Event;
use crate::records::{Installment, NewPayment, Payment, SuspenseEntry};
use crate::store::{Reader, Store, Transaction};
use crate::types::{InstallmentId, InstallmentStatus, MemberId, Punctuality};

use application::apply_to_installment;

/// incoming payment to allocate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub member_id: MemberId,
    pub amount: Money,
    /// deposit date; defaults to now
    pub date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    /// opaque reference to an uploaded receipt, stored as given
    pub receipt: Option<String>,
    /// installment to pay first; without one the whole amount is distributed
    pub target: Option<InstallmentId>,
}

impl PaymentRequest {
    pub fn new(member_id: MemberId, amount: Money) -> Self {
        Self {
            member_id,
            amount,
            date: None,
            note: None,
            receipt: None,
            target: None,
        }
    }

    pub fn targeting(mut self, installment_id: InstallmentId) -> Self {
        self.target = Some(installment_id);
        self
    }

    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_receipt(mut self, receipt: impl Into<String>) -> Self {
        self.receipt = Some(receipt.into());
        self
    }
}

/// what one payment did to one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentApplication {
    pub installment_id: InstallmentId,
    pub sequence: u32,
    pub applied: Money,
    pub paid_amount: Money,
    pub status: InstallmentStatus,
    pub punctuality: Punctuality,
}

/// allocation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub payment: Payment,
    /// in application order: the target first, then ascending sequence
    pub applications: Vec<InstallmentApplication>,
    /// held in suspense because no installment was left to pay
    pub unapplied: Money,
}

impl Allocation {
    pub fn total_applied(&self) -> Money {
        self.applications.iter().map(|a| a.applied).sum()
    }
}

/// distributes payments over a member's outstanding installments
pub struct AllocationEngine<'a, S: Store> {
    store: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: Store> AllocationEngine<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// register a payment and apply it, oldest debt first
    ///
    /// The payment row, every payment detail and every installment update are
    /// written in one transaction. Any failure leaves the store untouched.
    pub fn allocate(
        &self,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Allocation> {
        if !request.amount.is_positive() {
            return Err(EngineError::InvalidPaymentAmount {
                amount: request.amount,
            });
        }

        let policy = self.config.surplus_policy;

        self.store.transaction(|tx| {
            let target = match request.target {
                Some(id) => Some(
                    tx.installment(id)?
                        .filter(|i| i.member_id == request.member_id)
                        .ok_or(EngineError::InstallmentNotFound { id })?,
                ),
                None => None,
            };
            if tx.member(request.member_id)?.is_none() {
                return Err(EngineError::MemberNotFound {
                    id: request.member_id,
                });
            }

            let payment = tx.insert_payment(NewPayment {
                member_id: request.member_id,
                target_installment_id: request.target,
                amount: request.amount,
                date: request.date.unwrap_or_else(|| time_provider.now()),
                note: request.note.clone(),
                receipt: request.receipt.clone(),
            })?;
            tx.record(Event::PaymentRegistered {
                member_id: payment.member_id,
                payment_id: payment.id,
                amount: payment.amount,
                timestamp: time_provider.now(),
            });

            let mut surplus = payment.amount;
            let mut applications = Vec::new();

            if let Some(target) = target {
                surplus = apply_one(tx, &payment, target, surplus, &mut applications, time_provider)?;
            }

            if surplus.is_positive() {
                for installment in tx.unpaid_installments(payment.member_id, request.target)? {
                    surplus = apply_one(tx, &payment, installment, surplus, &mut applications, time_provider)?;
                    if surplus.is_zero() {
                        break;
                    }
                }
            }

            if surplus.is_positive() {
                match policy {
                    SurplusPolicy::Reject => {
                        warn!(
                            member_id = %payment.member_id,
                            amount = %payment.amount,
                            unapplied = %surplus,
                            "payment exceeds outstanding debt"
                        );
                        return Err(EngineError::PaymentExceedsDebt { unapplied: surplus });
                    }
                    SurplusPolicy::HoldInSuspense => {
                        tx.insert_suspense(SuspenseEntry {
                            member_id: payment.member_id,
                            payment_id: payment.id,
                            amount: surplus,
                        })?;
                        tx.record(Event::SurplusHeld {
                            member_id: payment.member_id,
                            payment_id: payment.id,
                            amount: surplus,
                            timestamp: time_provider.now(),
                        });
                    }
                }
            }

            info!(
                member_id = %payment.member_id,
                payment_id = %payment.id,
                amount = %payment.amount,
                installments = applications.len(),
                unapplied = %surplus,
                "payment allocated"
            );

            Ok(Allocation {
                payment,
                applications,
                unapplied: surplus,
            })
        })
    }
}

/// apply what the installment still owes out of `available`, returning the rest
fn apply_one(
    tx: &mut dyn Transaction,
    payment: &Payment,
    installment: Installment,
    available: Money,
    applications: &mut Vec<InstallmentApplication>,
    time_provider: &SafeTimeProvider,
) -> Result<Money> {
    // imported history carries a cumulative amount without payment details
    let paid_so_far = tx
        .applied_to_installment(installment.id)?
        .max(installment.paid_amount);

    let step = match apply_to_installment(&installment, paid_so_far, available, payment.date) {
        Some(step) => step,
        None => {
            debug!(installment_id = %installment.id, "nothing owed, skipping");
            return Ok(available);
        }
    };

    tx.insert_detail(payment.id, installment.id, step.applied)?;
    let stored = tx.update_installment(&step.updated)?;

    tx.record(Event::PaymentApplied {
        payment_id: payment.id,
        installment_id: stored.id,
        amount: step.applied,
        new_paid_amount: stored.paid_amount,
    });
    if step.completed {
        tx.record(Event::InstallmentCompleted {
            installment_id: stored.id,
            due_date: stored.due_date,
            punctuality: stored.punctuality,
            timestamp: time_provider.now(),
        });
        info!(
            installment_id = %stored.id,
            sequence = stored.sequence,
            punctuality = %stored.punctuality,
            "installment completed"
        );
    }

    applications.push(InstallmentApplication {
        installment_id: stored.id,
        sequence: stored.sequence,
        applied: step.applied,
        paid_amount: stored.paid_amount,
        status: stored.status,
        punctuality: stored.punctuality,
    });

    Ok(available - step.applied)
}
