use chrono::{DateTime, Utc};

use crate::decimal::Money;
use crate::records::Installment;
use crate::types::{InstallmentStatus, Punctuality};

/// result of applying part of a payment to one installment
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub updated: Installment,
    pub applied: Money,
    pub completed: bool,
}

/// apply as much of `available` as the installment still owes
///
/// Returns `None` when nothing can be applied: the row is already PAID or its
/// remaining balance is zero. A partial payment leaves the row PENDING, even if
/// it was OVERDUE before; completion sets PAID and classifies punctuality from
/// the payment day against the due day.
pub(crate) fn apply_to_installment(
    installment: &Installment,
    paid_so_far: Money,
    available: Money,
    payment_date: DateTime<Utc>,
) -> Option<Step> {
    if installment.is_paid() {
        return None;
    }

    let remaining = installment.due_amount.saturating_sub(paid_so_far);
    let applied = available.min(remaining);
    if !applied.is_positive() {
        return None;
    }

    let new_paid = paid_so_far + applied;
    let completed = new_paid >= installment.due_amount;

    let mut updated = installment.clone();
    updated.paid_amount = new_paid;
    if completed {
        updated.status = InstallmentStatus::Paid;
        updated.punctuality = Punctuality::classify(payment_date, installment.due_date);
    } else {
        updated.status = InstallmentStatus::Pending;
    }

    Some(Step {
        updated,
        applied,
        completed,
    })
}
