use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ContractId, ContractStatus, InstallmentId, InstallmentStatus, MemberId, PaymentDetailId,
    PaymentId, Punctuality, TemplateId, TemplateKind,
};

/// association member ("socio"), unique per (national id, stage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub national_id: String,
    pub stage: u32,
    pub given_names: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub block: Option<String>,
    pub lot: Option<String>,
    pub total_obligation: Money,
    pub registered_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!(
            "{} {} {}",
            self.given_names, self.paternal_surname, self.maternal_surname
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub national_id: String,
    pub stage: u32,
    pub given_names: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub block: Option<String>,
    pub lot: Option<String>,
    pub total_obligation: Money,
}

/// schedule line ("cuota")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub member_id: MemberId,
    pub contract_id: Option<ContractId>,
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub due_amount: Money,
    pub paid_amount: Money,
    pub status: InstallmentStatus,
    pub punctuality: Punctuality,
    /// bumped on every write; stale writes are rejected
    pub version: u64,
}

impl Installment {
    pub fn remaining(&self) -> Money {
        self.due_amount.saturating_sub(self.paid_amount)
    }

    pub fn is_paid(&self) -> bool {
        self.status.is_paid()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstallment {
    pub member_id: MemberId,
    pub contract_id: Option<ContractId>,
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub due_amount: Money,
    pub paid_amount: Money,
    pub status: InstallmentStatus,
}

/// deposit event ("aporte"), immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub member_id: MemberId,
    pub target_installment_id: Option<InstallmentId>,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
    pub receipt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub member_id: MemberId,
    pub target_installment_id: Option<InstallmentId>,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
    pub receipt: Option<String>,
}

/// portion of a payment applied to one installment ("aporte-detalle")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub id: PaymentDetailId,
    pub payment_id: PaymentId,
    pub installment_id: InstallmentId,
    pub amount: Money,
}

/// payment remainder that found no installment to pay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspenseEntry {
    pub member_id: MemberId,
    pub payment_id: PaymentId,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub id: TemplateId,
    pub kind: TemplateKind,
    pub file: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub member_id: MemberId,
    pub template_id: TemplateId,
    pub stage: u32,
    pub document_path: String,
    pub amount_in_words: Option<String>,
    pub signing_city: Option<String>,
    pub signing_date: Option<NaiveDate>,
    pub status: ContractStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContract {
    pub member_id: MemberId,
    pub template_id: TemplateId,
    pub stage: u32,
    pub document_path: String,
    pub amount_in_words: Option<String>,
    pub signing_city: Option<String>,
    pub signing_date: Option<NaiveDate>,
    pub status: ContractStatus,
}
