use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractId, InstallmentId, MemberId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("member not found: {id}")]
    MemberNotFound {
        id: MemberId,
    },

    #[error("member not found: national id {national_id}, stage {stage}")]
    MemberKeyNotFound {
        national_id: String,
        stage: u32,
    },

    #[error("installment not found: {id}")]
    InstallmentNotFound {
        id: InstallmentId,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("no schedule for contract: {id}")]
    NoScheduleForContract {
        id: ContractId,
    },

    #[error("member already registered: national id {national_id}, stage {stage}")]
    DuplicateMember {
        national_id: String,
        stage: u32,
    },

    #[error("invalid schedule parameters: {message}")]
    InvalidScheduleParameters {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid total obligation: {amount}")]
    InvalidObligation {
        amount: Money,
    },

    #[error("invalid project stage: {stage}")]
    InvalidStage {
        stage: u32,
    },

    #[error("schedule already has payments on {paid_installments} installments")]
    ScheduleHasPayments {
        paid_installments: usize,
    },

    #[error("payment exceeds outstanding debt: {unapplied} could not be applied")]
    PaymentExceedsDebt {
        unapplied: Money,
    },

    #[error("transaction conflict on installment {installment_id}")]
    TransactionConflict {
        installment_id: InstallmentId,
    },

    #[error("persistence failure: {message}")]
    PersistenceFailure {
        message: String,
    },
}

impl EngineError {
    /// whether the caller may retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransactionConflict { .. })
    }

    /// client-side errors that must not be retried
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            EngineError::TransactionConflict { .. } | EngineError::PersistenceFailure { .. }
        )
    }

    pub(crate) fn invalid_schedule(message: impl Into<String>) -> Self {
        EngineError::InvalidScheduleParameters {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
