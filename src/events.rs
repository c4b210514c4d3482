use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ContractId, InstallmentId, MemberId, PaymentId, Punctuality, TemplateId,
};

/// audit events, recorded in the same transaction as the change they describe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // member events
    MemberRegistered {
        member_id: MemberId,
        national_id: String,
        stage: u32,
        timestamp: DateTime<Utc>,
    },
    ObligationChanged {
        member_id: MemberId,
        old_amount: Money,
        new_amount: Money,
        timestamp: DateTime<Utc>,
    },
    MemberRemoved {
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },

    // schedule events
    ScheduleReplaced {
        member_id: MemberId,
        contract_id: Option<ContractId>,
        removed: usize,
        created: usize,
        total: Money,
        timestamp: DateTime<Utc>,
    },
    ManualScheduleCreated {
        member_id: MemberId,
        contract_id: ContractId,
        template_id: TemplateId,
        created: usize,
        skipped: usize,
        timestamp: DateTime<Utc>,
    },
    ContractOpened {
        member_id: MemberId,
        contract_id: ContractId,
        stage: u32,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRegistered {
        member_id: MemberId,
        payment_id: PaymentId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentApplied {
        payment_id: PaymentId,
        installment_id: InstallmentId,
        amount: Money,
        new_paid_amount: Money,
    },
    InstallmentCompleted {
        installment_id: InstallmentId,
        due_date: NaiveDate,
        punctuality: Punctuality,
        timestamp: DateTime<Utc>,
    },
    SurplusHeld {
        member_id: MemberId,
        payment_id: PaymentId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    InstallmentsOverdue {
        member_id: MemberId,
        count: usize,
        as_of: NaiveDate,
    },
}

/// event buffer for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
