pub mod allocation;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod members;
pub mod reconciler;
pub mod records;
pub mod reporting;
pub mod schedule;
pub mod store;
pub mod types;
pub mod views;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

// re-export key types
pub use allocation::{Allocation, AllocationEngine, InstallmentApplication, PaymentRequest};
pub use config::{EngineConfig, ExternalContractConfig, SurplusPolicy};
pub use decimal::{Money, Percentage};
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use members::MemberRegistry;
pub use reconciler::ScheduleReconciler;
pub use records::{
    Contract, ContractTemplate, Installment, Member, NewMember, Payment, PaymentDetail,
    SuspenseEntry,
};
pub use reporting::{
    ComplianceBreakdown, IncomeSummary, MemberDebt, MemberStatement, ReportQuery,
    ReportingAggregator,
};
pub use schedule::{
    ContractContext, GenerateRequest, ManualInstallment, ManualScheduleOutcome,
    ManualScheduleRequest, PlannedInstallment, ScheduleGenerator, ScheduleLine, ScheduleOutcome,
};
pub use store::{MemoryStore, Reader, Store, Transaction};
pub use types::{
    ContractId, ContractStatus, DateWindow, InstallmentId, InstallmentStatus, MemberId,
    PaymentId, Punctuality, ScheduleScope, TemplateKind,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

static INIT_TRACING: Once = Once::new();

/// install a fmt subscriber filtered by `RUST_LOG`, defaulting to this crate at info
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("installment_allocation=info"));
        // another subscriber may already be installed by the host application
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        tracing::info!("installment allocation tracing initialized");
    });
}
