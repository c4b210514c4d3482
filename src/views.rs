//! display-boundary views; every date is rendered as a `YYYY-MM-DD` calendar day

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::Allocation;
use crate::decimal::Money;
use crate::records::{Installment, Member, Payment};
use crate::reporting::{MemberStatement, StatementLine};
use crate::types::{ContractId, InstallmentId, InstallmentStatus, MemberId, PaymentId, Punctuality};

const CALENDAR_FORMAT: &str = "%Y-%m-%d";

pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_FORMAT).to_string()
}

/// calendar day of a timestamp, taken in UTC
pub fn format_timestamp_date(timestamp: DateTime<Utc>) -> String {
    format_calendar_date(timestamp.date_naive())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: InstallmentId,
    pub contract_id: Option<ContractId>,
    pub sequence: u32,
    pub due_date: String,
    pub due_amount: Money,
    pub paid_amount: Money,
    pub remaining: Money,
    pub status: InstallmentStatus,
    pub punctuality: Punctuality,
}

impl InstallmentView {
    pub fn from_installment(installment: &Installment) -> Self {
        InstallmentView {
            id: installment.id,
            contract_id: installment.contract_id,
            sequence: installment.sequence,
            due_date: format_calendar_date(installment.due_date),
            due_amount: installment.due_amount,
            paid_amount: installment.paid_amount,
            remaining: installment.remaining(),
            status: installment.status,
            punctuality: installment.punctuality,
        }
    }
}

/// a member's schedule with running totals
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleView {
    pub member_id: MemberId,
    pub national_id: String,
    pub member_name: String,
    pub stage: u32,
    pub total_due: Money,
    pub total_paid: Money,
    pub installments: Vec<InstallmentView>,
}

impl ScheduleView {
    pub fn new(member: &Member, installments: &[Installment]) -> Self {
        ScheduleView {
            member_id: member.id,
            national_id: member.national_id.clone(),
            member_name: member.full_name(),
            stage: member.stage,
            total_due: installments.iter().map(|i| i.due_amount).sum(),
            total_paid: installments.iter().map(|i| i.paid_amount).sum(),
            installments: installments.iter().map(InstallmentView::from_installment).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedView {
    pub installment_id: InstallmentId,
    pub sequence: Option<u32>,
    pub due_date: Option<String>,
    pub amount: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub date: String,
    pub amount: Money,
    pub note: Option<String>,
    pub receipt: Option<String>,
    pub applied: Vec<AppliedView>,
    pub unapplied: Money,
}

impl PaymentView {
    /// view of a freshly allocated payment
    pub fn from_allocation(allocation: &Allocation) -> Self {
        let applied = allocation
            .applications
            .iter()
            .map(|a| AppliedView {
                installment_id: a.installment_id,
                sequence: Some(a.sequence),
                due_date: None,
                amount: a.applied,
            })
            .collect();
        Self::with_applied(&allocation.payment, applied, allocation.unapplied)
    }

    fn from_statement_lines(payment: &Payment, lines: &[StatementLine]) -> Self {
        let applied: Vec<AppliedView> = lines
            .iter()
            .map(|line| AppliedView {
                installment_id: line.detail.installment_id,
                sequence: line.installment.as_ref().map(|i| i.sequence),
                due_date: line
                    .installment
                    .as_ref()
                    .map(|i| format_calendar_date(i.due_date)),
                amount: line.detail.amount,
            })
            .collect();
        let total_applied: Money = applied.iter().map(|a| a.amount).sum();
        Self::with_applied(payment, applied, payment.amount - total_applied)
    }

    fn with_applied(payment: &Payment, applied: Vec<AppliedView>, unapplied: Money) -> Self {
        PaymentView {
            id: payment.id,
            date: format_timestamp_date(payment.date),
            amount: payment.amount,
            note: payment.note.clone(),
            receipt: payment.receipt.clone(),
            applied,
            unapplied,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// payment history of a member, newest first
#[derive(Debug, Serialize, Deserialize)]
pub struct StatementView {
    pub national_id: String,
    pub stage: u32,
    pub member_name: String,
    pub block: String,
    pub lot: String,
    pub total_paid: Money,
    pub suspense: Money,
    pub payments: Vec<PaymentView>,
}

impl StatementView {
    pub fn from_statement(statement: &MemberStatement) -> Self {
        let member = &statement.member;
        StatementView {
            national_id: member.national_id.clone(),
            stage: member.stage,
            member_name: member.full_name(),
            block: member.block.clone().unwrap_or_else(|| "-".to_string()),
            lot: member.lot.clone().unwrap_or_else(|| "-".to_string()),
            total_paid: statement.total_paid,
            suspense: statement.suspense,
            payments: statement
                .entries
                .iter()
                .map(|entry| PaymentView::from_statement_lines(&entry.payment, &entry.lines))
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PaymentDetail;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn member() -> Member {
        Member {
            id: Uuid::new_v4(),
            national_id: "41234567".to_string(),
            stage: 1,
            given_names: "Carmen".to_string(),
            paternal_surname: "Yupanqui".to_string(),
            maternal_surname: "Lopez".to_string(),
            block: Some("E".to_string()),
            lot: None,
            total_obligation: Money::from_major(200),
            registered_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    fn installment(member_id: MemberId, sequence: u32, paid: i64) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            member_id,
            contract_id: None,
            sequence,
            due_date: NaiveDate::from_ymd_opt(2025, sequence, 5).unwrap(),
            due_amount: Money::from_major(100),
            paid_amount: Money::from_major(paid),
            status: if paid >= 100 { InstallmentStatus::Paid } else { InstallmentStatus::Pending },
            punctuality: if paid >= 100 { Punctuality::OnTime } else { Punctuality::Pending },
            version: 1,
        }
    }

    #[test]
    fn test_dates_render_as_calendar_days() {
        assert_eq!(format_calendar_date(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()), "2025-03-09");
        // late evening UTC stays on the same calendar day
        let evening = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(format_timestamp_date(evening), "2025-01-31");
    }

    #[test]
    fn test_schedule_view_totals() {
        let member = member();
        let rows = vec![installment(member.id, 1, 100), installment(member.id, 2, 40)];
        let view = ScheduleView::new(&member, &rows);

        assert_eq!(view.member_name, "Carmen Yupanqui Lopez");
        assert_eq!(view.total_due, Money::from_major(200));
        assert_eq!(view.total_paid, Money::from_major(140));
        assert_eq!(view.installments[1].remaining, Money::from_major(60));
        assert_eq!(view.installments[0].due_date, "2025-01-05");

        let json = view.to_json_pretty().unwrap();
        assert!(json.contains("\"due_date\": \"2025-02-05\""));
        assert!(json.contains("\"ON_TIME\""));
    }

    #[test]
    fn test_statement_view_reports_unapplied_remainder() {
        let member = member();
        let rows = vec![installment(member.id, 1, 100)];
        let payment = Payment {
            id: Uuid::new_v4(),
            member_id: member.id,
            target_installment_id: Some(rows[0].id),
            amount: Money::from_major(130),
            date: Utc.with_ymd_and_hms(2025, 1, 3, 18, 0, 0).unwrap(),
            note: Some("deposito BCP".to_string()),
            receipt: Some("uploads/voucher-0001.jpg".to_string()),
        };
        let detail = PaymentDetail {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            installment_id: rows[0].id,
            amount: Money::from_major(100),
        };
        let statement = MemberStatement {
            member: member.clone(),
            entries: vec![crate::reporting::StatementEntry {
                payment,
                lines: vec![StatementLine {
                    detail,
                    installment: Some(rows[0].clone()),
                }],
            }],
            total_paid: Money::from_major(130),
            suspense: Money::from_major(30),
        };

        let view = StatementView::from_statement(&statement);
        assert_eq!(view.block, "E");
        assert_eq!(view.lot, "-");
        assert_eq!(view.payments[0].date, "2025-01-03");
        assert_eq!(view.payments[0].unapplied, Money::from_major(30));
        assert_eq!(view.payments[0].applied[0].due_date.as_deref(), Some("2025-01-05"));
        assert!(view.to_json_pretty().unwrap().contains("voucher-0001"));
    }
}
