use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type MemberId = Uuid;
pub type InstallmentId = Uuid;
pub type PaymentId = Uuid;
pub type PaymentDetailId = Uuid;
pub type ContractId = Uuid;
pub type TemplateId = Uuid;

/// installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    /// not yet fully paid, due date not passed (or partially paid)
    Pending,
    /// due date passed without full payment
    Overdue,
    /// fully paid; never reverted
    Paid,
}

impl InstallmentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallmentStatus::Pending => "PENDING",
            InstallmentStatus::Overdue => "OVERDUE",
            InstallmentStatus::Paid => "PAID",
        };
        f.write_str(label)
    }
}

/// on-time / late classification, set when an installment becomes paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Punctuality {
    Pending,
    OnTime,
    Late,
}

impl Punctuality {
    /// compare deposit day against due day; time of day is ignored
    pub fn classify(payment_date: DateTime<Utc>, due_date: NaiveDate) -> Self {
        if payment_date.date_naive() <= due_date {
            Punctuality::OnTime
        } else {
            Punctuality::Late
        }
    }
}

impl fmt::Display for Punctuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Punctuality::Pending => "PENDING",
            Punctuality::OnTime => "ON_TIME",
            Punctuality::Late => "LATE",
        };
        f.write_str(label)
    }
}

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// active ("VIGENTE")
    Vigente,
    Anulado,
    Finalizado,
}

/// contract template kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateKind(pub String);

impl TemplateKind {
    pub fn new(kind: impl Into<String>) -> Self {
        TemplateKind(kind.into())
    }

    /// contracts signed outside the system
    pub fn external() -> Self {
        TemplateKind::new("EXTERNO")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// group of installments replaced together by schedule generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleScope {
    pub member_id: MemberId,
    pub contract_id: Option<ContractId>,
}

impl ScheduleScope {
    pub fn new(member_id: MemberId, contract_id: Option<ContractId>) -> Self {
        Self { member_id, contract_id }
    }
}

/// inclusive calendar-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// january 1st through december 31st of the given year
    pub fn calendar_year(year: i32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// window from optional bounds, each defaulting to the year of `today`
    pub fn or_current_year(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        let year = DateWindow::calendar_year(today.year());
        Self {
            start: start.unwrap_or(year.start),
            end: end.unwrap_or(year.end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_punctuality_ignores_time_of_day() {
        let due = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let late_evening = Utc.with_ymd_and_hms(2025, 1, 5, 23, 59, 59).unwrap();
        assert_eq!(Punctuality::classify(late_evening, due), Punctuality::OnTime);

        let next_morning = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 1).unwrap();
        assert_eq!(Punctuality::classify(next_morning, due), Punctuality::Late);

        let early = Utc.with_ymd_and_hms(2024, 12, 20, 9, 0, 0).unwrap();
        assert_eq!(Punctuality::classify(early, due), Punctuality::OnTime);
    }

    #[test]
    fn test_date_window_defaults_to_current_year() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let window = DateWindow::or_current_year(None, None, today);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

        let custom_start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let window = DateWindow::or_current_year(Some(custom_start), None, today);
        assert_eq!(window.start, custom_start);
        assert!(window.contains(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(InstallmentStatus::Overdue.to_string(), "OVERDUE");
        assert_eq!(Punctuality::OnTime.to_string(), "ON_TIME");
        assert_eq!(
            serde_json::to_string(&InstallmentStatus::Paid).unwrap(),
            "\"PAID\""
        );
    }
}
