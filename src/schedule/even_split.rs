use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{EngineError, Result};

/// one line of a planned schedule, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedInstallment {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub due_amount: Money,
}

/// split `total` into `count` equal installments between `start` and `end`
///
/// Due dates are spread evenly over the range, the first on `start` and the last on
/// `end`; day offsets round halves up. Every line gets `total / count` rounded to
/// cents and the last line absorbs the rounding residual so the schedule sums to
/// `total` exactly.
pub fn plan_even_split(
    total: Money,
    count: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PlannedInstallment>> {
    if count < 1 {
        return Err(EngineError::invalid_schedule("count must be at least 1"));
    }
    if end <= start {
        return Err(EngineError::invalid_schedule(format!(
            "end date {} must be after start date {}",
            end, start
        )));
    }
    if !total.is_positive() {
        return Err(EngineError::invalid_schedule(format!(
            "total amount must be positive, got {}",
            total
        )));
    }

    let share = total.split_even(count);
    if share.is_zero() {
        return Err(EngineError::invalid_schedule(format!(
            "total {} is too small for {} installments",
            total, count
        )));
    }

    let span = (end - start).num_days();
    let steps = i64::from(count - 1);

    let mut lines: Vec<PlannedInstallment> = (0..count)
        .map(|i| {
            let offset = if steps == 0 {
                0
            } else {
                (2 * i64::from(i) * span + steps) / (2 * steps)
            };
            PlannedInstallment {
                sequence: i + 1,
                due_date: start + Duration::days(offset),
                due_amount: share,
            }
        })
        .collect();

    let planned: Money = lines.iter().map(|l| l.due_amount).sum();
    let residual = total - planned;
    if let Some(last) = lines.last_mut() {
        last.due_amount += residual;
        if !last.due_amount.is_positive() {
            return Err(EngineError::invalid_schedule(format!(
                "rounding leaves the last installment at {}",
                last.due_amount
            )));
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_three_even_installments() {
        let lines = plan_even_split(Money::from_major(300), 3, date(2025, 1, 1), date(2025, 3, 1)).unwrap();

        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.due_amount == Money::from_major(100)));
        assert_eq!(lines[0].due_date, date(2025, 1, 1));
        // 59 days / 2 = 29.5, rounded up
        assert_eq!(lines[1].due_date, date(2025, 1, 31));
        assert_eq!(lines[2].due_date, date(2025, 3, 1));
        assert_eq!(lines.iter().map(|l| l.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_single_installment_due_on_start() {
        let lines = plan_even_split(Money::from_str_exact("1234.56").unwrap(), 1, date(2025, 5, 10), date(2025, 12, 31)).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].due_date, date(2025, 5, 10));
        assert_eq!(lines[0].due_amount, Money::from_str_exact("1234.56").unwrap());
    }

    #[test]
    fn test_last_installment_absorbs_rounding() {
        let lines = plan_even_split(Money::from_major(100), 3, date(2025, 1, 1), date(2025, 12, 1)).unwrap();

        assert_eq!(lines[0].due_amount, Money::from_minor(3333));
        assert_eq!(lines[1].due_amount, Money::from_minor(3333));
        assert_eq!(lines[2].due_amount, Money::from_minor(3334));

        let lines = plan_even_split(Money::from_major(200), 3, date(2025, 1, 1), date(2025, 12, 1)).unwrap();
        // 66.67 * 2 = 133.34, last gets 66.66
        assert_eq!(lines[2].due_amount, Money::from_minor(6666));
    }

    #[test]
    fn test_schedule_sum_matches_total() {
        let totals = ["1000.00", "999.99", "0.07", "15000.00", "7777.77", "3.33"];
        for total in totals {
            let total = Money::from_str_exact(total).unwrap();
            for count in 1..=7 {
                match plan_even_split(total, count, date(2025, 1, 1), date(2026, 1, 1)) {
                    Ok(lines) => {
                        let sum: Money = lines.iter().map(|l| l.due_amount).sum();
                        assert_eq!(sum, total, "total {} count {}", total, count);
                        assert_eq!(lines.len() as u32, count);
                        assert_eq!(lines.last().unwrap().due_date, if count == 1 { date(2025, 1, 1) } else { date(2026, 1, 1) });
                    }
                    Err(EngineError::InvalidScheduleParameters { .. }) => {
                        assert!(total < Money::from_major(1));
                    }
                    Err(other) => panic!("unexpected error {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_due_dates_are_non_decreasing() {
        let lines = plan_even_split(Money::from_major(1200), 12, date(2025, 1, 15), date(2025, 12, 15)).unwrap();
        for pair in lines.windows(2) {
            assert!(pair[0].due_date <= pair[1].due_date);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let start = date(2025, 1, 1);
        let end = date(2025, 6, 1);

        assert!(matches!(
            plan_even_split(Money::from_major(100), 0, start, end),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            plan_even_split(Money::from_major(100), 3, end, start),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            plan_even_split(Money::from_major(100), 3, start, start),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            plan_even_split(Money::ZERO, 3, start, end),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            plan_even_split(Money::from_major(-50), 3, start, end),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            plan_even_split(Money::CENT, 3, start, end),
            Err(EngineError::InvalidScheduleParameters { .. })
        ));
    }
}
