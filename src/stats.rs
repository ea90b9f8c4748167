use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Week => "week total",
            Period::Month => "month total",
            Period::Year => "year total",
        }
    }

    /// Whether `date` is the last day of this period
    pub fn ends_on(&self, date: NaiveDate) -> bool {
        match self {
            Period::Week => date.weekday() == Weekday::Sun,
            Period::Month => date == last_day_of_month(date),
            Period::Year => date.month() == 12 && date.day() == 31,
        }
    }
}

/// The 28th plus four days always lands in the following month; its first
/// day minus one is the last day of this one.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let probe = date.with_day(28).unwrap_or(date) + Duration::days(4);
    let next_month = probe.with_day(1).unwrap_or(probe);

    next_month - Duration::days(1)
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RollupPolicy {
    /// Week, month and year rollups all sum and then clear the same day
    /// bucket. On a date closing two periods the later one under-reports.
    #[default]
    SharedBucket,
    /// Every period keeps its own running total and only clears that.
    Independent,
}

/// A row the aggregator wants persisted, in the order it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatRow {
    Day { date: NaiveDate, count: u64 },
    Period { period: Period, total: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    policy: RollupPolicy,
    day: BTreeMap<NaiveDate, u64>,
    running: [u64; 3],
}

impl Statistics {
    pub fn new(policy: RollupPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    #[inline]
    pub fn policy(&self) -> RollupPolicy {
        self.policy
    }

    #[inline]
    pub fn day_count(&self, date: NaiveDate) -> u64 {
        self.day.get(&date).copied().unwrap_or(0)
    }

    #[inline]
    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &u64)> {
        self.day.iter()
    }

    /// Current total for `period` as the next rollup would report it
    pub fn pending_total(&self, period: Period) -> u64 {
        match self.policy {
            RollupPolicy::SharedBucket => self.day.values().sum(),
            RollupPolicy::Independent => self.running[slot(period)],
        }
    }

    /// Counts one visit at `now` and decides which rows to write: always the
    /// updated day count, then a total for every period ending today.
    pub fn record_visit_and_maybe_rollup(&mut self, now: NaiveDateTime) -> Vec<StatRow> {
        let date = now.date();

        if self.policy == RollupPolicy::Independent {
            // only today's bucket is ever reported again
            self.day.retain(|d, _| *d == date);
            self.running.iter_mut().for_each(|t| *t += 1);
        }

        let count = self.day.entry(date).or_insert(0);
        *count += 1;

        let mut rows = vec![StatRow::Day {
            date,
            count: *count,
        }];

        for period in [Period::Week, Period::Month, Period::Year] {
            if !period.ends_on(date) {
                continue;
            }

            let total = self.pending_total(period);
            match self.policy {
                RollupPolicy::SharedBucket => self.day.clear(),
                RollupPolicy::Independent => self.running[slot(period)] = 0,
            }

            rows.push(StatRow::Period { period, total });
        }

        rows
    }
}

#[inline]
fn slot(period: Period) -> usize {
    match period {
        Period::Week => 0,
        Period::Month => 1,
        Period::Year => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn periods(rows: &[StatRow]) -> Vec<Period> {
        rows.iter()
            .filter_map(|r| match r {
                StatRow::Period { period, .. } => Some(*period),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn month_end_dates() {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(last_day_of_month(ymd(2024, 2, 10)), ymd(2024, 2, 29));
        assert_eq!(last_day_of_month(ymd(2023, 2, 1)), ymd(2023, 2, 28));
        assert_eq!(last_day_of_month(ymd(2024, 4, 30)), ymd(2024, 4, 30));
        assert_eq!(last_day_of_month(ymd(2024, 1, 28)), ymd(2024, 1, 31));
        assert_eq!(last_day_of_month(ymd(2024, 12, 5)), ymd(2024, 12, 31));
    }

    #[test]
    fn same_day_accumulates() {
        let mut stats = Statistics::default();

        // 2024-06-10 is a Monday
        for _ in 0..3 {
            stats.record_visit_and_maybe_rollup(at(2024, 6, 10));
        }

        assert_eq!(stats.day_count(at(2024, 6, 10).date()), 3);
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 6, 10));
        assert_eq!(
            rows,
            vec![StatRow::Day {
                date: at(2024, 6, 10).date(),
                count: 4
            }]
        );
    }

    #[test]
    fn no_rollup_on_ordinary_dates() {
        let mut stats = Statistics::default();

        // Mon..Sat of an ordinary mid-month week
        for d in 10..=15 {
            let rows = stats.record_visit_and_maybe_rollup(at(2024, 6, d));
            assert!(periods(&rows).is_empty());
        }
        // the 28th is not a month end in a 30 day month
        assert!(periods(&stats.record_visit_and_maybe_rollup(at(2024, 6, 28))).is_empty());
        assert_eq!(stats.days().count(), 7);
    }

    #[test]
    fn sunday_rolls_up_week_and_resets() {
        let mut stats = Statistics::default();

        stats.record_visit_and_maybe_rollup(at(2024, 6, 10));
        stats.record_visit_and_maybe_rollup(at(2024, 6, 12));
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 6, 16));

        assert_eq!(
            rows,
            vec![
                StatRow::Day {
                    date: at(2024, 6, 16).date(),
                    count: 1
                },
                StatRow::Period {
                    period: Period::Week,
                    total: 3
                },
            ]
        );
        assert_eq!(stats.days().count(), 0);
    }

    #[test]
    fn month_end_rolls_up() {
        let mut stats = Statistics::default();

        // 2024-04-30 is a Tuesday
        stats.record_visit_and_maybe_rollup(at(2024, 4, 29));
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 4, 30));

        assert_eq!(periods(&rows), vec![Period::Month]);
        assert_eq!(rows[1], StatRow::Period { period: Period::Month, total: 2 });
    }

    #[test]
    fn shared_bucket_under_reports_second_period() {
        let mut stats = Statistics::new(RollupPolicy::SharedBucket);

        // 2024-03-31 is a Sunday and a month end
        stats.record_visit_and_maybe_rollup(at(2024, 3, 30));
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 3, 31));

        assert_eq!(
            &rows[1..],
            &[
                StatRow::Period {
                    period: Period::Week,
                    total: 2
                },
                StatRow::Period {
                    period: Period::Month,
                    total: 0
                },
            ]
        );
    }

    #[test]
    fn year_end_fires_all_matching_periods() {
        let mut stats = Statistics::default();

        // 2023-12-31 is a Sunday
        let rows = stats.record_visit_and_maybe_rollup(at(2023, 12, 31));
        assert_eq!(
            periods(&rows),
            vec![Period::Week, Period::Month, Period::Year]
        );

        // 2024-12-31 is a Tuesday
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 12, 31));
        assert_eq!(periods(&rows), vec![Period::Month, Period::Year]);
    }

    #[test]
    fn independent_totals_do_not_interfere() {
        let mut stats = Statistics::new(RollupPolicy::Independent);

        stats.record_visit_and_maybe_rollup(at(2024, 3, 29));
        stats.record_visit_and_maybe_rollup(at(2024, 3, 30));
        let rows = stats.record_visit_and_maybe_rollup(at(2024, 3, 31));

        assert_eq!(
            &rows[1..],
            &[
                StatRow::Period {
                    period: Period::Week,
                    total: 3
                },
                StatRow::Period {
                    period: Period::Month,
                    total: 3
                },
            ]
        );
        assert_eq!(stats.pending_total(Period::Year), 3);
        assert_eq!(stats.pending_total(Period::Week), 0);
        // old days are dropped, today's bucket survives the rollup
        assert_eq!(stats.days().count(), 1);
        assert_eq!(stats.day_count(at(2024, 3, 31).date()), 1);
    }
}
