//! Calendar date index: which days of a month have documents.
//!
//! Days are calendar days in the caller's time zone; time of day is ignored.

use crate::models::Record;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current<Tz: TimeZone>(tz: &Tz) -> Self {
        Self::containing(Utc::now().with_timezone(tz).date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn days(&self) -> u32 {
        (self.next().first_day() - self.first_day()).num_days() as u32
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_day().weekday()
    }

    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    /// UTC instants bounding this month in `tz`, as a half-open range.
    pub fn bounds<Tz: TimeZone>(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight(self.first_day(), tz),
            local_midnight(self.next().first_day(), tz),
        )
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {s}"))?;
        let year = y.parse().map_err(|_| format!("invalid year in {s}"))?;
        let month = m.parse().map_err(|_| format!("invalid month in {s}"))?;
        YearMonth::new(year, month).ok_or_else(|| format!("invalid month in {s}"))
    }
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a forward jump: the day starts where midnight
        // would fall under the offset in force just before the gap.
        LocalResult::None => tz
            .from_local_datetime(&(naive - Duration::hours(1)))
            .earliest()
            .map(|before| (before + Duration::hours(1)).with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

pub fn local_date<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Day numbers of `month` with at least one record created on them.
pub fn days_with_records<Tz: TimeZone>(
    records: &[Record],
    month: YearMonth,
    tz: &Tz,
) -> BTreeSet<u32> {
    records
        .iter()
        .map(|r| local_date(&r.created_at, tz))
        .filter(|d| YearMonth::containing(*d) == month)
        .map(|d| d.day())
        .collect()
}

/// Records created on `date`, newest first.
pub fn records_on<Tz: TimeZone>(records: &[Record], date: NaiveDate, tz: &Tz) -> Vec<Record> {
    let mut out: Vec<Record> = records
        .iter()
        .filter(|r| local_date(&r.created_at, tz) == date)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

/// Per-day document counts, built in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateIndex {
    days: BTreeMap<NaiveDate, usize>,
}

impl DateIndex {
    pub fn build<Tz: TimeZone>(records: &[Record], tz: &Tz) -> Self {
        let mut days = BTreeMap::new();
        for r in records {
            *days.entry(local_date(&r.created_at, tz)).or_insert(0) += 1;
        }
        Self { days }
    }

    pub fn has(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn count(&self, date: NaiveDate) -> usize {
        self.days.get(&date).copied().unwrap_or(0)
    }

    pub fn days_in(&self, month: YearMonth) -> BTreeSet<u32> {
        let start = month.first_day();
        let end = month.next().first_day();
        self.days.range(start..end).map(|(d, _)| d.day()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, FileKind};
    use crate::payload::DataUrl;
    use chrono::FixedOffset;

    fn at(id: i64, rfc3339: &str) -> Record {
        let created = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        Record {
            id,
            title: format!("doc {id}"),
            description: None,
            tags: vec![],
            file_name: "a.txt".into(),
            file_kind: FileKind::Txt,
            category: Category::Document,
            payload: DataUrl::new("text/plain", b"x".to_vec()),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn month_navigation_wraps_years() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.prev(), YearMonth::new(2023, 12).unwrap());
        assert_eq!(jan.prev().next(), jan);
        assert_eq!(YearMonth::new(2024, 2).unwrap().days(), 29);
        assert_eq!(YearMonth::new(2023, 2).unwrap().days(), 28);
        assert_eq!(jan.first_weekday(), Weekday::Mon);
        assert!(YearMonth::new(2024, 13).is_none());
        assert_eq!("2024-03".parse::<YearMonth>().unwrap().to_string(), "2024-03");
    }

    #[test]
    fn marks_days_ignoring_time_of_day() {
        let records = vec![
            at(1, "2024-01-01T10:00:00Z"),
            at(2, "2024-01-01T23:59:00Z"),
            at(3, "2024-01-15T00:00:00Z"),
            at(4, "2024-02-01T08:00:00Z"),
        ];
        let days = days_with_records(&records, YearMonth::new(2024, 1).unwrap(), &Utc);
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![1, 15]);
    }

    #[test]
    fn uses_local_date_of_the_time_zone() {
        let records = vec![at(1, "2024-01-31T22:30:00Z")];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let jan = YearMonth::new(2024, 1).unwrap();
        assert!(days_with_records(&records, jan, &plus_two).is_empty());
        let feb = days_with_records(&records, jan.next(), &plus_two);
        assert_eq!(feb.into_iter().collect::<Vec<_>>(), vec![1]);

        let (start, end) = jan.next().bounds(&plus_two);
        assert_eq!(start.to_rfc3339(), "2024-01-31T22:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-02-29T22:00:00+00:00");
    }

    #[test]
    fn records_on_day_newest_first() {
        let records = vec![
            at(1, "2024-01-02T08:00:00Z"),
            at(2, "2024-01-02T09:00:00Z"),
            at(3, "2024-01-03T09:00:00Z"),
        ];
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let ids: Vec<i64> = records_on(&records, day, &Utc).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn date_index_matches_scan() {
        let records = vec![
            at(1, "2024-01-01T10:00:00Z"),
            at(2, "2024-01-01T11:00:00Z"),
            at(3, "2024-01-20T11:00:00Z"),
            at(4, "2023-12-31T11:00:00Z"),
        ];
        let jan = YearMonth::new(2024, 1).unwrap();
        let index = DateIndex::build(&records, &Utc);
        assert_eq!(index.days_in(jan), days_with_records(&records, jan, &Utc));
        assert_eq!(index.count(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), 2);
        assert!(!index.has(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }

    /// UTC-3 until 2024-03-10 03:00 UTC, then UTC-2: local midnight of
    /// March 10th never happens.
    #[derive(Debug, Clone)]
    struct MidnightJump;

    impl MidnightJump {
        fn before() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }

        fn switch() -> chrono::NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap()
        }
    }

    impl TimeZone for MidnightJump {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightJump
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(12, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &chrono::NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::switch() - Duration::hours(3);
            if *local < gap_start {
                LocalResult::Single(Self::before())
            } else if *local < gap_start + Duration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::after())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &chrono::NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    #[test]
    fn skipped_midnight_starts_the_day_at_the_jump() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = local_midnight(day, &MidnightJump);
        assert_eq!(start.to_rfc3339(), "2024-03-10T03:00:00+00:00");
        assert_eq!(local_date(&start, &MidnightJump), day);
        assert_eq!(
            local_date(&(start - Duration::seconds(1)), &MidnightJump),
            day.pred_opt().unwrap()
        );

        let (from, to) = YearMonth::new(2024, 3).unwrap().bounds(&MidnightJump);
        assert_eq!(from.to_rfc3339(), "2024-03-01T03:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-04-01T02:00:00+00:00");
    }
}
