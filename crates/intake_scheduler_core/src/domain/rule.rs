//! crates/intake_scheduler_core/src/domain/rule.rs
//!
//! Recurrence rules in the iCalendar RRULE text format (RFC 5545), limited to
//! what intake plans need: daily, weekly and monthly frequencies with
//! hour/minute/second lists, weekday lists and month-day lists.
//!
//! A rule is parsed and validated once. Evaluation happens on a [`BoundRule`],
//! which is the rule cut to a course window. The rule keeps its own `DTSTART`
//! as the anchor of its period grid; the course only filters what it yields.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc, Weekday,
};

use super::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            other => Err(DomainError::validation(format!(
                "unsupported FREQ '{other}'"
            ))),
        }
    }
}

/// A `BYDAY` entry. `ordinal` is only meaningful for monthly rules
/// (`1MO` is the first Monday, `-1FR` the last Friday of the month).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySpec {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl FromStr for WeekdaySpec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 || !s.is_ascii() {
            return Err(DomainError::validation(format!("invalid BYDAY value '{s}'")));
        }
        let (prefix, code) = s.split_at(s.len() - 2);
        let weekday = parse_weekday(code)?;
        let ordinal = if prefix.is_empty() {
            None
        } else {
            let n: i32 = prefix
                .parse()
                .map_err(|_| DomainError::validation(format!("invalid BYDAY ordinal in '{s}'")))?;
            if n == 0 || n.abs() > 5 {
                return Err(DomainError::validation(format!(
                    "BYDAY ordinal out of range in '{s}'"
                )));
            }
            Some(n)
        };
        Ok(Self { ordinal, weekday })
    }
}

/// A parsed, validated recurrence rule that is not yet tied to a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    source: String,
    freq: Frequency,
    interval: u32,
    count: Option<u32>,
    until: Option<DateTime<Utc>>,
    dtstart: Option<DateTime<Utc>>,
    by_hour: Vec<u32>,
    by_minute: Vec<u32>,
    by_second: Vec<u32>,
    by_day: Vec<WeekdaySpec>,
    by_month_day: Vec<i32>,
    week_start: Weekday,
}

impl RecurrenceRule {
    /// Parses rule text such as `FREQ=DAILY;BYHOUR=9,19` or
    /// `DTSTART:20240101T000000Z\nRRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR;BYHOUR=15`.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let mut dtstart = None;
        let mut body = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let upper = line.to_ascii_uppercase();
            if let Some(rest) = upper.strip_prefix("DTSTART") {
                let (params, value) = rest
                    .split_once(':')
                    .ok_or_else(|| DomainError::validation("DTSTART requires a value"))?;
                // Only UTC instants are understood; a TZID would shift every occurrence.
                if let Some(param) = params
                    .split(';')
                    .find(|p| !p.is_empty() && *p != "VALUE=DATE" && *p != "VALUE=DATE-TIME")
                {
                    return Err(DomainError::validation(format!(
                        "unsupported DTSTART parameter '{param}'"
                    )));
                }
                dtstart = Some(parse_datetime(value)?);
            } else if let Some(rest) = upper.strip_prefix("RRULE:") {
                set_once(&mut body, rest.to_string())?;
            } else if upper.contains("FREQ=") {
                set_once(&mut body, upper)?;
            } else {
                return Err(DomainError::validation(format!(
                    "unrecognised recurrence line '{line}'"
                )));
            }
        }

        let body = body.ok_or_else(|| DomainError::validation("recurrence rule is empty"))?;
        let mut rule = Self::parse_body(&body)?;
        rule.dtstart = dtstart;
        rule.source = text.trim().to_string();
        Ok(rule)
    }

    fn parse_body(body: &str) -> DomainResult<Self> {
        let mut freq = None;
        let mut rule = Self {
            source: String::new(),
            freq: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            dtstart: None,
            by_hour: Vec::new(),
            by_minute: Vec::new(),
            by_second: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            week_start: Weekday::Mon,
        };

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| DomainError::validation(format!("malformed rule part '{part}'")))?;
            if value.is_empty() {
                return Err(DomainError::validation(format!("{key} has no value")));
            }
            match key {
                "FREQ" => freq = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = parse_number(key, value)?;
                    if rule.interval == 0 {
                        return Err(DomainError::validation("INTERVAL must be at least 1"));
                    }
                }
                "COUNT" => {
                    let count: u32 = parse_number(key, value)?;
                    if count == 0 {
                        return Err(DomainError::validation("COUNT must be at least 1"));
                    }
                    rule.count = Some(count);
                }
                "UNTIL" => rule.until = Some(parse_datetime(value)?),
                "BYHOUR" => rule.by_hour = parse_list(key, value, 0, 23)?,
                "BYMINUTE" => rule.by_minute = parse_list(key, value, 0, 59)?,
                "BYSECOND" => rule.by_second = parse_list(key, value, 0, 59)?,
                "BYMONTHDAY" => {
                    let mut days = value
                        .split(',')
                        .map(|v| parse_number::<i32>(key, v.trim()))
                        .collect::<DomainResult<Vec<_>>>()?;
                    if days.iter().any(|d| *d == 0 || d.abs() > 31) {
                        return Err(DomainError::validation(
                            "BYMONTHDAY values must be within ±1..31",
                        ));
                    }
                    days.sort_unstable();
                    days.dedup();
                    rule.by_month_day = days;
                }
                "BYDAY" => {
                    let mut days = value
                        .split(',')
                        .map(|v| v.trim().parse::<WeekdaySpec>())
                        .collect::<DomainResult<Vec<_>>>()?;
                    days.dedup();
                    rule.by_day = days;
                }
                "WKST" => rule.week_start = parse_weekday(value)?,
                other => {
                    return Err(DomainError::validation(format!(
                        "unsupported rule part '{other}'"
                    )))
                }
            }
        }

        rule.freq = freq.ok_or_else(|| DomainError::validation("FREQ is required"))?;
        if rule.count.is_some() && rule.until.is_some() {
            return Err(DomainError::validation("COUNT and UNTIL are mutually exclusive"));
        }
        if rule.freq != Frequency::Monthly && rule.by_day.iter().any(|d| d.ordinal.is_some()) {
            return Err(DomainError::validation(
                "BYDAY ordinals are only allowed with FREQ=MONTHLY",
            ));
        }
        if rule.freq == Frequency::Weekly && !rule.by_month_day.is_empty() {
            return Err(DomainError::validation("BYMONTHDAY is not allowed with FREQ=WEEKLY"));
        }
        Ok(rule)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    /// Cuts the rule to `[course_start, course_end]`.
    ///
    /// The rule's `DTSTART` (the course start when absent) stays the anchor for
    /// `INTERVAL`, `COUNT` and the time and day defaults.
    pub fn bind(self, course_start: DateTime<Utc>, course_end: DateTime<Utc>) -> BoundRule {
        let anchor = self.dtstart.unwrap_or(course_start);
        let start = anchor.max(course_start);
        let until = self.until.map_or(course_end, |u| u.min(course_end));
        BoundRule {
            rule: self,
            anchor,
            start,
            until,
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A recurrence rule cut to a course window; the unit of evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRule {
    rule: RecurrenceRule,
    anchor: DateTime<Utc>,
    start: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl BoundRule {
    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Returns the earliest occurrence strictly after `from`, or `None` once
    /// the rule is exhausted.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if from >= self.until || self.start > self.until {
            return None;
        }

        // COUNT is relative to the anchor, so counted rules always walk from
        // the first period, including occurrences before the course.
        let first_period = if self.rule.count.is_some() {
            0
        } else {
            self.period_index_of(from.max(self.start))
        };
        let last_day = self.until.date_naive();
        let times = self.times_of_day();
        let mut emitted = 0u32;

        for period in first_period.. {
            let (period_start, dates) = self.dates_in_period(period)?;
            if period_start > last_day {
                return None;
            }
            for date in dates {
                for time in &times {
                    let instant = Utc.from_utc_datetime(&NaiveDateTime::new(date, *time));
                    if instant < self.anchor {
                        continue;
                    }
                    if instant > self.until {
                        return None;
                    }
                    if let Some(count) = self.rule.count {
                        if emitted >= count {
                            return None;
                        }
                        emitted += 1;
                    }
                    if instant >= self.start && instant > from {
                        return Some(instant);
                    }
                }
            }
        }
        None
    }

    fn times_of_day(&self) -> Vec<NaiveTime> {
        let pick = |list: &[u32], fallback: u32| {
            if list.is_empty() {
                vec![fallback]
            } else {
                list.to_vec()
            }
        };
        let hours = pick(&self.rule.by_hour, self.anchor.hour());
        let minutes = pick(&self.rule.by_minute, self.anchor.minute());
        let seconds = pick(&self.rule.by_second, self.anchor.second());

        let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
        for h in &hours {
            for m in &minutes {
                for s in &seconds {
                    if let Some(t) = NaiveTime::from_hms_opt(*h, *m, *s) {
                        times.push(t);
                    }
                }
            }
        }
        times.sort_unstable();
        times
    }

    fn start_week(&self) -> NaiveDate {
        week_begin(self.anchor.date_naive(), self.rule.week_start)
    }

    fn period_index_of(&self, at: DateTime<Utc>) -> u64 {
        let start = self.anchor.date_naive();
        let at = at.date_naive();
        let interval = u64::from(self.rule.interval);
        let elapsed = match self.rule.freq {
            Frequency::Daily => (at - start).num_days(),
            Frequency::Weekly => (at - self.start_week()).num_days() / 7,
            Frequency::Monthly => month_number(at) - month_number(start),
        };
        u64::try_from(elapsed).unwrap_or(0) / interval
    }

    /// Returns the first calendar day of period `k` and the sorted dates in it
    /// that satisfy the rule's day filters.
    fn dates_in_period(&self, k: u64) -> Option<(NaiveDate, Vec<NaiveDate>)> {
        let step = k.checked_mul(u64::from(self.rule.interval))?;
        match self.rule.freq {
            Frequency::Daily => {
                let day = self.anchor.date_naive().checked_add_days(Days::new(step))?;
                let dates = if self.matches_day_filters(day) {
                    vec![day]
                } else {
                    Vec::new()
                };
                Some((day, dates))
            }
            Frequency::Weekly => {
                let begin = self.start_week().checked_add_days(Days::new(step.checked_mul(7)?))?;
                let weekdays: Vec<Weekday> = if self.rule.by_day.is_empty() {
                    vec![self.anchor.date_naive().weekday()]
                } else {
                    self.rule.by_day.iter().map(|d| d.weekday).collect()
                };
                let mut dates: Vec<NaiveDate> = weekdays
                    .into_iter()
                    .filter_map(|wd| {
                        let offset = days_from(self.rule.week_start, wd);
                        begin.checked_add_days(Days::new(u64::from(offset)))
                    })
                    .collect();
                dates.sort_unstable();
                dates.dedup();
                Some((begin, dates))
            }
            Frequency::Monthly => {
                let month = month_number(self.anchor.date_naive()) + i64::try_from(step).ok()?;
                let first = first_of_month(month)?;
                Some((first, self.monthly_dates(first)))
            }
        }
    }

    fn matches_day_filters(&self, day: NaiveDate) -> bool {
        let weekday_ok = self.rule.by_day.is_empty()
            || self.rule.by_day.iter().any(|d| d.weekday == day.weekday());
        let month_day_ok = self.rule.by_month_day.is_empty()
            || self
                .rule
                .by_month_day
                .iter()
                .any(|md| resolve_month_day(day.year(), day.month(), *md) == Some(day.day()));
        weekday_ok && month_day_ok
    }

    fn monthly_dates(&self, first: NaiveDate) -> Vec<NaiveDate> {
        let (year, month) = (first.year(), first.month());
        let mut days: Vec<u32> = if !self.rule.by_month_day.is_empty() {
            let candidates = self
                .rule
                .by_month_day
                .iter()
                .filter_map(|md| resolve_month_day(year, month, *md));
            // BYDAY narrows BYMONTHDAY when both are given.
            candidates
                .filter(|d| {
                    self.rule.by_day.is_empty()
                        || NaiveDate::from_ymd_opt(year, month, *d).is_some_and(|date| {
                            self.rule.by_day.iter().any(|s| s.weekday == date.weekday())
                        })
                })
                .collect()
        } else if !self.rule.by_day.is_empty() {
            self.rule
                .by_day
                .iter()
                .flat_map(|spec| weekday_days_in_month(year, month, *spec))
                .collect()
        } else {
            let day = self.anchor.date_naive().day();
            if day <= days_in_month(year, month) {
                vec![day]
            } else {
                Vec::new()
            }
        };
        days.sort_unstable();
        days.dedup();
        days.into_iter()
            .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
            .collect()
    }
}

//=========================================================================================
// Calendar helpers
//=========================================================================================

fn set_once(slot: &mut Option<String>, value: String) -> DomainResult<()> {
    if slot.is_some() {
        return Err(DomainError::validation(
            "a recurrence rule string may hold only one RRULE",
        ));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> DomainResult<T> {
    value
        .parse()
        .map_err(|_| DomainError::validation(format!("invalid {key} value '{value}'")))
}

fn parse_list(key: &str, value: &str, min: u32, max: u32) -> DomainResult<Vec<u32>> {
    let mut out = value
        .split(',')
        .map(|v| parse_number::<u32>(key, v.trim()))
        .collect::<DomainResult<Vec<_>>>()?;
    if let Some(bad) = out.iter().find(|v| **v < min || **v > max) {
        return Err(DomainError::validation(format!(
            "{key} value {bad} is outside {min}..={max}"
        )));
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn parse_weekday(code: &str) -> DomainResult<Weekday> {
    match code {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(DomainError::validation(format!("unknown weekday '{other}'"))),
    }
}

/// Accepts `YYYYMMDDTHHMMSSZ`, the same without `Z` (read as UTC) and `YYYYMMDD`.
fn parse_datetime(value: &str) -> DomainResult<DateTime<Utc>> {
    let value = value.trim();
    let naive = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S") {
        return Ok(Utc.from_utc_datetime(&dt));
    }
    NaiveDate::parse_from_str(naive, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| DomainError::validation(format!("invalid date-time '{value}'")))
}

fn days_from(week_start: Weekday, day: Weekday) -> u32 {
    (7 + day.num_days_from_monday() - week_start.num_days_from_monday()) % 7
}

fn week_begin(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let back = days_from(week_start, date.weekday());
    date.checked_sub_days(Days::new(u64::from(back))).unwrap_or(date)
}

fn month_number(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn first_of_month(month_number: i64) -> Option<NaiveDate> {
    let year = i32::try_from(month_number.div_euclid(12)).ok()?;
    let month = u32::try_from(month_number.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

fn resolve_month_day(year: i32, month: u32, month_day: i32) -> Option<u32> {
    let len = i32::try_from(days_in_month(year, month)).ok()?;
    let day = if month_day > 0 { month_day } else { len + month_day + 1 };
    if (1..=len).contains(&day) {
        u32::try_from(day).ok()
    } else {
        None
    }
}

fn weekday_days_in_month(year: i32, month: u32, spec: WeekdaySpec) -> Vec<u32> {
    let matching: Vec<u32> = (1..=days_in_month(year, month))
        .filter(|d| {
            NaiveDate::from_ymd_opt(year, month, *d)
                .is_some_and(|date| date.weekday() == spec.weekday)
        })
        .collect();
    match spec.ordinal {
        None => matching,
        Some(n) if n > 0 => usize::try_from(n - 1)
            .ok()
            .and_then(|i| matching.get(i).copied())
            .into_iter()
            .collect(),
        Some(n) => usize::try_from(-n)
            .ok()
            .and_then(|back| matching.len().checked_sub(back))
            .and_then(|i| matching.get(i).copied())
            .into_iter()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn bound(text: &str, start: &str, end: &str) -> BoundRule {
        RecurrenceRule::parse(text).unwrap().bind(at(start), at(end))
    }

    fn collect(rule: &BoundRule, from: &str, limit: usize) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut cursor = at(from);
        while let Some(next) = rule.next_after(cursor) {
            out.push(next);
            cursor = next;
            if out.len() == limit {
                break;
            }
        }
        out
    }

    #[test]
    fn parses_prefixed_and_bare_rules() {
        let bare = RecurrenceRule::parse("FREQ=DAILY;BYHOUR=19,9").unwrap();
        assert_eq!(bare.by_hour, vec![9, 19]);
        assert_eq!(bare.frequency(), Frequency::Daily);

        let prefixed =
            RecurrenceRule::parse("DTSTART:20240102T080000Z\nRRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR")
                .unwrap();
        assert_eq!(prefixed.dtstart, Some(at("2024-01-02T08:00:00Z")));
        assert_eq!(prefixed.by_day.len(), 3);

        let dated = RecurrenceRule::parse("DTSTART;VALUE=DATE:20240102\nRRULE:FREQ=DAILY").unwrap();
        assert_eq!(dated.dtstart, Some(at("2024-01-02T00:00:00Z")));
    }

    #[test]
    fn rejects_malformed_rules() {
        for text in [
            "",
            "BYHOUR=9",
            "FREQ=HOURLY",
            "FREQ=DAILY;BYHOUR=24",
            "FREQ=DAILY;INTERVAL=0",
            "FREQ=DAILY;COUNT=2;UNTIL=20240105",
            "FREQ=WEEKLY;BYDAY=1MO",
            "FREQ=WEEKLY;BYMONTHDAY=3",
            "FREQ=DAILY;BYSETPOS=1",
            "FREQ=DAILY;BYHOUR=",
            "FREQ=DAILY\nFREQ=WEEKLY",
            "EXDATE:20240101",
            "DTSTART;TZID=Europe/Moscow:20240101T090000\nRRULE:FREQ=DAILY",
            "DTSTARTX:20240101\nRRULE:FREQ=DAILY",
        ] {
            assert!(RecurrenceRule::parse(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn daily_rule_walks_hours_in_order() {
        let rule = bound(
            "FREQ=DAILY;BYHOUR=9,19",
            "2024-01-01T00:00:00Z",
            "2024-01-03T23:59:59Z",
        );
        assert_eq!(
            collect(&rule, "2024-01-02T09:00:00Z", 10),
            vec![
                at("2024-01-02T19:00:00Z"),
                at("2024-01-03T09:00:00Z"),
                at("2024-01-03T19:00:00Z"),
            ]
        );
    }

    #[test]
    fn time_of_day_defaults_to_the_start() {
        let rule = bound("FREQ=DAILY", "2024-03-01T07:30:00Z", "2024-03-02T23:00:00Z");
        assert_eq!(
            collect(&rule, "2024-02-01T00:00:00Z", 10),
            vec![at("2024-03-01T07:30:00Z"), at("2024-03-02T07:30:00Z")]
        );
    }

    #[test]
    fn interval_skips_periods() {
        let rule = bound(
            "FREQ=DAILY;INTERVAL=3;BYHOUR=8",
            "2024-01-01T00:00:00Z",
            "2024-01-10T23:00:00Z",
        );
        // Jumping into the middle of the course lands on the same grid.
        assert_eq!(
            collect(&rule, "2024-01-05T00:00:00Z", 10),
            vec![at("2024-01-07T08:00:00Z"), at("2024-01-10T08:00:00Z")]
        );
    }

    #[test]
    fn weekly_rule_honours_weekday_list() {
        // 2024-01-01 is a Monday.
        let rule = bound(
            "FREQ=WEEKLY;BYDAY=FR,MO,WE;BYHOUR=15",
            "2024-01-01T00:00:00Z",
            "2024-01-14T00:00:00Z",
        );
        assert_eq!(
            collect(&rule, "2024-01-03T16:00:00Z", 10),
            vec![
                at("2024-01-05T15:00:00Z"),
                at("2024-01-08T15:00:00Z"),
                at("2024-01-10T15:00:00Z"),
                at("2024-01-12T15:00:00Z"),
            ]
        );
    }

    #[test]
    fn monthly_rule_supports_negative_month_days_and_ordinals() {
        let last_day = bound(
            "FREQ=MONTHLY;BYMONTHDAY=-1;BYHOUR=12",
            "2024-01-15T00:00:00Z",
            "2024-04-30T23:00:00Z",
        );
        assert_eq!(
            collect(&last_day, "2024-01-15T00:00:00Z", 10),
            vec![
                at("2024-01-31T12:00:00Z"),
                at("2024-02-29T12:00:00Z"),
                at("2024-03-31T12:00:00Z"),
                at("2024-04-30T12:00:00Z"),
            ]
        );

        let first_monday = bound(
            "FREQ=MONTHLY;BYDAY=1MO;BYHOUR=10",
            "2024-01-01T00:00:00Z",
            "2024-03-31T00:00:00Z",
        );
        assert_eq!(
            collect(&first_monday, "2024-01-01T00:00:00Z", 10),
            vec![
                at("2024-01-01T10:00:00Z"),
                at("2024-02-05T10:00:00Z"),
                at("2024-03-04T10:00:00Z"),
            ]
        );
    }

    #[test]
    fn monthly_rule_skips_months_without_the_start_day() {
        let rule = bound("FREQ=MONTHLY", "2024-01-31T09:00:00Z", "2024-05-31T23:00:00Z");
        assert_eq!(
            collect(&rule, "2024-01-01T00:00:00Z", 10),
            vec![
                at("2024-01-31T09:00:00Z"),
                at("2024-03-31T09:00:00Z"),
                at("2024-05-31T09:00:00Z"),
            ]
        );
    }

    #[test]
    fn count_is_relative_to_the_first_occurrence() {
        let rule = bound(
            "FREQ=DAILY;COUNT=3;BYHOUR=9",
            "2024-01-01T00:00:00Z",
            "2024-01-31T00:00:00Z",
        );
        assert_eq!(rule.next_after(at("2024-01-02T10:00:00Z")), Some(at("2024-01-03T09:00:00Z")));
        assert_eq!(rule.next_after(at("2024-01-03T09:00:00Z")), None);
    }

    #[test]
    fn binding_keeps_the_tighter_bounds() {
        let rule = bound(
            "DTSTART:20240105T090000Z\nRRULE:FREQ=DAILY;UNTIL=20240107T090000Z",
            "2024-01-01T00:00:00Z",
            "2024-01-31T00:00:00Z",
        );
        assert_eq!(
            collect(&rule, "2024-01-01T00:00:00Z", 10),
            vec![
                at("2024-01-05T09:00:00Z"),
                at("2024-01-06T09:00:00Z"),
                at("2024-01-07T09:00:00Z"),
            ]
        );

        let outside = bound(
            "FREQ=DAILY;UNTIL=20231231",
            "2024-01-01T00:00:00Z",
            "2024-01-31T00:00:00Z",
        );
        assert_eq!(outside.next_after(at("2023-12-01T00:00:00Z")), None);
    }

    #[test]
    fn earlier_dtstart_keeps_the_interval_grid_and_time_of_day() {
        // 2024-01-01 is a Monday; the course opens a week later.
        let rule = bound(
            "DTSTART:20240101T090000Z\nRRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO",
            "2024-01-08T00:00:00Z",
            "2024-02-05T00:00:00Z",
        );
        assert_eq!(
            collect(&rule, "2024-01-01T00:00:00Z", 10),
            vec![at("2024-01-15T09:00:00Z"), at("2024-01-29T09:00:00Z")]
        );
        assert_eq!(rule.next_after(at("2024-01-20T00:00:00Z")), Some(at("2024-01-29T09:00:00Z")));
    }

    #[test]
    fn count_includes_occurrences_before_the_course() {
        let rule = bound(
            "DTSTART:20240101T090000Z\nRRULE:FREQ=DAILY;COUNT=5",
            "2024-01-03T00:00:00Z",
            "2024-01-31T00:00:00Z",
        );
        assert_eq!(
            collect(&rule, "2024-01-01T00:00:00Z", 10),
            vec![
                at("2024-01-03T09:00:00Z"),
                at("2024-01-04T09:00:00Z"),
                at("2024-01-05T09:00:00Z"),
            ]
        );
    }
}
