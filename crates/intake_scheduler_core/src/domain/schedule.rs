//! crates/intake_scheduler_core/src/domain/schedule.rs
//!
//! The "when" half of a plan: a course window and the recurrence rules bound to it.

use chrono::{DateTime, Duration, Utc};

use super::error::{DomainError, DomainResult};
use super::rule::{BoundRule, RecurrenceRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    course_start: DateTime<Utc>,
    course_end: DateTime<Utc>,
    rules: Vec<BoundRule>,
}

impl Schedule {
    /// Builds a schedule, cutting every rule to `[course_start, course_end]`.
    ///
    /// Identical rules are kept once; their order is otherwise preserved.
    pub fn new(
        course_start: DateTime<Utc>,
        course_end: DateTime<Utc>,
        rules: Vec<RecurrenceRule>,
    ) -> DomainResult<Self> {
        if course_end < course_start {
            return Err(DomainError::validation(
                "course end must not be before course start",
            ));
        }
        if rules.is_empty() {
            return Err(DomainError::validation(
                "a schedule needs at least one recurrence rule",
            ));
        }

        let mut unique: Vec<RecurrenceRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !unique.iter().any(|r| r.as_str() == rule.as_str()) {
                unique.push(rule);
            }
        }

        Ok(Self {
            course_start,
            course_end,
            rules: unique
                .into_iter()
                .map(|r| r.bind(course_start, course_end))
                .collect(),
        })
    }

    /// Parses rule texts and builds the schedule in one step.
    pub fn parse<S: AsRef<str>>(
        course_start: DateTime<Utc>,
        course_end: DateTime<Utc>,
        rule_texts: &[S],
    ) -> DomainResult<Self> {
        let rules = rule_texts
            .iter()
            .map(|t| RecurrenceRule::parse(t.as_ref()))
            .collect::<DomainResult<Vec<_>>>()?;
        Self::new(course_start, course_end, rules)
    }

    pub fn course_start(&self) -> DateTime<Utc> {
        self.course_start
    }

    pub fn course_end(&self) -> DateTime<Utc> {
        self.course_end
    }

    /// The rule texts in their original form, for persistence and display.
    pub fn rule_texts(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.rule().to_string()).collect()
    }

    /// Earliest occurrence across all rules strictly after `from` that lies in
    /// the course window. Coinciding rules yield the instant once.
    pub fn next(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.rules
            .iter()
            .filter_map(|rule| rule.next_after(from))
            .filter(|at| *at >= self.course_start && *at <= self.course_end)
            .min()
    }

    /// Whether `at` is one of the schedule's occurrences.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.next(at - Duration::nanoseconds(1)) == Some(at)
    }

    /// All occurrences in `(from, to]`, ascending and without duplicates.
    /// An inverted or empty window yields nothing.
    pub fn occurrences(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        if from >= to {
            return out;
        }
        let mut cursor = from;
        while let Some(next) = self.next(cursor) {
            if next > to {
                break;
            }
            out.push(next);
            cursor = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn ten_day_course(rules: &[&str]) -> Schedule {
        Schedule::parse(at("2024-01-01T00:00:00Z"), at("2024-01-10T23:59:59Z"), rules).unwrap()
    }

    #[test]
    fn rejects_inverted_course_and_empty_rule_set() {
        let start = at("2024-01-10T00:00:00Z");
        let end = at("2024-01-01T00:00:00Z");
        assert!(matches!(
            Schedule::parse(start, end, &["FREQ=DAILY"]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Schedule::parse::<&str>(end, start, &[]),
            Err(DomainError::Validation(_))
        ));
        assert!(Schedule::parse(end, start, &["FREQ=SOMETIMES"]).is_err());
    }

    #[test]
    fn daily_rule_next_and_tail_of_course() {
        let schedule = ten_day_course(&["FREQ=DAILY;BYHOUR=9,19"]);
        assert_eq!(
            schedule.next(at("2024-01-05T10:00:00Z")),
            Some(at("2024-01-05T19:00:00Z"))
        );
        assert_eq!(
            schedule.occurrences(at("2024-01-09T20:00:00Z"), at("2024-01-11T00:00:00Z")),
            vec![at("2024-01-10T09:00:00Z"), at("2024-01-10T19:00:00Z")]
        );
    }

    #[test]
    fn merged_rules_pick_the_soonest() {
        let schedule = ten_day_course(&[
            "FREQ=DAILY;BYHOUR=9,19",
            "FREQ=WEEKLY;BYDAY=MO,WE,FR;BYHOUR=15",
        ]);
        // 2024-01-03 is a Wednesday.
        assert_eq!(
            schedule.next(at("2024-01-03T10:00:00Z")),
            Some(at("2024-01-03T15:00:00Z"))
        );
        assert_eq!(
            schedule.occurrences(at("2024-01-03T08:00:00Z"), at("2024-01-04T10:00:00Z")),
            vec![
                at("2024-01-03T09:00:00Z"),
                at("2024-01-03T15:00:00Z"),
                at("2024-01-03T19:00:00Z"),
                at("2024-01-04T09:00:00Z"),
            ]
        );
    }

    #[test]
    fn coinciding_rules_yield_one_instant() {
        let schedule = ten_day_course(&["FREQ=DAILY;BYHOUR=9", "FREQ=WEEKLY;BYDAY=TU;BYHOUR=9"]);
        let occurrences =
            schedule.occurrences(at("2024-01-01T10:00:00Z"), at("2024-01-03T00:00:00Z"));
        assert_eq!(occurrences, vec![at("2024-01-02T09:00:00Z")]);
    }

    #[test]
    fn occurrences_are_deterministic_and_strictly_ascending() {
        let schedule = ten_day_course(&[
            "FREQ=DAILY;BYHOUR=8,20",
            "FREQ=DAILY;BYHOUR=8,14",
            "FREQ=WEEKLY;BYDAY=SA,SU;BYHOUR=11;BYMINUTE=0,30",
        ]);
        let from = at("2023-12-31T00:00:00Z");
        let to = at("2024-01-12T00:00:00Z");
        let first = schedule.occurrences(from, to);
        assert_eq!(first, schedule.occurrences(from, to));
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        // 10 days x {8,14,20} + 2 weekend days x 2 slots.
        assert_eq!(first.len(), 34);
    }

    #[test]
    fn course_end_is_inclusive() {
        let end = at("2024-01-10T19:00:00Z");
        let schedule =
            Schedule::parse(at("2024-01-01T00:00:00Z"), end, &["FREQ=DAILY;BYHOUR=9,19"]).unwrap();
        let tail = schedule.occurrences(at("2024-01-10T10:00:00Z"), end + Duration::days(1));
        assert_eq!(tail, vec![end]);

        let shorter = Schedule::parse(
            at("2024-01-01T00:00:00Z"),
            end - Duration::microseconds(1),
            &["FREQ=DAILY;BYHOUR=9,19"],
        )
        .unwrap();
        assert!(shorter
            .occurrences(at("2024-01-10T10:00:00Z"), end + Duration::days(1))
            .is_empty());
    }

    #[test]
    fn degenerate_windows_are_empty() {
        let schedule = ten_day_course(&["FREQ=DAILY;BYHOUR=9,19"]);
        let t = at("2024-01-05T09:00:00Z");
        assert!(schedule.occurrences(t, t).is_empty());
        assert!(schedule.occurrences(t, at("2024-01-04T00:00:00Z")).is_empty());
        let end = schedule.course_end();
        assert!(schedule.occurrences(end, end + Duration::days(3)).is_empty());
        assert_eq!(schedule.next(end), None);
    }

    #[test]
    fn contains_only_generated_instants() {
        let schedule = ten_day_course(&["FREQ=DAILY;BYHOUR=9,19"]);
        assert!(schedule.contains(at("2024-01-05T19:00:00Z")));
        assert!(!schedule.contains(at("2024-01-05T20:00:00Z")));
        assert!(!schedule.contains(at("2024-01-11T09:00:00Z")));
    }

    #[test]
    fn keeps_rule_texts_and_drops_duplicates() {
        let schedule = ten_day_course(&["FREQ=DAILY;BYHOUR=9", "FREQ=DAILY;BYHOUR=9"]);
        assert_eq!(schedule.rule_texts(), vec!["FREQ=DAILY;BYHOUR=9".to_string()]);
    }
}
