use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

/// Explicit bounds win only when both are given; otherwise the school
/// trimester containing `today` is used.
pub fn resolve_range(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> DateRange {
    match (start, end) {
        (Some(s), Some(e)) if !s.trim().is_empty() && !e.trim().is_empty() => DateRange {
            start_date: s.trim().to_string(),
            end_date: e.trim().to_string(),
        },
        _ => current_trimester(today),
    }
}

pub fn current_trimester(today: NaiveDate) -> DateRange {
    let year = today.year();
    let md = (today.month(), today.day());

    if md >= (6, 15) && md <= (11, 14) {
        range((year, 6, 1), (year, 11, 14))
    } else if md >= (11, 15) || md <= (3, 31) {
        // spans new year: Jan-Mar belongs to the trimester that began last September
        let start_year = if today.month() <= 3 { year - 1 } else { year };
        range((start_year, 9, 1), (start_year + 1, 3, 31))
    } else {
        range((year, 4, 1), (year, 6, 14))
    }
}

fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
    DateRange {
        start_date: format!("{:04}-{:02}-{:02}", start.0, start.1, start.2),
        end_date: format!("{:04}-{:02}-{:02}", end.0, end.1, end.2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn first_trimester() {
        let r = current_trimester(d(2024, 9, 3));
        assert_eq!(r.start_date, "2024-06-01");
        assert_eq!(r.end_date, "2024-11-14");
    }

    #[test]
    fn second_trimester_before_new_year() {
        let r = current_trimester(d(2024, 12, 1));
        assert_eq!(r.start_date, "2024-09-01");
        assert_eq!(r.end_date, "2025-03-31");
    }

    #[test]
    fn second_trimester_after_new_year() {
        let r = current_trimester(d(2025, 3, 31));
        assert_eq!(r.start_date, "2024-09-01");
        assert_eq!(r.end_date, "2025-03-31");
    }

    #[test]
    fn third_trimester_includes_early_june() {
        assert_eq!(current_trimester(d(2025, 4, 1)).start_date, "2025-04-01");
        let r = current_trimester(d(2025, 6, 10));
        assert_eq!(r.start_date, "2025-04-01");
        assert_eq!(r.end_date, "2025-06-14");
    }

    #[test]
    fn explicit_range_needs_both_bounds() {
        let today = d(2025, 1, 20);
        let r = resolve_range(Some("2024-01-01"), Some("2024-02-01"), today);
        assert_eq!(r.start_date, "2024-01-01");
        assert_eq!(r.end_date, "2024-02-01");

        let fallback = resolve_range(Some("2024-01-01"), None, today);
        assert_eq!(fallback, current_trimester(today));
    }
}
