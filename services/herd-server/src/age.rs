//! Animal age from intake date and intake age.

use chrono::{DateTime, Datelike, Utc};

/// Whole months from `from` to `to`, counting a month only once its day of
/// month has been reached. Negative when `to` is before `from`.
pub fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i32 {
    let mut months = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    months
}

/// Current age in months: intake age plus months since intake, never negative.
pub fn age_in_months(received_at: DateTime<Utc>, received_age: i32, now: DateTime<Utc>) -> i32 {
    (received_age + months_between(received_at, now)).max(0)
}

/// Renders an age as "2 years 3 months", "1 year", "0 months".
pub fn format_age(total_months: i32) -> String {
    let total_months = total_months.max(0);
    let years = total_months / 12;
    let months = total_months % 12;

    let plural = |n: i32, unit: &str| {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };

    match (years, months) {
        (0, m) => plural(m, "month"),
        (y, 0) => plural(y, "year"),
        (y, m) => format!("{} {}", plural(y, "year"), plural(m, "month")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn months_between_counts_full_months() {
        assert_eq!(months_between(at(2024, 1, 15), at(2024, 3, 15)), 2);
        assert_eq!(months_between(at(2024, 1, 15), at(2024, 3, 14)), 1);
        assert_eq!(months_between(at(2023, 11, 1), at(2024, 2, 1)), 3);
        assert_eq!(months_between(at(2024, 5, 1), at(2024, 5, 31)), 0);
    }

    #[test]
    fn age_adds_intake_age() {
        assert_eq!(age_in_months(at(2024, 1, 10), 6, at(2025, 1, 10)), 18);
    }

    #[test]
    fn age_never_negative() {
        // Intake date in the future.
        assert_eq!(age_in_months(at(2030, 1, 1), 0, at(2025, 1, 1)), 0);
    }

    #[rstest]
    #[case(0, "0 months")]
    #[case(1, "1 month")]
    #[case(11, "11 months")]
    #[case(12, "1 year")]
    #[case(13, "1 year 1 month")]
    #[case(26, "2 years 2 months")]
    #[case(36, "3 years")]
    #[case(-4, "0 months")]
    fn format_age_cases(#[case] months: i32, #[case] expected: &str) {
        assert_eq!(format_age(months), expected);
    }
}
