use chrono::{Datelike, Months, NaiveDate, Utc};

pub const MIN_AGE: i32 = 18;
pub const MAX_PREFERRED_AGE: i32 = 100;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole years elapsed between `birth_date` and `on`.
pub fn age_on(birth_date: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth_date.year();
    if (on.month(), on.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn calculate_age(birth_date: NaiveDate) -> i32 {
    age_on(birth_date, today())
}

/// `on` shifted back by `years`. Feb 29 clamps to Feb 28 in non-leap years.
pub fn years_before(on: NaiveDate, years: i32) -> NaiveDate {
    let months = u32::try_from(years.max(0)).unwrap_or(0) * 12;
    on.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
}

/// Latest birth date of someone at least `min_age` years old on `on`.
pub fn latest_birth_date_for_min_age(on: NaiveDate, min_age: i32) -> NaiveDate {
    years_before(on, min_age)
}

/// Birth dates strictly after this bound are at most `max_age` years old on `on`.
pub fn birth_date_exclusive_bound_for_max_age(on: NaiveDate, max_age: i32) -> NaiveDate {
    years_before(on, max_age + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn birthday_today_counts_the_full_year() {
        assert_eq!(age_on(date(2000, 6, 15), date(2018, 6, 15)), 18);
        assert_eq!(age_on(date(2000, 6, 15), date(2018, 6, 14)), 17);
    }

    #[test]
    fn leap_day_birthdays_age_on_march_first() {
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 2, 28)), 17);
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 3, 1)), 18);
    }

    #[test]
    fn min_age_bound_admits_exact_birthday() {
        let on = date(2026, 10, 18);
        let bound = latest_birth_date_for_min_age(on, 25);
        assert_eq!(bound, date(2001, 10, 18));
        assert_eq!(age_on(bound, on), 25);
        assert_eq!(age_on(bound.succ_opt().unwrap(), on), 24);
    }

    #[test]
    fn max_age_bound_excludes_one_year_older() {
        let on = date(2026, 10, 18);
        let bound = birth_date_exclusive_bound_for_max_age(on, 30);
        assert_eq!(age_on(bound, on), 31);
        assert_eq!(age_on(bound.succ_opt().unwrap(), on), 30);
    }

    #[test]
    fn years_before_clamps_leap_day() {
        assert_eq!(years_before(date(2024, 2, 29), 1), date(2023, 2, 28));
    }
}
