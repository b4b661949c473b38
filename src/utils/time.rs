use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

/// Most recent Sunday on or before `today`. Canonical key for a week's
/// usage counter; a pure function of the date so independent processes
/// compute the same key.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_sunday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        assert_eq!(week_start(date(2025, 3, 2)), date(2025, 3, 2));
    }

    #[test]
    fn saturday_belongs_to_the_previous_sunday() {
        assert_eq!(week_start(date(2025, 3, 1)), date(2025, 2, 23));
    }

    #[test]
    fn saturday_and_following_sunday_land_in_different_weeks() {
        let saturday = week_start(date(2025, 3, 1));
        let sunday = week_start(date(2025, 3, 2));
        assert_ne!(saturday, sunday);
    }

    #[test]
    fn midweek_days_share_one_key() {
        for day in 2..=8 {
            assert_eq!(week_start(date(2025, 3, day)), date(2025, 3, 2));
        }
        assert_eq!(week_start(date(2025, 3, 9)), date(2025, 3, 9));
    }
}
