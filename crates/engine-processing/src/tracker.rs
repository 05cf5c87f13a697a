use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Running maximum of the `created_at` values written during one run.
///
/// Seeded with the window start, so the result never falls behind the
/// previous watermark even when no rows were written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxTimestamp {
    max: DateTime<Tz>,
}

impl MaxTimestamp {
    pub fn new(seed: DateTime<Tz>) -> Self {
        Self { max: seed }
    }

    /// Folds one more timestamp in, keeping the later of the two.
    #[must_use]
    pub fn observe(self, at: DateTime<Tz>) -> Self {
        if at > self.max {
            Self { max: at }
        } else {
            self
        }
    }

    pub fn current(&self) -> DateTime<Tz> {
        self.max
    }

    /// The value to persist as the next watermark.
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.max.with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    #[test]
    fn keeps_the_latest_timestamp() {
        let seed = Los_Angeles.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let later = Los_Angeles.with_ymd_and_hms(2020, 1, 1, 5, 0, 0).unwrap();
        let earlier = Los_Angeles.with_ymd_and_hms(2019, 12, 31, 0, 0, 0).unwrap();

        let tracker = [later, earlier]
            .into_iter()
            .fold(MaxTimestamp::new(seed), MaxTimestamp::observe);

        assert_eq!(tracker.current(), later);
        assert_eq!(
            tracker.to_utc(),
            Utc.with_ymd_and_hms(2020, 1, 1, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn never_drops_below_seed() {
        let seed = Los_Angeles.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let earlier = Los_Angeles.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(MaxTimestamp::new(seed).observe(earlier).current(), seed);
    }
}
