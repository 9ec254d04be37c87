//! Sets of weekdays on which a timetable runs.

use std::fmt;

use chrono::Weekday;
use serde::Deserialize;

/// Error returned for a weekday index outside 0-6.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid weekday index {0}: expected 0 (Monday) to 6 (Sunday)")]
pub struct InvalidWeekday(pub u8);

/// A set of weekdays, indexed 0 (Monday) to 6 (Sunday).
///
/// # Examples
///
/// ```
/// use chrono::Weekday;
/// use schedule_matcher::domain::ValidDays;
///
/// let weekdays = ValidDays::from_indices([0, 1, 2, 3, 4]).unwrap();
/// assert!(weekdays.contains(Weekday::Fri));
/// assert!(!weekdays.contains(Weekday::Sat));
/// assert!(ValidDays::from_indices([7]).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "Vec<u8>")]
pub struct ValidDays(u8);

impl ValidDays {
    /// Every day of the week.
    pub const ALL: ValidDays = ValidDays(0b0111_1111);

    /// Build a set from weekday indices. Duplicates are harmless.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self, InvalidWeekday> {
        let mut bits = 0u8;
        for index in indices {
            if index > 6 {
                return Err(InvalidWeekday(index));
            }
            bits |= 1 << index;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The contained weekdays, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0u8..7)
            .filter(|i| self.0 & (1 << i) != 0)
            .filter_map(|i| Weekday::try_from(i).ok())
    }
}

impl TryFrom<Vec<u8>> for ValidDays {
    type Error = InvalidWeekday;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_indices(indices)
    }
}

impl fmt::Debug for ValidDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_is_index_zero() {
        let days = ValidDays::from_indices([0]).unwrap();
        assert!(days.contains(Weekday::Mon));
        assert!(!days.contains(Weekday::Sun));
    }

    #[test]
    fn all_contains_every_day() {
        for i in 0u8..7 {
            let day = Weekday::try_from(i).unwrap();
            assert!(ValidDays::ALL.contains(day));
        }
    }

    #[test]
    fn empty_set() {
        let days = ValidDays::from_indices([]).unwrap();
        assert!(days.is_empty());
        assert_eq!(days.iter().count(), 0);
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(ValidDays::from_indices([5, 9]), Err(InvalidWeekday(9)));
    }

    #[test]
    fn deserializes_from_index_list() {
        let days: ValidDays = serde_json::from_str("[5, 6]").unwrap();
        assert!(days.contains(Weekday::Sat));
        assert!(days.contains(Weekday::Sun));
        assert!(!days.contains(Weekday::Mon));
        assert!(serde_json::from_str::<ValidDays>("[7]").is_err());
    }

    #[test]
    fn debug_lists_days() {
        let days = ValidDays::from_indices([5, 6]).unwrap();
        assert_eq!(format!("{:?}", days), "{Sat, Sun}");
    }
}
