use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A calendar date without a time zone, stored as a `YYYYMMDD` integer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocalDate {
    year: u16,
    month: u8,
    day: u8,
}

impl LocalDate {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self> {
        if year == 0 || year > 9999 {
            return Err(Error::Validation(format!(
                "year {year} is not between 1 and 9999"
            )));
        }
        if month == 0 || month > 12 {
            return Err(Error::Validation(format!(
                "month {month} is not between 1 and 12"
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(Error::Validation(format!(
                "day {day} is not valid for {year:04}-{month:02}"
            )));
        }
        Ok(Self { year, month, day })
    }

    #[inline]
    pub fn year(&self) -> u16 {
        self.year
    }

    #[inline]
    pub fn month(&self) -> u8 {
        self.month
    }

    #[inline]
    pub fn day(&self) -> u8 {
        self.day
    }

    /// The `YYYYMMDD` storage encoding.
    pub fn to_iso_int(&self) -> i64 {
        self.year as i64 * 10_000 + self.month as i64 * 100 + self.day as i64
    }

    pub fn from_iso_int(value: i64) -> Result<Self> {
        let year = value / 10_000;
        let month = value / 100 % 100;
        let day = value % 100;
        if !(0..=9999).contains(&year) {
            return Err(Error::Validation(format!(
                "{value} is not a valid YYYYMMDD date"
            )));
        }
        Self::new(year as u16, month as u8, day as u8)
    }
}

impl std::fmt::Display for LocalDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        _ => 0,
    }
}
