use derive_more::{Display, Error};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, Month, OffsetDateTime};

/// Calendar month, held as the first day of that month.
///
/// The only stable external form is `MM-YYYY`. An empty string decodes to
/// [`YearMonth::UNSET`], which is distinct from every real month and sorts
/// before all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(Option<Date>);

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("invalid month \"{input}\", expected MM-YYYY")]
pub struct ParseYearMonthError {
    #[error(ignore)]
    input: String,
}

impl YearMonth {
    pub const UNSET: Self = Self(None);

    pub fn new(year: i32, month: Month) -> Result<Self, time::error::ComponentRange> {
        Date::from_calendar_date(year, month, 1).map(|d| Self(Some(d)))
    }

    /// Truncates `date` to the first day of its month.
    pub fn from_date(date: Date) -> Self {
        Self(Some(date - Duration::days(i64::from(date.day()) - 1)))
    }

    pub fn from_datetime(dt: OffsetDateTime) -> Self {
        Self::from_date(dt.date())
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    pub fn first_day(&self) -> Option<Date> {
        self.0
    }

    /// First instant of the month, UTC.
    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        self.0.map(|d| d.midnight().assume_utc())
    }
}

impl From<Date> for YearMonth {
    fn from(date: Date) -> Self {
        Self::from_date(date)
    }
}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::UNSET);
        }
        let err = || ParseYearMonthError {
            input: s.to_string(),
        };
        let (month, year) = s.split_once('-').ok_or_else(err)?;
        if month.len() != 2
            || year.len() != 4
            || !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let month = month
            .parse::<u8>()
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{:02}-{:04}", u8::from(d.month()), d.year()),
            None => Ok(()),
        }
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
