//! Series frequencies: how far apart consecutive time stamps are.
//!
//! Aliases follow the familiar offset names (`D`, `H`, `MS`, `2W`, ...). A bare
//! integer (`"1"`, `"7"`) is a step for integer time indices.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::value::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreqUnit {
    /// Integer time index.
    Step,
    Second,
    Minute,
    Hour,
    Day,
    BusinessDay,
    Week,
    MonthStart,
    MonthEnd,
    QuarterStart,
    QuarterEnd,
    YearStart,
    YearEnd,
}

impl FreqUnit {
    fn alias(&self) -> &'static str {
        match self {
            FreqUnit::Step => "",
            FreqUnit::Second => "S",
            FreqUnit::Minute => "min",
            FreqUnit::Hour => "H",
            FreqUnit::Day => "D",
            FreqUnit::BusinessDay => "B",
            FreqUnit::Week => "W",
            FreqUnit::MonthStart => "MS",
            FreqUnit::MonthEnd => "M",
            FreqUnit::QuarterStart => "QS",
            FreqUnit::QuarterEnd => "Q",
            FreqUnit::YearStart => "YS",
            FreqUnit::YearEnd => "Y",
        }
    }

    fn months(&self) -> Option<u32> {
        match self {
            FreqUnit::MonthStart | FreqUnit::MonthEnd => Some(1),
            FreqUnit::QuarterStart | FreqUnit::QuarterEnd => Some(3),
            FreqUnit::YearStart | FreqUnit::YearEnd => Some(12),
            _ => None,
        }
    }
}

/// A multiple of a frequency unit, e.g. `2D`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Freq {
    multiple: u32,
    unit: FreqUnit,
}

impl Freq {
    pub fn new(multiple: u32, unit: FreqUnit) -> CoreResult<Self> {
        if multiple == 0 {
            return Err(CoreError::invalid_frequency("multiple must be positive"));
        }
        Ok(Self { multiple, unit })
    }

    pub fn daily() -> Self {
        Self {
            multiple: 1,
            unit: FreqUnit::Day,
        }
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    pub fn unit(&self) -> FreqUnit {
        self.unit
    }

    /// Move `value` forward by `steps` periods.
    pub fn advance(&self, value: &Value, steps: u32) -> CoreResult<Value> {
        let total = i64::from(self.multiple) * i64::from(steps);
        match (self.unit, value) {
            (FreqUnit::Step, Value::Int(v)) => Ok(Value::Int(v + total)),
            (FreqUnit::Step, other) => Err(CoreError::invalid_frequency(format!(
                "integer frequency needs an integer time index, got `{other}`"
            ))),
            (_, Value::Timestamp(ts)) => self.advance_timestamp(*ts, total).map(Value::Timestamp),
            (_, other) => Err(CoreError::invalid_frequency(format!(
                "frequency `{self}` needs a timestamp time index, got `{other}`"
            ))),
        }
    }

    fn advance_timestamp(&self, ts: NaiveDateTime, total: i64) -> CoreResult<NaiveDateTime> {
        let overflow = || CoreError::invalid_frequency(format!("advancing `{ts}` by {total} x `{self}` overflows"));
        let shifted = match self.unit {
            FreqUnit::Second => Duration::try_seconds(total).and_then(|d| ts.checked_add_signed(d)),
            FreqUnit::Minute => Duration::try_minutes(total).and_then(|d| ts.checked_add_signed(d)),
            FreqUnit::Hour => Duration::try_hours(total).and_then(|d| ts.checked_add_signed(d)),
            FreqUnit::Day => Duration::try_days(total).and_then(|d| ts.checked_add_signed(d)),
            FreqUnit::Week => Duration::try_weeks(total).and_then(|d| ts.checked_add_signed(d)),
            FreqUnit::BusinessDay => {
                let mut out = ts;
                for _ in 0..total {
                    out = next_business_day(out).ok_or_else(overflow)?;
                }
                Some(out)
            }
            FreqUnit::MonthStart | FreqUnit::QuarterStart | FreqUnit::YearStart => {
                let months = self.total_months(total).ok_or_else(overflow)?;
                month_start(ts.date())
                    .checked_add_months(Months::new(months))
                    .map(|d| d.and_time(ts.time()))
            }
            FreqUnit::MonthEnd | FreqUnit::QuarterEnd | FreqUnit::YearEnd => {
                let months = self.total_months(total).ok_or_else(overflow)?;
                month_start(ts.date())
                    .checked_add_months(Months::new(months + 1))
                    .and_then(|d| d.pred_opt())
                    .map(|d| d.and_time(ts.time()))
            }
            FreqUnit::Step => None,
        };
        shifted.ok_or_else(overflow)
    }

    fn total_months(&self, total: i64) -> Option<u32> {
        let per = i64::from(self.unit.months()?);
        u32::try_from(total.checked_mul(per)?).ok()
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_business_day(ts: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut next = ts.checked_add_signed(Duration::try_days(1)?)?;
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next = next.checked_add_signed(Duration::try_days(1)?)?;
    }
    Some(next)
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.unit, self.multiple) {
            (FreqUnit::Step, n) => write!(f, "{n}"),
            (unit, 1) => f.write_str(unit.alias()),
            (unit, n) => write!(f, "{n}{}", unit.alias()),
        }
    }
}

impl FromStr for Freq {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, alias) = s.split_at(split);
        let multiple = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|e| CoreError::invalid_frequency(format!("`{s}`: {e}")))?
        };
        let unit = match alias {
            "" if !digits.is_empty() => FreqUnit::Step,
            "S" | "s" => FreqUnit::Second,
            "T" | "min" => FreqUnit::Minute,
            "H" | "h" => FreqUnit::Hour,
            "D" => FreqUnit::Day,
            "B" => FreqUnit::BusinessDay,
            "W" => FreqUnit::Week,
            "MS" => FreqUnit::MonthStart,
            "M" | "ME" => FreqUnit::MonthEnd,
            "QS" => FreqUnit::QuarterStart,
            "Q" | "QE" => FreqUnit::QuarterEnd,
            "YS" | "AS" => FreqUnit::YearStart,
            "Y" | "A" | "YE" => FreqUnit::YearEnd,
            _ => return Err(CoreError::invalid_frequency(format!("unknown alias `{s}`"))),
        };
        Freq::new(multiple, unit)
    }
}

impl TryFrom<String> for Freq {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Freq> for String {
    fn from(freq: Freq) -> Self {
        freq.to_string()
    }
}
