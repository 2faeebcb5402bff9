use std::fmt;

use chrono::{Datelike, NaiveDate};

/// The window a sales report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Month { year: i32, month: u32 },
    Year(i32),
    AllTime,
}

impl ReportPeriod {
    /// Accepts `YYYY-MM`, `YYYY` or `all`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ReportPeriod::AllTime);
        }

        match s.split_once('-') {
            Some((year, month)) => {
                let year: i32 = year
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid year in period: {s}"))?;
                let month: u32 = month
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid month in period: {s}"))?;
                if !(1..=12).contains(&month) {
                    return Err(anyhow::anyhow!("month out of range: {s}"));
                }
                Ok(ReportPeriod::Month { year, month })
            }
            None => {
                let year: i32 = s
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid period: {s}"))?;
                Ok(ReportPeriod::Year(year))
            }
        }
    }

    pub fn current_month(today: NaiveDate) -> Self {
        ReportPeriod::Month {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            ReportPeriod::Month { year, month } => date.year() == year && date.month() == month,
            ReportPeriod::Year(year) => date.year() == year,
            ReportPeriod::AllTime => true,
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportPeriod::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            ReportPeriod::Year(year) => write!(f, "{year:04}"),
            ReportPeriod::AllTime => write!(f, "all"),
        }
    }
}
