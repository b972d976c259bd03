use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Calendar-year range all statistics are computed over.
/// Ends at `now` while the year is still running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub year: i32,
    pub start: DateTime<Utc>,
    /// Reported end, whole seconds
    pub end: DateTime<Utc>,
    /// First instant of the following year, never inside the window
    pub next_year_start: DateTime<Utc>,
    /// When the window was computed
    pub as_of: DateTime<Utc>,
}

impl AnalysisWindow {
    /// Returns `None` for years that haven't started yet
    pub fn for_year(year: i32, now: DateTime<Utc>) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?
            .and_hms_opt(0, 0, 0)?
            .and_utc();
        let next_year_start = NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            .and_hms_opt(0, 0, 0)?
            .and_utc();

        if now < start {
            return None;
        }

        Some(Self {
            year,
            start,
            end: now.min(next_year_start - Duration::seconds(1)),
            next_year_start,
            as_of: now,
        })
    }

    /// `start <= at < next_year_start`, and never later than `as_of`
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.next_year_start && at <= self.as_of
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Every calendar day in the window, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date();
        self.start_date().iter_days().take_while(move |d| *d <= end)
    }
}
