use chrono::{Days, Local, NaiveDate};

pub const DATE_STAMP_FORMAT: &str = "%Y-%m-%d";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The `days` consecutive calendar dates ending at (and including) `today`,
/// oldest first. `None` when the window reaches past the calendar's range.
pub fn window_ending(today: NaiveDate, days: u32) -> Option<Vec<NaiveDate>> {
    (0..u64::from(days))
        .rev()
        .map(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

pub fn date_stamp(date: NaiveDate) -> String {
    date.format(DATE_STAMP_FORMAT).to_string()
}

/// Column heading, e.g. `3 Apr`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%-d %b").to_string()
}

/// Short weekday, e.g. `Wed`.
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}
