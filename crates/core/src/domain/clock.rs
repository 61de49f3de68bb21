//! Japan Standard Time helpers. Every date the skills compare against is JST.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

pub const JST_OFFSET_SECS: i32 = 9 * 3600;

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn now_jst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst())
}

pub fn yesterday(now: &DateTime<FixedOffset>) -> NaiveDate {
    (*now - Duration::days(1)).date_naive()
}

/// `2024-03-05`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `2024年3月5日`, without zero padding.
pub fn japanese_date(date: NaiveDate) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

/// Two-digit year and month, e.g. `2403`.
pub fn year_month_code(date: NaiveDate) -> String {
    date.format("%y%m").to_string()
}

/// 11:59:59 on the given day; the noon digest reports everything published after it.
pub fn noon_cutoff(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(11, 59, 59)
}
