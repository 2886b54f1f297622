//! Date helper functions

use chrono::{DateTime, Datelike, TimeZone};

const MONTHS_PT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];
const MONTHS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Abbreviated month name for a language tag (`pt-BR`, `en-US`, ...)
pub fn month_abbr(lang: &str, month: u32) -> &'static str {
    let table = if lang.to_lowercase().starts_with("pt") {
        &MONTHS_PT
    } else {
        &MONTHS_EN
    };
    table[(month.clamp(1, 12) - 1) as usize]
}

/// Format a date with a strftime string, localizing `%b`
///
/// # Examples
/// ```ignore
/// format_date(&date, "%d %b %Y", "pt-BR") // -> "15 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, lang: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let format = format.replace("%b", month_abbr(lang, date.month()));
    date.format(&format).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
