use chrono::{Datelike, NaiveDate};
use thiserror::Error;

const PRESENT: &str = "present";
const DASHES: [char; 3] = ['–', '—', '-'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("date range is empty")]
    Empty,
    #[error("unknown month '{0}'")]
    UnknownMonth(String),
    #[error("invalid year '{0}'")]
    InvalidYear(String),
    #[error("unexpected token '{token}' in date range '{range}'")]
    UnexpectedToken { token: String, range: String },
    #[error("date range '{0}' needs a start and an end year")]
    MissingYear(String),
}

#[derive(Clone, Copy)]
enum Boundary {
    Start,
    End,
}

/// Parse an employment range such as `Jun 2018 – Present`, `2014 – 2016` or
/// `Jan 2015 – Mar 2017 · 2 yrs 3 mos`.
///
/// A bare year stands for January when it opens the range and December when
/// it closes it. A range with no end closes in December of its start year.
pub fn parse_experience_dates(value: &str) -> Result<DateSpan, DateRangeError> {
    let range = value.split('·').next().unwrap_or_default().trim();
    let normalized = range.replace(DASHES, " ");
    let mut tokens = normalized.split_whitespace();

    let first = tokens.next().ok_or(DateRangeError::Empty)?;
    let start = parse_point(first, &mut tokens, Boundary::Start)?;

    let span = match tokens.next() {
        None => DateSpan {
            start,
            end: Some(month_start(start.year(), 12)?),
            is_current: false,
        },
        Some(token) if token.eq_ignore_ascii_case(PRESENT) => DateSpan {
            start,
            end: None,
            is_current: true,
        },
        Some(token) => DateSpan {
            start,
            end: Some(parse_point(token, &mut tokens, Boundary::End)?),
            is_current: false,
        },
    };

    match tokens.next() {
        Some(token) => Err(DateRangeError::UnexpectedToken {
            token: token.to_string(),
            range: range.to_string(),
        }),
        None => Ok(span),
    }
}

/// Parse a school attendance range (`2014 – 2018`) using the academic-year
/// convention: September 1 of the first year to May 1 of the second.
pub fn parse_academic_years(value: &str) -> Result<(NaiveDate, NaiveDate), DateRangeError> {
    let normalized = value.replace(DASHES, " ");
    if normalized.trim().is_empty() {
        return Err(DateRangeError::Empty);
    }

    let years: Vec<i32> = normalized
        .split_whitespace()
        .filter(|token| is_year(token))
        .filter_map(|token| token.parse().ok())
        .collect();

    match years.as_slice() {
        [start, end, ..] => Ok((month_start(*start, 9)?, month_start(*end, 5)?)),
        _ => Err(DateRangeError::MissingYear(value.trim().to_string())),
    }
}

fn parse_point<'a>(
    token: &'a str,
    rest: &mut impl Iterator<Item = &'a str>,
    boundary: Boundary,
) -> Result<NaiveDate, DateRangeError> {
    if is_year(token) {
        let year = parse_year(token)?;
        return match boundary {
            Boundary::Start => month_start(year, 1),
            Boundary::End => month_start(year, 12),
        };
    }

    let year = rest
        .next()
        .ok_or_else(|| DateRangeError::MissingYear(token.to_string()))?;
    if !is_year(year) {
        return Err(DateRangeError::InvalidYear(year.to_string()));
    }

    NaiveDate::parse_from_str(&format!("{} 01 {}", token, year), "%B %d %Y")
        .map_err(|_| DateRangeError::UnknownMonth(token.to_string()))
}

fn is_year(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}

fn parse_year(token: &str) -> Result<i32, DateRangeError> {
    token
        .parse()
        .map_err(|_| DateRangeError::InvalidYear(token.to_string()))
}

fn month_start(year: i32, month: u32) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DateRangeError::InvalidYear(year.to_string()))
}
