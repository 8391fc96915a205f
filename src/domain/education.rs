use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static GPA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-4]\.\d{1,2}\b").expect("gpa regex compiles"));

/// Education fields as read off the page. Empty strings mean the field was
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEducation {
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub grade: String,
    pub date_range: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEducation {
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub description: String,
    pub gpa: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Education {
    pub id: i64,
    pub profile_username: String,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub description: String,
    pub gpa: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

/// Lowest GPA-looking number (0.00–4.99) in a free-text grade, if any.
///
/// `"GPA: 3.85/4.00"` → `3.85`. When several numbers appear the most
/// conservative one is reported.
pub fn extract_gpa(grade: &str) -> Option<f64> {
    GPA_RE
        .find_iter(grade)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .reduce(f64::min)
}
