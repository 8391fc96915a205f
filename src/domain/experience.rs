use chrono::NaiveDate;
use serde::Serialize;

/// Experience fields as read off the page, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExperience {
    pub company: String,
    pub title: String,
    pub dates: String,
    pub description: String,
}

impl RawExperience {
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty() && !self.dates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExperience {
    pub company: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Experience {
    pub id: i64,
    pub profile_username: String,
    pub company: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}
