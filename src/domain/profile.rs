use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use super::{education::Education, experience::Experience};

const PROFILE_PATH_SEGMENT: &str = "in";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub username: String,
    pub name: String,
    pub location: Option<String>,
    pub profile_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub username: String,
    pub name: String,
    pub location: Option<String>,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub profile: Profile,
    pub experiences: Vec<Experience>,
    pub educations: Vec<Education>,
}

/// Derive the stable profile identity from a profile URL.
///
/// `https://www.linkedin.com/in/Jane-Doe-42/?trk=x` → `jane-doe-42`.
/// Returns `None` for anything that is not a member profile link.
pub fn url_to_username(profile_url: &str) -> Option<String> {
    let url = Url::parse(profile_url.trim()).ok()?;
    let host = url.host_str()?;
    if !(host == "linkedin.com" || host.ends_with(".linkedin.com")) {
        return None;
    }

    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == PROFILE_PATH_SEGMENT)?;

    segments
        .next()
        .map(|username| username.trim().to_lowercase())
        .filter(|username| !username.is_empty())
}

pub fn canonical_profile_url(profile_base: &str, username: &str) -> String {
    format!("{}/{}/", profile_base.trim_end_matches('/'), username)
}
