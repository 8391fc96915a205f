#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use scout::{
    configuration::{Credentials, Pacing, SiteUrls, WaitSettings},
    dal::profile_db::ProfileStore,
    domain::{
        education::{Education, NewEducation},
        experience::{Experience, NewExperience},
        locator::LocatorTable,
        profile::{NewProfile, Profile, ProfileDetail},
    },
    services::{
        search_provider::{SearchError, SearchProvider, SearchResult},
        session::{RetryBudget, Session},
        snapshot::HtmlSnapshot,
    },
};

pub const LOGIN_URL: &str = "https://www.linkedin.com/login";
pub const PEOPLE_SEARCH_URL: &str =
    "https://www.linkedin.com/search/results/people/?keywords={query}&page={page}";
pub const PROFILE_BASE: &str = "https://www.linkedin.com/in/";

pub const LOGIN_PAGE: &str = r#"
<html><body><form>
  <input id="username" name="session_key">
  <input id="password" name="session_password" type="password">
</form></body></html>
"#;

pub const AUTH_WALL_PAGE: &str = r#"
<html><body><h1>Join to view full profiles for free</h1></body></html>
"#;

/// One single-role block, one block with two roles at the same company and
/// two educations.
pub const FULL_PROFILE_PAGE: &str = r#"
<html><body>
  <section class="pv-top-card">
    <ul><li class="inline t-24 t-black t-normal break-words">Jane Doe</li></ul>
    <ul><li class="t-16 t-black t-normal inline-block">San Francisco Bay Area</li></ul>
  </section>
  <section id="experience-section">
    <ul>
      <li class="pv-profile-section__card-item-v2 pv-profile-section pv-position-entity ember-view">
        <h3 class="t-16 t-black t-bold">Software Engineer</h3>
        <p class="pv-entity__secondary-title t-14 t-black t-normal">Initech</p>
        <h4 class="pv-entity__date-range t-14 t-black--light t-normal">
          <span class="visually-hidden">Dates Employed</span>
          <span>Jun 2018 – Present</span>
        </h4>
        <p class="pv-entity__description t-14 t-black t-normal">Builds report tooling.</p>
      </li>
      <li class="pv-profile-section__card-item-v2 pv-profile-section pv-position-entity ember-view">
        <h3 class="t-16 t-black t-bold">
          <span class="visually-hidden">Company Name</span>
          <span>Acme</span>
        </h3>
        <ul>
          <li class="pv-entity__position-group-role-item">
            <h3 class="t-14 t-black t-bold">
              <span class="visually-hidden">Title</span>
              <span>Senior Engineer</span>
            </h3>
            <h4 class="pv-entity__date-range t-14 t-black--light t-normal">
              <span class="visually-hidden">Dates Employed</span>
              <span>Jan 2016 – May 2018</span>
            </h4>
          </li>
          <li class="pv-entity__position-group-role-item">
            <h3 class="t-14 t-black t-bold">
              <span class="visually-hidden">Title</span>
              <span>Engineer</span>
            </h3>
            <h4 class="pv-entity__date-range t-14 t-black--light t-normal">
              <span class="visually-hidden">Dates Employed</span>
              <span>2014 – 2015</span>
            </h4>
          </li>
        </ul>
      </li>
    </ul>
  </section>
  <section id="education-section">
    <ul>
      <li class="pv-profile-section__list-item pv-education-entity pv-profile-section__card-item ember-view">
        <h3 class="pv-entity__school-name t-16 t-black t-bold">MIT</h3>
        <p class="pv-entity__secondary-title pv-entity__degree-name t-14 t-black t-normal">
          <span class="visually-hidden">Degree Name</span><span>Master of Science</span>
        </p>
        <p class="pv-entity__secondary-title pv-entity__fos t-14 t-black t-normal">
          <span class="visually-hidden">Field Of Study</span><span>Computer Science</span>
        </p>
        <p class="pv-entity__secondary-title pv-entity__grade t-14 t-black t-normal">
          <span class="visually-hidden">Grade</span><span>GPA 3.85/4.0</span>
        </p>
        <p class="pv-entity__dates t-14 t-black--light t-normal">
          <span class="visually-hidden">Dates attended or expected graduation</span>
          <span>2012 – 2014</span>
        </p>
      </li>
      <li class="pv-profile-section__list-item pv-education-entity pv-profile-section__card-item ember-view">
        <h3 class="pv-entity__school-name t-16 t-black t-bold">Springfield High</h3>
        <p class="pv-entity__dates t-14 t-black--light t-normal">
          <span class="visually-hidden">Dates attended or expected graduation</span>
          <span>2004 – 2008</span>
        </p>
      </li>
    </ul>
  </section>
  <button class="pv-profile-section__card-action-bar artdeco-container-card-action-bar">Show more</button>
</body></html>
"#;

pub const NO_EXPERIENCE_PAGE: &str = r#"
<html><body>
  <ul><li class="inline t-24 t-black t-normal break-words">John Roe</li></ul>
  <section id="experience-section"></section>
</body></html>
"#;

pub fn profile_page(name: &str, company: &str, title: &str) -> String {
    format!(
        r#"
<html><body>
  <ul><li class="inline t-24 t-black t-normal break-words">{name}</li></ul>
  <ul>
    <li class="pv-profile-section__card-item-v2 pv-profile-section pv-position-entity ember-view">
      <h3 class="t-16 t-black t-bold">{title}</h3>
      <p class="pv-entity__secondary-title t-14 t-black t-normal">{company}</p>
      <h4 class="pv-entity__date-range t-14 t-black--light t-normal">
        <span class="visually-hidden">Dates Employed</span><span>Mar 2019 – Present</span>
      </h4>
    </li>
  </ul>
</body></html>
"#
    )
}

pub fn profile_url(username: &str) -> String {
    format!("{}{}/", PROFILE_BASE, username)
}

pub fn offline_session(page: HtmlSnapshot) -> Session<HtmlSnapshot> {
    Session::new(
        page.with_page(LOGIN_URL, LOGIN_PAGE),
        LocatorTable::linkedin(),
        SiteUrls {
            login: LOGIN_URL.to_string(),
            people_search: PEOPLE_SEARCH_URL.to_string(),
            profile_base: PROFILE_BASE.to_string(),
        },
        Credentials {
            email: "scout@example.com".to_string(),
            password: "hunter2".to_string(),
        },
    )
    .with_wait(WaitSettings {
        poll_interval: Duration::from_millis(1),
        timeout: Duration::from_millis(5),
    })
    .with_pacing(Pacing {
        delay: Duration::ZERO,
        jitter: Duration::ZERO,
    })
    .with_retry_budget(RetryBudget::new(2, Duration::ZERO))
}

/// Search results served from fixed pages; page numbers start at 1. Clones
/// share the query log.
#[derive(Clone)]
pub struct StaticSearch {
    pages: Arc<Vec<Vec<String>>>,
    queries: Arc<Mutex<Vec<(String, u32)>>>,
}

impl StaticSearch {
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        StaticSearch {
            pages: Arc::new(pages),
            queries: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, page_num: u32) -> Result<Vec<SearchResult>, SearchError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), page_num));

        Ok(self
            .pages
            .get(page_num as usize - 1)
            .map(|links| {
                links
                    .iter()
                    .map(|link| SearchResult {
                        title: "LinkedIn".to_string(),
                        link: link.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

struct StoredProfile {
    profile: Profile,
    educations: Vec<NewEducation>,
    experiences: Vec<NewExperience>,
}

#[derive(Default)]
struct MemoryState {
    profiles: Vec<StoredProfile>,
    writes: usize,
    fail_writes: bool,
}

/// In-memory profile store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.lock().fail_writes = true;
        store
    }

    /// Number of successful `create` calls.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn usernames(&self) -> Vec<String> {
        self.lock()
            .profiles
            .iter()
            .map(|stored| stored.profile.username.clone())
            .collect()
    }

    pub fn experiences(&self, username: &str) -> Vec<NewExperience> {
        self.lock()
            .profiles
            .iter()
            .find(|stored| stored.profile.username == username)
            .map(|stored| stored.experiences.clone())
            .unwrap_or_default()
    }

    pub fn educations(&self, username: &str) -> Vec<NewEducation> {
        self.lock()
            .profiles
            .iter()
            .find(|stored| stored.profile.username == username)
            .map(|stored| stored.educations.clone())
            .unwrap_or_default()
    }

    pub async fn seed(&self, username: &str, company: &str, title: &str) -> Profile {
        let profile = NewProfile {
            username: username.to_string(),
            name: username.to_string(),
            location: None,
            profile_url: profile_url(username),
        };
        let experience = NewExperience {
            company: company.to_string(),
            title: title.to_string(),
            description: String::new(),
            start_date: None,
            end_date: None,
            is_current: false,
        };
        let created = self.create(&profile, &[], &[experience]).await.unwrap();
        self.lock().writes -= 1;
        created
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }
}

fn contains_ignore_case(value: &str, part: &str) -> bool {
    value.to_lowercase().contains(&part.trim().to_lowercase())
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|stored| stored.profile.username == username)
            .map(|stored| stored.profile.clone()))
    }

    async fn create(
        &self,
        profile: &NewProfile,
        educations: &[NewEducation],
        experiences: &[NewExperience],
    ) -> Result<Profile, sqlx::Error> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(sqlx::Error::PoolTimedOut);
        }
        if state
            .profiles
            .iter()
            .any(|stored| stored.profile.username == profile.username)
        {
            return Err(sqlx::Error::Protocol(format!(
                "duplicate username {}",
                profile.username
            )));
        }

        let created = Profile {
            username: profile.username.clone(),
            name: profile.name.clone(),
            location: profile.location.clone(),
            profile_url: profile.profile_url.clone(),
            created_at: Utc::now(),
        };
        state.profiles.push(StoredProfile {
            profile: created.clone(),
            educations: educations.to_vec(),
            experiences: experiences.to_vec(),
        });
        state.writes += 1;

        Ok(created)
    }

    async fn query(&self, company: &str, title: &str) -> Result<Vec<Profile>, sqlx::Error> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .filter(|stored| {
                stored.experiences.iter().any(|e| {
                    contains_ignore_case(&e.company, company)
                        && contains_ignore_case(&e.title, title)
                })
            })
            .map(|stored| stored.profile.clone())
            .collect())
    }

    async fn profile_detail(&self, username: &str) -> Result<Option<ProfileDetail>, sqlx::Error> {
        let state = self.lock();
        let Some(stored) = state
            .profiles
            .iter()
            .find(|stored| stored.profile.username == username)
        else {
            return Ok(None);
        };

        let experiences = stored
            .experiences
            .iter()
            .enumerate()
            .map(|(id, e)| Experience {
                id: id as i64 + 1,
                profile_username: username.to_string(),
                company: e.company.clone(),
                title: e.title.clone(),
                description: e.description.clone(),
                start_date: e.start_date,
                end_date: e.end_date,
                is_current: e.is_current,
            })
            .collect();
        let educations = stored
            .educations
            .iter()
            .enumerate()
            .map(|(id, e)| Education {
                id: id as i64 + 1,
                profile_username: username.to_string(),
                institution: e.institution.clone(),
                degree: e.degree.clone(),
                field_of_study: e.field_of_study.clone(),
                description: e.description.clone(),
                gpa: e.gpa,
                start_date: e.start_date,
                end_date: e.end_date,
                is_current: e.is_current,
            })
            .collect();

        Ok(Some(ProfileDetail {
            profile: stored.profile.clone(),
            experiences,
            educations,
        }))
    }
}
