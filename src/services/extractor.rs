use chrono::Utc;

use crate::{
    dal::profile_db::ProfileStore,
    domain::{
        education::RawEducation,
        experience::{NewExperience, RawExperience},
        locator::LocatorKey,
        profile::{canonical_profile_url, url_to_username, NewProfile, Profile},
    },
    error::ScrapeError,
};

use super::{
    browser::Page,
    element_accessor::{labelled_value, ElementAccessor, Lookup},
    normalizer::{normalize_educations, normalize_experiences},
    session::Session,
};

const PROFILE_PAGE_HEIGHT: u32 = 1500;
const COMPANY_SIMILARITY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Created(Profile),
    /// Known username; the page was not visited.
    AlreadyExists(Profile),
    /// No valid experience on the page; nothing was stored.
    NoExperience,
}

impl Extraction {
    pub fn profile(self) -> Option<Profile> {
        match self {
            Extraction::Created(profile) | Extraction::AlreadyExists(profile) => Some(profile),
            Extraction::NoExperience => None,
        }
    }
}

pub struct ProfileExtractor<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileExtractor<S> {
    pub fn new(store: S) -> Self {
        ProfileExtractor { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scrape one profile page and store it with its experiences and
    /// educations. The hints only affect logging.
    pub async fn extract<P: Page>(
        &self,
        session: &Session<P>,
        profile_url: &str,
        company_hint: &str,
        role_hint: &str,
    ) -> Result<Extraction, ScrapeError> {
        let username = url_to_username(profile_url)
            .ok_or_else(|| ScrapeError::InvalidProfileUrl(profile_url.to_string()))?;

        if let Some(profile) = self.store.find_by_username(&username).await? {
            log::info!("A profile with username {} exists in the database", username);
            return Ok(Extraction::AlreadyExists(profile));
        }

        session.visit(profile_url).await?;
        session.scroll_to_bottom(PROFILE_PAGE_HEIGHT).await?;
        session.expand_sections().await;

        let accessor = session.accessor();

        let name = accessor
            .text_of(LocatorKey::ProfileName, None, Lookup::Wait)
            .await
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ScrapeError::AuthenticationStale(format!("no profile name on {}", profile_url))
            })?;
        let location = accessor
            .text_of(LocatorKey::Location, None, Lookup::Immediate)
            .await
            .filter(|location| !location.is_empty());

        let experiences = normalize_experiences(read_experiences(&accessor).await);
        if experiences.is_empty() {
            log::info!("{} has no experience", name);
            return Ok(Extraction::NoExperience);
        }

        if !matches_hints(&experiences, company_hint, role_hint) {
            log::info!(
                "{} doesn't appear to have worked as a {} at {}",
                username,
                role_hint,
                company_hint
            );
        }

        let educations = normalize_educations(
            read_educations(&accessor).await,
            Utc::now().date_naive(),
        );

        let profile = NewProfile {
            profile_url: canonical_profile_url(&session.urls().profile_base, &username),
            username,
            name,
            location,
        };
        let profile = self
            .store
            .create(&profile, &educations, &experiences)
            .await?;
        log::info!(
            "Successfully created {}'s profile with {} experiences and {} educations",
            profile.username,
            experiences.len(),
            educations.len()
        );

        Ok(Extraction::Created(profile))
    }
}

/// Experiences in page order. A block with several roles at one company
/// yields one entry per role.
async fn read_experiences<P: Page>(accessor: &ElementAccessor<'_, P>) -> Vec<RawExperience> {
    let Some(blocks) = accessor
        .find_many(LocatorKey::Experiences, None, Lookup::Immediate)
        .await
    else {
        return vec![];
    };

    let mut experiences = vec![];

    for block in blocks.iter() {
        let roles = match accessor
            .find_many(LocatorKey::MultiRoles, Some(block), Lookup::Immediate)
            .await
        {
            Some(roles) => Some(roles),
            None => {
                accessor
                    .find_many(LocatorKey::MultiRolesFading, Some(block), Lookup::Immediate)
                    .await
            }
        };

        let description = accessor
            .text_or_empty(LocatorKey::JobDescription, Some(block), Lookup::Immediate)
            .await;

        match roles {
            Some(roles) => {
                let company = labelled_value(
                    &accessor
                        .text_or_empty(
                            LocatorKey::CompanyMultiExperiences,
                            Some(block),
                            Lookup::Immediate,
                        )
                        .await,
                );

                for role in roles.iter() {
                    let title = accessor
                        .text_or_empty(LocatorKey::TitleMultiExperiences, Some(role), Lookup::Immediate)
                        .await;
                    let dates = accessor
                        .text_or_empty(LocatorKey::DateRange, Some(role), Lookup::Immediate)
                        .await;

                    experiences.push(RawExperience {
                        company: company.clone(),
                        title: labelled_value(&title),
                        dates: labelled_value(&dates),
                        description: description.clone(),
                    });
                }
            }
            None => {
                let experience = RawExperience {
                    company: accessor
                        .text_or_empty(LocatorKey::Company, Some(block), Lookup::Immediate)
                        .await,
                    title: accessor
                        .text_or_empty(LocatorKey::Title, Some(block), Lookup::Immediate)
                        .await,
                    dates: labelled_value(
                        &accessor
                            .text_or_empty(LocatorKey::DateRange, Some(block), Lookup::Immediate)
                            .await,
                    ),
                    description,
                };

                if experience.is_valid() && !experience.company.is_empty() {
                    experiences.push(experience);
                }
            }
        }
    }

    experiences
}

async fn read_educations<P: Page>(accessor: &ElementAccessor<'_, P>) -> Vec<RawEducation> {
    let Some(entries) = accessor
        .find_many(LocatorKey::Educations, None, Lookup::Immediate)
        .await
    else {
        return vec![];
    };

    let mut educations = Vec::with_capacity(entries.len());

    for entry in entries.iter() {
        educations.push(RawEducation {
            institution: entry_text(accessor, LocatorKey::School, entry).await,
            degree: labelled_value(&entry_text(accessor, LocatorKey::Degree, entry).await),
            field_of_study: labelled_value(
                &entry_text(accessor, LocatorKey::FieldOfStudy, entry).await,
            ),
            grade: labelled_value(&entry_text(accessor, LocatorKey::Grade, entry).await),
            date_range: labelled_value(
                &entry_text(accessor, LocatorKey::SchoolDateRange, entry).await,
            ),
            description: entry_text(accessor, LocatorKey::EducationDescription, entry).await,
        });
    }

    educations
}

async fn entry_text<P: Page>(
    accessor: &ElementAccessor<'_, P>,
    key: LocatorKey,
    entry: &P::Element,
) -> String {
    accessor
        .text_or_empty(key, Some(entry), Lookup::Immediate)
        .await
}

fn matches_hints(experiences: &[NewExperience], company: &str, role: &str) -> bool {
    experiences
        .iter()
        .any(|e| company_matches(&e.company, company) && contains_ignore_case(&e.title, role))
}

fn company_matches(candidate: &str, hint: &str) -> bool {
    contains_ignore_case(candidate, hint)
        || strsim::jaro_winkler(&candidate.to_lowercase(), &hint.trim().to_lowercase())
            >= COMPANY_SIMILARITY
}

fn contains_ignore_case(value: &str, hint: &str) -> bool {
    value.to_lowercase().contains(&hint.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{company_matches, matches_hints};
    use crate::domain::experience::NewExperience;

    fn experience(company: &str, title: &str) -> NewExperience {
        NewExperience {
            company: company.to_string(),
            title: title.to_string(),
            description: String::new(),
            start_date: None,
            end_date: None,
            is_current: false,
        }
    }

    #[test]
    fn company_hint_tolerates_small_spelling_differences() {
        assert!(company_matches("Google LLC", "google"));
        assert!(company_matches("Microsft", "Microsoft"));
        assert!(!company_matches("Amazon", "Google"));
    }

    #[test]
    fn hints_need_company_and_role_on_the_same_entry() {
        let experiences = vec![
            experience("Acme", "Sales Manager"),
            experience("Initech", "Software Engineer"),
        ];

        assert!(matches_hints(&experiences, "initech", "engineer"));
        assert!(!matches_hints(&experiences, "Acme", "Engineer"));
        assert!(matches_hints(&experiences, "", ""));
    }
}
