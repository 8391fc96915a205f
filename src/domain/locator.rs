use std::{collections::HashMap, fmt};

use config::{Config, ConfigError, File};
use serde::Deserialize;

pub const LOCATOR_TABLE_VERSION: &str = "linkedin-2020.01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocatorKey {
    Username,
    Password,
    PinVerify,
    SearchResultLink,
    ProfileName,
    Location,
    Experiences,
    MultiRoles,
    MultiRolesFading,
    Title,
    Company,
    CompanyMultiExperiences,
    TitleMultiExperiences,
    DateRange,
    JobDescription,
    Educations,
    School,
    Degree,
    FieldOfStudy,
    Grade,
    SchoolDateRange,
    EducationDescription,
    ShowMore,
}

impl fmt::Display for LocatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocatorKey::Username => "USERNAME",
            LocatorKey::Password => "PASSWORD",
            LocatorKey::PinVerify => "PIN_VERIFY",
            LocatorKey::SearchResultLink => "SEARCH_RESULT_LINK",
            LocatorKey::ProfileName => "PROFILE_NAME",
            LocatorKey::Location => "LOCATION",
            LocatorKey::Experiences => "EXPERIENCES",
            LocatorKey::MultiRoles => "MULTI_ROLES",
            LocatorKey::MultiRolesFading => "MULTI_ROLES_FADING",
            LocatorKey::Title => "TITLE",
            LocatorKey::Company => "COMPANY",
            LocatorKey::CompanyMultiExperiences => "COMPANY_MULTI_EXPERIENCES",
            LocatorKey::TitleMultiExperiences => "TITLE_MULTI_EXPERIENCES",
            LocatorKey::DateRange => "DATE_RANGE",
            LocatorKey::JobDescription => "JOB_DESCRIPTION",
            LocatorKey::Educations => "EDUCATIONS",
            LocatorKey::School => "SCHOOL",
            LocatorKey::Degree => "DEGREE",
            LocatorKey::FieldOfStudy => "FIELD_OF_STUDY",
            LocatorKey::Grade => "GRADE",
            LocatorKey::SchoolDateRange => "SCHOOL_DATE_RANGE",
            LocatorKey::EducationDescription => "EDUCATION_DESCRIPTION",
            LocatorKey::ShowMore => "SHOW_MORE",
        };
        write!(f, "{s}")
    }
}

/// Where a selector is evaluated: against the whole document or inside an
/// element found by an earlier lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Page,
    Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub scope: Scope,
}

/// Keyed CSS selectors for every field the scraper reads.
///
/// Site markup changes are handled here alone: either by editing the built-in
/// table or by pointing `scraper.locators_path` at an override file mapping
/// keys to selectors.
#[derive(Debug, Clone)]
pub struct LocatorTable {
    version: String,
    locators: HashMap<LocatorKey, Locator>,
}

#[derive(Deserialize)]
struct LocatorOverrides {
    version: Option<String>,
    selectors: HashMap<LocatorKey, String>,
}

impl LocatorTable {
    pub fn linkedin() -> Self {
        use LocatorKey::*;
        use Scope::*;

        let entries = [
            (Username, Page, "#username"),
            (Password, Page, "#password"),
            (PinVerify, Page, "#input__email_verification_pin"),
            (SearchResultLink, Page, "a.search-result__result-link"),
            (ProfileName, Page, ".inline.t-24.t-black.t-normal.break-words"),
            (Location, Page, "li.t-16.t-black.t-normal.inline-block"),
            (Experiences, Page, ".pv-profile-section__card-item-v2.pv-position-entity"),
            (MultiRoles, Element, "li.pv-entity__position-group-role-item"),
            (MultiRolesFading, Element, "li.pv-entity__position-group-role-item-fading-timeline"),
            (Title, Element, "h3.t-16.t-black.t-bold"),
            (Company, Element, "p.pv-entity__secondary-title"),
            (CompanyMultiExperiences, Element, "h3.t-16.t-black.t-bold"),
            (TitleMultiExperiences, Element, "h3.t-14.t-black.t-bold"),
            (DateRange, Element, "h4.pv-entity__date-range"),
            (JobDescription, Element, "p.pv-entity__description"),
            (Educations, Page, "li.pv-education-entity"),
            (School, Element, "h3.pv-entity__school-name"),
            (Degree, Element, "p.pv-entity__degree-name"),
            (FieldOfStudy, Element, "p.pv-entity__fos"),
            (Grade, Element, "p.pv-entity__grade"),
            (SchoolDateRange, Element, "p.pv-entity__dates"),
            (EducationDescription, Element, "p.pv-entity__description"),
            (ShowMore, Page, "button.pv-profile-section__card-action-bar"),
        ];

        let locators = entries
            .into_iter()
            .map(|(key, scope, selector)| {
                (
                    key,
                    Locator {
                        selector: selector.to_string(),
                        scope,
                    },
                )
            })
            .collect();

        LocatorTable {
            version: LOCATOR_TABLE_VERSION.to_string(),
            locators,
        }
    }

    /// Built-in table with selectors replaced from an override file.
    /// Scopes are fixed by the key and cannot be overridden.
    pub fn linkedin_with_overrides(path: &str) -> Result<Self, ConfigError> {
        let overrides: LocatorOverrides = Config::builder()
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()?;

        let mut table = Self::linkedin();
        for (key, selector) in overrides.selectors {
            if let Some(locator) = table.locators.get_mut(&key) {
                locator.selector = selector;
            }
        }
        if let Some(version) = overrides.version {
            table.version = version;
        }

        Ok(table)
    }

    pub fn get(&self, key: LocatorKey) -> Option<&Locator> {
        self.locators.get(&key)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self::linkedin()
    }
}
