use chrono::NaiveDate;

use crate::domain::{
    date_range::{parse_academic_years, parse_experience_dates},
    education::{extract_gpa, NewEducation, RawEducation},
    experience::{NewExperience, RawExperience},
};

/// Turn raw experiences into storable ones. Invalid entries are dropped; a
/// malformed date range only costs the entry its dates.
pub fn normalize_experiences(raw: Vec<RawExperience>) -> Vec<NewExperience> {
    raw.into_iter()
        .filter(RawExperience::is_valid)
        .map(|experience| {
            let (start_date, end_date, is_current) =
                match parse_experience_dates(&experience.dates) {
                    Ok(span) => (Some(span.start), span.end, span.is_current),
                    Err(e) => {
                        log::warn!(
                            "Keeping {} at {} without dates: {}",
                            experience.title,
                            experience.company,
                            e
                        );
                        (None, None, false)
                    }
                };

            NewExperience {
                company: experience.company,
                title: experience.title,
                description: experience.description,
                start_date,
                end_date,
                is_current,
            }
        })
        .collect()
}

/// Turn raw educations into storable ones under the
/// most-recent-education-mandatory policy: when the first (most recent)
/// entry is incomplete nothing is kept, otherwise every complete entry is.
///
/// Complete means institution, field of study and both academic years.
pub fn normalize_educations(raw: Vec<RawEducation>, today: NaiveDate) -> Vec<NewEducation> {
    let mut normalized = Vec::with_capacity(raw.len());

    for (index, education) in raw.into_iter().enumerate() {
        match normalize_education(education, today) {
            Some(education) => normalized.push(education),
            None if index == 0 => {
                log::info!("Most recent education is incomplete, skipping all educations");
                return vec![];
            }
            None => {}
        }
    }

    normalized
}

fn normalize_education(raw: RawEducation, today: NaiveDate) -> Option<NewEducation> {
    if raw.institution.is_empty() || raw.field_of_study.is_empty() {
        return None;
    }

    let (start_date, end_date) = match parse_academic_years(&raw.date_range) {
        Ok(years) => years,
        Err(e) => {
            log::info!("Skipping education at {}: {}", raw.institution, e);
            return None;
        }
    };

    Some(NewEducation {
        gpa: extract_gpa(&raw.grade),
        institution: raw.institution,
        degree: raw.degree,
        field_of_study: raw.field_of_study,
        description: raw.description,
        start_date,
        end_date,
        is_current: end_date >= today,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{normalize_educations, normalize_experiences};
    use crate::domain::{education::RawEducation, experience::RawExperience};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw_experience(title: &str, dates: &str) -> RawExperience {
        RawExperience {
            company: "Acme".to_string(),
            title: title.to_string(),
            dates: dates.to_string(),
            description: String::new(),
        }
    }

    fn raw_education(institution: &str, field: &str, years: &str, grade: &str) -> RawEducation {
        RawEducation {
            institution: institution.to_string(),
            field_of_study: field.to_string(),
            date_range: years.to_string(),
            grade: grade.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn malformed_dates_keep_the_entry() {
        let normalized = normalize_experiences(vec![
            raw_experience("Engineer", "Jun 2018 – Present"),
            raw_experience("Intern", "Summer of '17"),
            raw_experience("", "2015 – 2016"),
        ]);

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].start_date, Some(date(2018, 6, 1)));
        assert!(normalized[0].is_current);

        assert_eq!(normalized[1].title, "Intern");
        assert_eq!(normalized[1].start_date, None);
        assert_eq!(normalized[1].end_date, None);
        assert!(!normalized[1].is_current);
    }

    #[test]
    fn incomplete_first_education_drops_all() {
        let today = date(2024, 1, 1);
        let normalized = normalize_educations(
            vec![
                raw_education("MIT", "", "2016 – 2020", ""),
                raw_education("Stanford", "CS", "2012 – 2016", "3.9"),
            ],
            today,
        );

        assert!(normalized.is_empty());
    }

    #[test]
    fn incomplete_later_education_is_skipped() {
        let today = date(2024, 1, 1);
        let normalized = normalize_educations(
            vec![
                raw_education("MIT", "CS", "2022 – 2026", "GPA 3.85/4.0"),
                raw_education("Somewhere High", "Science", "", ""),
                raw_education("Stanford", "Math", "2016 – 2020", "3.2"),
            ],
            today,
        );

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].start_date, date(2022, 9, 1));
        assert_eq!(normalized[0].end_date, date(2026, 5, 1));
        assert!(normalized[0].is_current);
        assert_eq!(normalized[0].gpa, Some(3.85));

        assert_eq!(normalized[1].institution, "Stanford");
        assert!(!normalized[1].is_current);
        assert_eq!(normalized[1].gpa, Some(3.2));
    }

    #[test]
    fn gpa_does_not_carry_over_between_entries() {
        let today = date(2024, 1, 1);
        let normalized = normalize_educations(
            vec![
                raw_education("MIT", "CS", "2016 – 2020", "3.5"),
                raw_education("Stanford", "Math", "2012 – 2016", "Distinction"),
            ],
            today,
        );

        assert_eq!(normalized[0].gpa, Some(3.5));
        assert_eq!(normalized[1].gpa, None);
    }
}
