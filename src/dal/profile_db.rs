use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{
    education::{Education, NewEducation},
    experience::{Experience, NewExperience},
    profile::{NewProfile, Profile, ProfileDetail},
};

/// Persistence for scraped profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, sqlx::Error>;

    /// Store a profile with its educations and experiences, all or nothing.
    async fn create(
        &self,
        profile: &NewProfile,
        educations: &[NewEducation],
        experiences: &[NewExperience],
    ) -> Result<Profile, sqlx::Error>;

    /// Profiles with an experience whose company and title contain the given
    /// substrings, case-insensitively.
    async fn query(&self, company: &str, title: &str) -> Result<Vec<Profile>, sqlx::Error>;

    async fn profile_detail(&self, username: &str) -> Result<Option<ProfileDetail>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        PgProfileStore { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, sqlx::Error> {
        get_profile(username, &self.pool).await
    }

    async fn create(
        &self,
        profile: &NewProfile,
        educations: &[NewEducation],
        experiences: &[NewExperience],
    ) -> Result<Profile, sqlx::Error> {
        let mut transaction = self.pool.begin().await?;

        let created = insert_profile(profile, &mut transaction).await?;
        for education in educations {
            insert_education(&profile.username, education, &mut transaction).await?;
        }
        for experience in experiences {
            insert_experience(&profile.username, experience, &mut transaction).await?;
        }

        transaction.commit().await?;

        Ok(created)
    }

    async fn query(&self, company: &str, title: &str) -> Result<Vec<Profile>, sqlx::Error> {
        get_profiles_by_experience(company, title, &self.pool).await
    }

    async fn profile_detail(&self, username: &str) -> Result<Option<ProfileDetail>, sqlx::Error> {
        let Some(profile) = get_profile(username, &self.pool).await? else {
            return Ok(None);
        };

        let experiences = get_experiences(username, &self.pool).await?;
        let educations = get_educations(username, &self.pool).await?;

        Ok(Some(ProfileDetail {
            profile,
            experiences,
            educations,
        }))
    }
}

pub async fn get_profile(username: &str, pool: &PgPool) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        select
            username,
            name,
            location,
            profile_url,
            created_at
        from
            profile
        where
            username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// `ilike` pattern matching `needle` anywhere, with its own wildcards
/// taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::from("%");
    for c in needle.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn get_profiles_by_experience(
    company: &str,
    title: &str,
    pool: &PgPool,
) -> Result<Vec<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        select
            p.username,
            p.name,
            p.location,
            p.profile_url,
            p.created_at
        from
            profile p
        where
            exists (
                select
                    1
                from
                    experience e
                where
                    e.profile_username = p.username
                    and e.company ilike $1 escape '\'
                    and e.title ilike $2 escape '\'
            )
        order by
            p.created_at
        "#,
    )
    .bind(contains_pattern(company))
    .bind(contains_pattern(title))
    .fetch_all(pool)
    .await
}

async fn get_experiences(username: &str, pool: &PgPool) -> Result<Vec<Experience>, sqlx::Error> {
    sqlx::query_as::<_, Experience>(
        r#"
        select
            id,
            profile_username,
            company,
            title,
            description,
            start_date,
            end_date,
            is_current
        from
            experience
        where
            profile_username = $1
        order by
            id
        "#,
    )
    .bind(username)
    .fetch_all(pool)
    .await
}

async fn get_educations(username: &str, pool: &PgPool) -> Result<Vec<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>(
        r#"
        select
            id,
            profile_username,
            institution,
            degree,
            field_of_study,
            description,
            gpa,
            start_date,
            end_date,
            is_current
        from
            education
        where
            profile_username = $1
        order by
            id
        "#,
    )
    .bind(username)
    .fetch_all(pool)
    .await
}

async fn insert_profile(
    profile: &NewProfile,
    transaction: &mut Transaction<'_, Postgres>,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        insert into profile
            (username, name, location, profile_url)
        values
            ($1, $2, $3, $4)
        returning
            username, name, location, profile_url, created_at
        "#,
    )
    .bind(&profile.username)
    .bind(&profile.name)
    .bind(&profile.location)
    .bind(&profile.profile_url)
    .fetch_one(&mut **transaction)
    .await
}

async fn insert_education(
    username: &str,
    education: &NewEducation,
    transaction: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into education
            (profile_username, institution, degree, field_of_study, description, gpa,
             start_date, end_date, is_current)
        values
            ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(username)
    .bind(&education.institution)
    .bind(&education.degree)
    .bind(&education.field_of_study)
    .bind(&education.description)
    .bind(education.gpa)
    .bind(education.start_date)
    .bind(education.end_date)
    .bind(education.is_current)
    .execute(&mut **transaction)
    .await?;

    Ok(())
}

async fn insert_experience(
    username: &str,
    experience: &NewExperience,
    transaction: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into experience
            (profile_username, company, title, description, start_date, end_date, is_current)
        values
            ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(username)
    .bind(&experience.company)
    .bind(&experience.title)
    .bind(&experience.description)
    .bind(experience.start_date)
    .bind(experience.end_date)
    .bind(experience.is_current)
    .execute(&mut **transaction)
    .await?;

    Ok(())
}
