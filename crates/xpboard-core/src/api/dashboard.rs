//! Typed fetches for the dashboard page.
//!
//! The profile is fetched first because every other query needs the user
//! id. Projects, skills, level and total xp are then fetched concurrently;
//! a failure in any of those degrades to an empty value instead of failing
//! the page.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{DashboardData, Group, SkillTransaction, UserProfile};

use super::queries::{USER_LEVEL, USER_PROFILE, USER_PROJECTS, USER_SKILLS, USER_TOTAL_XP};
use super::{QueryClient, QueryError};

/// The engine may return a single row where a list is expected.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn rows<T>(field: Option<OneOrMany<T>>) -> Vec<T> {
    field.map(OneOrMany::into_vec).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    #[serde(default)]
    user: Option<OneOrMany<UserProfile>>,
}

#[derive(Debug, Deserialize)]
struct ProjectsData {
    #[serde(default)]
    group: Option<OneOrMany<Group>>,
}

#[derive(Debug, Deserialize)]
struct SkillsData {
    #[serde(default)]
    user: Option<OneOrMany<SkillsUser>>,
}

#[derive(Debug, Deserialize)]
struct SkillsUser {
    #[serde(default)]
    transactions: Vec<SkillTransaction>,
}

#[derive(Debug, Deserialize)]
struct LevelData {
    #[serde(default)]
    event_user: Vec<EventUser>,
}

#[derive(Debug, Deserialize)]
struct EventUser {
    #[serde(default)]
    level: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TotalXpData {
    #[serde(default)]
    user: Option<OneOrMany<XpAggregateUser>>,
}

#[derive(Debug, Deserialize)]
struct XpAggregateUser {
    #[serde(default)]
    transactions_aggregate: Option<AggregateWrapper>,
}

#[derive(Debug, Deserialize)]
struct AggregateWrapper {
    #[serde(default)]
    aggregate: Option<AggregateFields>,
}

#[derive(Debug, Deserialize)]
struct AggregateFields {
    #[serde(default)]
    sum: Option<SumFields>,
}

#[derive(Debug, Deserialize)]
struct SumFields {
    #[serde(default)]
    amount: Option<f64>,
}

/// Dashboard queries over a shared [`QueryClient`].
#[derive(Clone)]
pub struct DashboardApi {
    client: QueryClient,
}

impl DashboardApi {
    pub fn new(client: QueryClient) -> Self {
        Self { client }
    }

    async fn fetch<T: DeserializeOwned>(&self, document: &str, user_id: Option<i64>) -> Result<T, QueryError> {
        let variables = match user_id {
            Some(id) => json!({ "userId": id }),
            None => json!({}),
        };
        self.client.query_as(document, variables).await
    }

    /// Profile of the signed-in user
    pub async fn fetch_profile(&self) -> Result<UserProfile, QueryError> {
        let data: ProfileData = self.fetch(USER_PROFILE, None).await?;
        let user = data
            .user
            .ok_or_else(|| QueryError::UnexpectedShape("no user data".to_string()))?;
        user.into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::UnexpectedShape("user data array is empty".to_string()))
    }

    pub async fn fetch_projects(&self, user_id: i64) -> Result<Vec<Group>, QueryError> {
        let data: ProjectsData = self.fetch(USER_PROJECTS, Some(user_id)).await?;
        Ok(rows(data.group))
    }

    pub async fn fetch_skills(&self, user_id: i64) -> Result<Vec<SkillTransaction>, QueryError> {
        let data: SkillsData = self.fetch(USER_SKILLS, Some(user_id)).await?;
        Ok(rows(data.user)
            .into_iter()
            .next()
            .map(|u| u.transactions)
            .unwrap_or_default())
    }

    /// Whole level reached in the main event, if enrolled
    pub async fn fetch_level(&self, user_id: i64) -> Result<Option<i64>, QueryError> {
        let data: LevelData = self.fetch(USER_LEVEL, Some(user_id)).await?;
        Ok(data
            .event_user
            .first()
            .and_then(|e| e.level)
            .map(|level| level.floor() as i64))
    }

    pub async fn fetch_total_xp(&self, user_id: i64) -> Result<Option<f64>, QueryError> {
        let data: TotalXpData = self.fetch(USER_TOTAL_XP, Some(user_id)).await?;
        Ok(rows(data.user)
            .into_iter()
            .next()
            .and_then(|u| u.transactions_aggregate)
            .and_then(|t| t.aggregate)
            .and_then(|a| a.sum)
            .and_then(|s| s.amount))
    }

    /// Fetch everything the dashboard shows.
    ///
    /// Only a profile failure is returned as an error.
    pub async fn load(&self) -> Result<DashboardData, QueryError> {
        let profile = self.fetch_profile().await?;
        let user_id = profile.id;
        debug!(user_id, "Fetching dashboard details");

        let (projects, skills, level, total_xp) = futures::join!(
            self.fetch_projects(user_id),
            self.fetch_skills(user_id),
            self.fetch_level(user_id),
            self.fetch_total_xp(user_id),
        );

        Ok(DashboardData {
            profile,
            projects: projects.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to fetch projects");
                Vec::new()
            }),
            skills: skills.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to fetch skills");
                Vec::new()
            }),
            level: level.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to fetch level");
                None
            }),
            total_xp: total_xp.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to fetch total xp");
                None
            }),
        })
    }
}
