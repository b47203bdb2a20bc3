//! Data models for learn-platform records.
//!
//! This module contains the data structures the dashboard renders:
//!
//! - `UserProfile`, `XpTransaction`, `Progress`: identity, xp and grades
//! - `Group`, `GroupMember`: project groups and their members
//! - `SkillTransaction`, `SkillAxis`: skill amounts and radar axes
//!
//! plus pure helpers that turn them into chart series.

pub mod project;
pub mod skill;
pub mod user;

pub use project::{Group, GroupMember, GroupResult, MemberUser, ProjectStats, RECENT_PROJECT_COUNT};
pub use skill::{skill_axes, skill_label, SkillAxis, SkillTransaction};
pub use user::{xp_timeline, AuditSplit, Progress, ProgressObject, UserProfile, XpPoint, XpTransaction};

/// Everything the dashboard page shows, fetched in one pass.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub profile: UserProfile,
    pub projects: Vec<Group>,
    pub skills: Vec<SkillTransaction>,
    pub level: Option<i64>,
    pub total_xp: Option<f64>,
}

impl DashboardData {
    pub fn project_stats(&self) -> ProjectStats {
        ProjectStats::from_groups(&self.projects)
    }

    pub fn skill_axes(&self) -> Vec<SkillAxis> {
        skill_axes(&self.skills)
    }

    /// Event total when available, otherwise the sum of profile transactions
    pub fn xp(&self) -> f64 {
        self.total_xp.unwrap_or_else(|| self.profile.total_xp())
    }
}
