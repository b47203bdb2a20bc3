//! Project groups the user belongs to.

use serde::{Deserialize, Serialize};

/// Number of projects shown in the "recent" list
pub const RECENT_PROJECT_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub results: Vec<GroupResult>,
}

impl Group {
    /// Last path segment, e.g. `go-reloaded` for `/bahrain/bh-module/go-reloaded`
    pub fn name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn status_display(&self) -> &str {
        self.status.as_deref().unwrap_or("Unknown")
    }

    /// Finished, or graded at least once
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("finished") || !self.results.is_empty()
    }

    pub fn member_logins(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter_map(|m| m.user.as_ref().and_then(|u| u.login.as_deref()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_id: i64,
    #[serde(default)]
    pub user: Option<MemberUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUser {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupResult {
    #[serde(default)]
    pub grade: Option<f64>,
}

/// Counts shown on the projects card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectStats {
    pub total: usize,
    pub completed: usize,
}

impl ProjectStats {
    pub fn from_groups(groups: &[Group]) -> Self {
        Self {
            total: groups.len(),
            completed: groups.iter().filter(|g| g.is_completed()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_parses_and_summarizes() {
        let groups: Vec<Group> = serde_json::from_value(json!([
            {
                "id": 1,
                "path": "/bahrain/bh-module/go-reloaded",
                "status": "finished",
                "members": [{"userId": 42, "user": {"login": "zoe"}}, {"userId": 7, "user": null}],
                "results": []
            },
            {"id": 2, "path": "/bahrain/bh-module/ascii-art/", "status": "working", "results": [{"grade": 0}]},
            {"id": 3, "status": "setup"}
        ]))
        .unwrap();

        assert_eq!(groups[0].name(), "go-reloaded");
        assert_eq!(groups[1].name(), "ascii-art");
        assert_eq!(groups[2].name(), "Unknown");
        assert_eq!(groups[0].member_logins(), vec!["zoe"]);
        assert_eq!(
            ProjectStats::from_groups(&groups),
            ProjectStats { total: 3, completed: 2 }
        );
    }
}
