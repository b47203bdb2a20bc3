//! User profile, xp history and audit figures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub audit_ratio: Option<f64>,
    #[serde(default)]
    pub total_up: Option<f64>,
    #[serde(default)]
    pub total_down: Option<f64>,
    #[serde(default)]
    pub transactions: Vec<XpTransaction>,
    #[serde(default)]
    pub progresses: Vec<Progress>,
}

impl UserProfile {
    pub fn login_display(&self) -> &str {
        self.login.as_deref().filter(|l| !l.is_empty()).unwrap_or("Anonymous")
    }

    /// First and last name joined, skipping blanks
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Sum of all xp transaction amounts
    pub fn total_xp(&self) -> f64 {
        self.transactions.iter().filter_map(|t| t.amount).sum()
    }

    pub fn xp_timeline(&self) -> Vec<XpPoint> {
        xp_timeline(&self.transactions)
    }

    pub fn audit_split(&self) -> AuditSplit {
        AuditSplit::new(self.total_up.unwrap_or(0.0), self.total_down.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpTransaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub object: Option<ProgressObject>,
}

impl Progress {
    pub fn is_passed(&self) -> bool {
        self.grade.map(|g| g >= 1.0).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One step of the cumulative xp line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct XpPoint {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub total: f64,
    pub path: String,
}

/// Running xp total over time.
///
/// Transactions without an amount or a parseable timestamp are skipped.
pub fn xp_timeline(transactions: &[XpTransaction]) -> Vec<XpPoint> {
    let mut dated: Vec<(DateTime<Utc>, &XpTransaction, f64)> = transactions
        .iter()
        .filter_map(|t| {
            let amount = t.amount?;
            let created = t.created_at.as_deref()?;
            let date = DateTime::parse_from_rfc3339(created).ok()?.with_timezone(&Utc);
            Some((date, t, amount))
        })
        .collect();
    dated.sort_by_key(|(date, _, _)| *date);

    let mut total = 0.0;
    dated
        .into_iter()
        .map(|(date, t, amount)| {
            total += amount;
            XpPoint {
                date,
                amount,
                total,
                path: t.path.clone().unwrap_or_else(|| "Unknown project".to_string()),
            }
        })
        .collect()
}

/// Audit volume given vs. received, for the bar and donut charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditSplit {
    pub done: f64,
    pub received: f64,
}

impl AuditSplit {
    pub fn new(done: f64, received: f64) -> Self {
        Self { done, received }
    }

    /// Rounded percentages of the combined volume, `(done, received)`
    pub fn percentages(&self) -> (u32, u32) {
        let total = self.done + self.received;
        if total <= 0.0 {
            return (0, 0);
        }
        let done = ((self.done / total) * 100.0).round() as u32;
        let received = ((self.received / total) * 100.0).round() as u32;
        (done, received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile_json() -> serde_json::Value {
        json!({
            "id": 42,
            "login": "zoe",
            "firstName": "Zoe",
            "lastName": "",
            "email": null,
            "auditRatio": 1.236,
            "totalUp": 1500000,
            "totalDown": 500000,
            "transactions": [
                {"id": 2, "type": "xp", "amount": 2000, "createdAt": "2024-03-02T10:00:00+00:00", "path": "/bh/go-reloaded"},
                {"id": 1, "type": "xp", "amount": 1000, "createdAt": "2024-03-01T10:00:00.123+00:00", "path": null},
                {"id": 3, "type": "xp", "amount": null, "createdAt": "2024-03-03T10:00:00+00:00"},
                {"id": 4, "type": "xp", "amount": 500, "createdAt": "not a date"}
            ],
            "progresses": [
                {"id": 9, "grade": 1.2, "createdAt": "2024-03-02T10:00:00+00:00", "object": {"name": "go-reloaded", "type": "project"}}
            ]
        })
    }

    #[test]
    fn test_profile_parses_wire_format() {
        let profile: UserProfile = serde_json::from_value(profile_json()).unwrap();
        assert_eq!(profile.id, 42);
        assert_eq!(profile.login_display(), "zoe");
        assert_eq!(profile.full_name().as_deref(), Some("Zoe"));
        assert_eq!(profile.transactions.len(), 4);
        assert!(profile.progresses[0].is_passed());
        assert_eq!(
            profile.progresses[0].object.as_ref().unwrap().kind.as_deref(),
            Some("project")
        );
    }

    #[test]
    fn test_total_xp_ignores_missing_amounts() {
        let profile: UserProfile = serde_json::from_value(profile_json()).unwrap();
        assert_eq!(profile.total_xp(), 3500.0);
    }

    #[test]
    fn test_xp_timeline_sorted_and_cumulative() {
        let profile: UserProfile = serde_json::from_value(profile_json()).unwrap();
        let timeline = profile.xp_timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].amount, 1000.0);
        assert_eq!(timeline[0].total, 1000.0);
        assert_eq!(timeline[0].path, "Unknown project");
        assert_eq!(timeline[1].total, 3000.0);
        assert_eq!(timeline[1].path, "/bh/go-reloaded");
    }

    #[test]
    fn test_audit_split_percentages() {
        let profile: UserProfile = serde_json::from_value(profile_json()).unwrap();
        assert_eq!(profile.audit_split().percentages(), (75, 25));
        assert_eq!(AuditSplit::new(0.0, 0.0).percentages(), (0, 0));
    }

    #[test]
    fn test_anonymous_profile() {
        let profile: UserProfile = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(profile.login_display(), "Anonymous");
        assert_eq!(profile.full_name(), None);
        assert!(profile.xp_timeline().is_empty());
    }
}
