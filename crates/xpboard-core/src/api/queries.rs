//! GraphQL documents consumed by the dashboard.
//!
//! All user-specific documents take the user id as an `Int!` variable.

/// Event id of the main curriculum cohort
pub const MAIN_EVENT_ID: i64 = 20;

/// Skill transaction types charted on the radar, in display order.
pub const SKILL_TYPES: [&str; 6] = [
    "skill_prog",
    "skill_go",
    "skill_back-end",
    "skill_front-end",
    "skill_js",
    "skill_php",
];

/// Profile, xp transactions (oldest first) and graded progresses (newest first)
pub const USER_PROFILE: &str = r#"
query GetUserProfile {
    user {
        id
        login
        firstName
        lastName
        email
        auditRatio
        totalUp
        totalDown
        transactions(where: {type: {_eq: "xp"}}, order_by: {createdAt: asc}) {
            id
            type
            amount
            createdAt
            path
        }
        progresses(where: {grade: {_is_null: false}}, order_by: {createdAt: desc}) {
            id
            grade
            createdAt
            object {
                name
                type
            }
        }
    }
}
"#;

/// Groups the user is a member of, most recently updated first
pub const USER_PROJECTS: &str = r#"
query GetUserProjects($userId: Int!) {
    group(where: {members: {userId: {_eq: $userId}}}, order_by: {updatedAt: desc}) {
        id
        path
        status
        createdAt
        updatedAt
        members {
            userId
            user {
                login
            }
        }
        results {
            grade
        }
    }
}
"#;

/// Latest transaction per skill type
pub const USER_SKILLS: &str = r#"
query GetUserSkills($userId: Int!) {
    user(where: { id: { _eq: $userId } }) {
        transactions(
            where: {
                type: { _in: ["skill_js", "skill_go", "skill_php", "skill_prog", "skill_front-end", "skill_back-end"] }
            }
            order_by: [{ type: desc }]
            distinct_on: [type]
        ) {
            type
            amount
            createdAt
        }
    }
}
"#;

/// Level reached in the main event
pub const USER_LEVEL: &str = r#"
query GetUserLevel($userId: Int!) {
    event_user(where: { userId: { _eq: $userId }, eventId: { _eq: 20 } }) {
        level
    }
}
"#;

/// Sum of xp earned in the main event
pub const USER_TOTAL_XP: &str = r#"
query GetUserTotalXP($userId: Int!) {
    user(where: { id: { _eq: $userId } }) {
        transactions_aggregate(where: { type: { _eq: "xp" }, eventId: { _eq: 20 } }) {
            aggregate {
                sum {
                    amount
                }
            }
        }
    }
}
"#;
