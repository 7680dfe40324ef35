//! Authorization policy
//!
//! Admin authority comes from a configured set of usernames. The set is
//! built once at startup and handed to the auth service; it is consulted at
//! login and the result travels inside the token.

use super::models::Identity;
use std::collections::HashSet;

/// Usernames holding admin authority, compared case-insensitively
#[derive(Debug, Clone, Default)]
pub struct AdminSet {
    members: HashSet<String>,
}

impl AdminSet {
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members = usernames
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self { members }
    }

    /// Parse a comma-separated list such as `ADMIN_USERS=root,ops`
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.members.contains(&username.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Whether `caller` may delete a resource owned by `resource_owner`
pub fn can_delete(resource_owner: &str, caller: &Identity) -> bool {
    caller.is_admin || caller.username == resource_owner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_truth_table() {
        let cases = [
            ("alice", Identity::new("alice", false), true),
            ("alice", Identity::new("bob", false), false),
            ("alice", Identity::new("root", true), true),
            ("root", Identity::new("root", true), true),
            ("bob", Identity::new("alice", true), true),
        ];

        for (owner, caller, expected) in cases {
            assert_eq!(
                can_delete(owner, &caller),
                expected,
                "owner={owner} caller={caller:?}"
            );
        }
    }

    #[test]
    fn test_owner_match_is_exact() {
        assert!(!can_delete("alice", &Identity::new("alice2", false)));
        assert!(!can_delete("", &Identity::new("alice", false)));
    }

    #[test]
    fn test_admin_set_case_insensitive() {
        let admins = AdminSet::new(["Root", " ops "]);

        assert!(admins.contains("root"));
        assert!(admins.contains("ROOT"));
        assert!(admins.contains("ops"));
        assert!(!admins.contains("alice"));
        assert_eq!(admins.len(), 2);
    }

    #[test]
    fn test_admin_set_from_csv() {
        let admins = AdminSet::from_csv("root, ops,,");
        assert_eq!(admins.len(), 2);
        assert!(admins.contains("ops"));

        assert!(AdminSet::from_csv("").is_empty());
    }
}
