//! Actor attribution and reviewer roles
//!
//! Resolves who made a change into a display identity (name, initials,
//! color) and defines the role hierarchy used by the review gate.

use crate::ids::ActorId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum number of words contributing to initials
const MAX_INITIALS: usize = 3;

/// Fallback initials when neither a name nor an email is known
pub const FALLBACK_INITIALS: &str = "U";

/// Display color assigned to an actor
///
/// Fixed 8-entry palette; assignment is deterministic per actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    Emerald,
    Amber,
    Red,
    Violet,
    Pink,
    Cyan,
    Lime,
}

impl Color {
    /// The palette, in assignment order
    pub const PALETTE: [Color; 8] = [
        Color::Blue,
        Color::Emerald,
        Color::Amber,
        Color::Red,
        Color::Violet,
        Color::Pink,
        Color::Cyan,
        Color::Lime,
    ];

    /// CSS hex value
    #[inline]
    #[must_use]
    pub fn hex(&self) -> &'static str {
        match self {
            Color::Blue => "#3B82F6",
            Color::Emerald => "#10B981",
            Color::Amber => "#F59E0B",
            Color::Red => "#EF4444",
            Color::Violet => "#8B5CF6",
            Color::Pink => "#EC4899",
            Color::Cyan => "#06B6D4",
            Color::Lime => "#84CC16",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hex())
    }
}

/// Derive display initials
///
/// First letters of up to three space-separated words of `display_name`,
/// uppercased. Without a usable name, the first two characters of the
/// email's local part. Falls back to `"U"`; never returns an empty string.
#[must_use]
pub fn resolve_initials(display_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = display_name {
        let initials: String = name
            .split(' ')
            .filter(|word| !word.is_empty())
            .take(MAX_INITIALS)
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if !initials.trim().is_empty() {
            return initials;
        }
    }

    if let Some(email) = email {
        let local = email.split('@').next().unwrap_or_default();
        let initials: String = local.chars().take(2).flat_map(char::to_uppercase).collect();
        if !initials.trim().is_empty() {
            return initials;
        }
    }

    FALLBACK_INITIALS.to_string()
}

/// Pick the palette color for an actor
///
/// Sum of the id's character codes modulo the palette size.
#[must_use]
pub fn resolve_color(actor_id: &ActorId) -> Color {
    let sum: u64 = actor_id.as_str().chars().map(|c| u64::from(u32::from(c))).sum();
    let len = Color::PALETTE.len() as u64;
    // Remainder is always < 8
    Color::PALETTE[(sum % len) as usize]
}

/// Who produced a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identity
    pub id: ActorId,
    /// Name shown next to the change
    pub display_name: String,
    /// Derived initials (see [`resolve_initials`])
    pub initials: String,
    /// Derived color (see [`resolve_color`])
    pub color: Color,
}

impl Actor {
    /// Resolve an actor from whatever identity data is available
    ///
    /// The display name falls back to the email, then to `"Unknown user"`.
    #[must_use]
    pub fn resolve(id: impl Into<ActorId>, display_name: Option<&str>, email: Option<&str>) -> Self {
        let id = id.into();
        let name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(email)
            .unwrap_or("Unknown user")
            .to_string();

        Self {
            initials: resolve_initials(display_name, email),
            color: resolve_color(&id),
            display_name: name,
            id,
        }
    }

    /// Actor with a known display name
    #[inline]
    #[must_use]
    pub fn named(id: impl Into<ActorId>, display_name: &str) -> Self {
        Self::resolve(id, Some(display_name), None)
    }
}

/// Role hierarchy, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// May view only
    ReadOnly,
    /// May edit and propose changes
    Edit,
    /// May publish and review changes
    Publish,
    /// Full control
    SuperAdmin,
}

impl Role {
    /// Lowest role allowed to accept or reject changes
    pub const MIN_REVIEW: Role = Role::Publish;

    /// Whether this role may review changes
    #[inline]
    #[must_use]
    pub fn can_review(&self) -> bool {
        *self >= Self::MIN_REVIEW
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ReadOnly => "read-only",
            Role::Edit => "edit",
            Role::Publish => "publish",
            Role::SuperAdmin => "super-admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read-only" | "readonly" | "viewer" => Ok(Role::ReadOnly),
            "edit" | "editor" => Ok(Role::Edit),
            "publish" | "publisher" => Ok(Role::Publish),
            "super-admin" | "superadmin" | "admin" => Ok(Role::SuperAdmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Someone attempting to resolve a change
///
/// The role is supplied by the identity collaborator; the engine never looks
/// it up on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    /// Reviewer identity (recorded as `accepted_by`)
    pub id: ActorId,
    /// Reviewer role
    pub role: Role,
}

impl Reviewer {
    /// Create new reviewer
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ActorId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn initials_from_name() {
        assert_eq!(resolve_initials(Some("Jane Doe"), None), "JD");
        assert_eq!(resolve_initials(Some("ada"), None), "A");
        assert_eq!(resolve_initials(Some("mary ann van buren"), None), "MAV");
        assert_eq!(resolve_initials(Some("  Jane   Doe "), None), "JD");
    }

    #[test]
    fn initials_from_email() {
        assert_eq!(resolve_initials(None, Some("abc@example.com")), "AB");
        assert_eq!(resolve_initials(Some("   "), Some("x@example.com")), "X");
    }

    #[test]
    fn initials_fallback() {
        assert_eq!(resolve_initials(None, None), "U");
        assert_eq!(resolve_initials(Some(""), Some("@example.com")), "U");
    }

    #[test]
    fn color_matches_code_point_sum() {
        // 'a' = 97, 97 % 8 = 1
        assert_eq!(resolve_color(&ActorId::from("a")), Color::Emerald);
        // "" sums to 0
        assert_eq!(resolve_color(&ActorId::from("")), Color::Blue);
    }

    #[test]
    fn actor_resolve_falls_back_to_email() {
        let actor = Actor::resolve("u1", None, Some("sam@example.com"));
        assert_eq!(actor.display_name, "sam@example.com");
        assert_eq!(actor.initials, "SA");
        assert_eq!(actor.color, resolve_color(&ActorId::from("u1")));
    }

    #[test]
    fn role_hierarchy() {
        assert!(Role::ReadOnly < Role::Edit);
        assert!(Role::Edit < Role::Publish);
        assert!(Role::Publish < Role::SuperAdmin);
        assert!(!Role::ReadOnly.can_review());
        assert!(!Role::Edit.can_review());
        assert!(Role::Publish.can_review());
        assert!(Role::SuperAdmin.can_review());
    }

    #[test]
    fn role_parse_and_serde() {
        assert_eq!("publisher".parse::<Role>().unwrap(), Role::Publish);
        assert_eq!("Super-Admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::ReadOnly).unwrap(), "\"read-only\"");
    }

    proptest! {
        #[test]
        fn prop_color_is_deterministic(id in ".*") {
            let actor = ActorId::from(id.as_str());
            prop_assert_eq!(resolve_color(&actor), resolve_color(&actor));
        }

        #[test]
        fn prop_initials_never_empty(name in proptest::option::of(".*"), email in proptest::option::of(".*")) {
            let initials = resolve_initials(name.as_deref(), email.as_deref());
            prop_assert!(!initials.is_empty());
        }
    }
}
