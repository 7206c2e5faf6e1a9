use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a ring member
pub type MemberId = i64;

/// Member model - one participant of the ring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub domain: String,
    pub path: String,
    #[serde(rename = "https")]
    pub use_https: bool,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub enabled: bool,
    #[serde(rename = "disable_checks")]
    pub checks_disabled: bool,
    /// Set by the ring monitor only
    pub dead_end: bool,
}

impl Member {
    pub fn scheme(&self) -> &'static str {
        if self.use_https { "https" } else { "http" }
    }

    /// Public address of the member's page, used for probing and redirects
    pub fn url(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        format!("{}://{}{}", self.scheme(), self.domain, path)
    }

    /// Enabled and not marked as a dead end
    pub fn is_eligible(&self) -> bool {
        self.enabled && !self.dead_end
    }

    /// Sort key defining the ring order: creation time, ties broken by id
    pub fn ring_order(&self) -> (DateTime<Utc>, MemberId) {
        (self.created_at, self.id)
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

/// Payload for creating a member. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(rename = "https", default = "default_true")]
    pub use_https: bool,
    pub author: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "disable_checks", default)]
    pub checks_disabled: bool,
}

impl NewMember {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            path: default_path(),
            use_https: true,
            author: author.into(),
            enabled: true,
            checks_disabled: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn without_checks(mut self) -> Self {
        self.checks_disabled = true;
        self
    }

    /// Materialize the record once the store has assigned its identity
    pub fn into_member(self, id: MemberId, created_at: DateTime<Utc>) -> Member {
        Member {
            id,
            name: self.name,
            domain: self.domain,
            path: if self.path.is_empty() { default_path() } else { self.path },
            use_https: self.use_https,
            author: self.author,
            created_at,
            enabled: self.enabled,
            checks_disabled: self.checks_disabled,
            dead_end: false,
        }
    }
}

/// Partial administrative update. Absent fields are left untouched.
///
/// `dead_end` is deliberately not part of the payload: only the ring monitor
/// writes the health flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "https", skip_serializing_if = "Option::is_none")]
    pub use_https: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "disable_checks", skip_serializing_if = "Option::is_none")]
    pub checks_disabled: Option<bool>,
}

impl MemberUpdate {
    pub fn set_enabled(enabled: bool) -> Self {
        Self { enabled: Some(enabled), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changed fields to `member`, returning whether anything changed
    pub fn apply(&self, member: &mut Member) -> bool {
        let before = member.clone();

        if let Some(name) = &self.name {
            member.name.clone_from(name);
        }
        if let Some(domain) = &self.domain {
            member.domain.clone_from(domain);
        }
        if let Some(path) = &self.path {
            member.path = if path.is_empty() { default_path() } else { path.clone() };
        }
        if let Some(use_https) = self.use_https {
            member.use_https = use_https;
        }
        if let Some(author) = &self.author {
            member.author.clone_from(author);
        }
        if let Some(enabled) = self.enabled {
            member.enabled = enabled;
        }
        if let Some(checks_disabled) = self.checks_disabled {
            member.checks_disabled = checks_disabled;
            // Unchecked members are pinned healthy
            if checks_disabled {
                member.dead_end = false;
            }
        }

        *member != before
    }
}
