//! Reference types and the read-only data the leave-reference page is gated on.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{HostRequestId, UserId};

/// The closed set of references a user can leave for another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// Reference for someone the viewer knows personally.
    Friend,
    /// Reference left by a surfer for the host they stayed with.
    Surfed,
    /// Reference left by a host for the surfer they hosted.
    Hosted,
}

impl ReferenceType {
    /// Route identifiers, in route order. The first entry is the friend type.
    const ALL: [ReferenceType; 3] = [
        ReferenceType::Friend,
        ReferenceType::Surfed,
        ReferenceType::Hosted,
    ];

    #[must_use]
    pub const fn all() -> &'static [ReferenceType] {
        &Self::ALL
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Friend => "friend",
            ReferenceType::Surfed => "surfed",
            ReferenceType::Hosted => "hosted",
        }
    }

    /// Look up a route identifier. Matching is exact: route segments are lowercase.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == value)
    }

    #[must_use]
    pub const fn is_friend(self) -> bool {
        matches!(self, ReferenceType::Friend)
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between the viewer and the subject user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendshipStatus {
    #[default]
    NotFriends,
    Friends,
    Pending,
    /// Viewing your own profile.
    #[serde(rename = "NA")]
    NotApplicable,
}

impl FriendshipStatus {
    #[must_use]
    pub const fn is_friends(self) -> bool {
        matches!(self, FriendshipStatus::Friends)
    }
}

/// The user a reference would be written about, as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectUser {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub friends: FriendshipStatus,
}

impl SubjectUser {
    #[must_use]
    pub fn overview(&self) -> UserOverview {
        UserOverview {
            user_id: self.user_id,
            username: self.username.clone(),
            name: self.name.clone(),
            city: self.city.clone(),
        }
    }
}

/// Read-only summary shown next to the reference form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub city: String,
}

impl std::fmt::Display for UserOverview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "@{}", self.username)?;
        } else {
            write!(f, "{} (@{})", self.name, self.username)?;
        }
        if !self.city.is_empty() {
            write!(f, ", {}", self.city)?;
        }
        Ok(())
    }
}

/// A reference the viewer may still write in the context of a host request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableWriteReference {
    pub host_request_id: HostRequestId,
    /// `None` when the listing names a type outside [`ReferenceType::all`].
    #[serde(
        default,
        deserialize_with = "lenient_reference_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_type: Option<ReferenceType>,
    /// RFC 3339 expiry, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_expires: Option<String>,
}

/// Entry types are informational, so an unrecognised one must not fail the
/// whole listing.
fn lenient_reference_type<'de, D>(deserializer: D) -> Result<Option<ReferenceType>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Name(name) => ReferenceType::parse(&name),
        Raw::Other(_) => None,
    })
}

/// What the viewer is currently allowed to write about one subject user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableReferences {
    #[serde(default)]
    pub can_write_friend_reference: bool,
    #[serde(default)]
    pub available_write_references: Vec<AvailableWriteReference>,
}

impl AvailableReferences {
    /// First open reference for `host_request_id`, in listing order.
    #[must_use]
    pub fn find_host_request(
        &self,
        host_request_id: HostRequestId,
    ) -> Option<&AvailableWriteReference> {
        self.available_write_references
            .iter()
            .find(|reference| reference.host_request_id == host_request_id)
    }
}
