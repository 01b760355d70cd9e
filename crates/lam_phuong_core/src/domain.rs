//! crates/lam_phuong_core/src/domain.rs
//!
//! Defines the core data structures shared by the session, guard and cache
//! layers. These structs are independent of any transport or storage.

use serde::{Deserialize, Deserializer, Serialize};

//=========================================================================================
// Identity
//=========================================================================================

/// The user profile returned by the remote API on sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// The authenticated identity for one browser context.
///
/// A session is always complete: a token without a user (or the reverse) is
/// never represented as a `Session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Sign-in form input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The remote API's answer to a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
    pub user: User,
}

impl From<SignInResponse> for Session {
    fn from(response: SignInResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
        }
    }
}

/// The remote API is inconsistent about whether ids are numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

//=========================================================================================
// Resources
//=========================================================================================

/// The CRUD resources exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Locations,
    JobCategories,
    JobTypes,
    ProductGroups,
    JobPostings,
    Users,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Locations,
        ResourceKind::JobCategories,
        ResourceKind::JobTypes,
        ResourceKind::ProductGroups,
        ResourceKind::JobPostings,
        ResourceKind::Users,
    ];

    /// Path segment used both by the remote API and by the `/data/{resource}` route.
    pub fn slug(self) -> &'static str {
        match self {
            ResourceKind::Locations => "locations",
            ResourceKind::JobCategories => "job-categories",
            ResourceKind::JobTypes => "job-types",
            ResourceKind::ProductGroups => "product-groups",
            ResourceKind::JobPostings => "job-postings",
            ResourceKind::Users => "users",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Slowly-changing lists that are worth caching locally.
    pub fn is_reference_data(self) -> bool {
        matches!(
            self,
            ResourceKind::Locations
                | ResourceKind::JobCategories
                | ResourceKind::JobTypes
                | ResourceKind::ProductGroups
        )
    }

    /// The fixed cache key for this resource's list.
    pub fn cache_key(self) -> String {
        self.slug().replace('-', "_")
    }
}
