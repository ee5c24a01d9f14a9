//! Member accounts and membership state

use chrono::{DateTime, Months, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Staff - manages the catalog and issues on behalf of members
    Admin,
    /// Borrowing member with a paid membership period
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Paid membership durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipTier {
    #[serde(rename = "6months")]
    HalfYear,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "2years")]
    TwoYears,
}

impl MembershipTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTier::HalfYear => "6months",
            MembershipTier::OneYear => "1year",
            MembershipTier::TwoYears => "2years",
        }
    }

    /// Length of the paid period in months
    pub fn months(&self) -> u32 {
        match self {
            MembershipTier::HalfYear => 6,
            MembershipTier::OneYear => 12,
            MembershipTier::TwoYears => 24,
        }
    }

    /// Expiry instant for a membership starting at `start`
    pub fn expiry_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Months::new(self.months())
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered account, either staff or a borrowing member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub membership_no: Option<String>,
    pub tier: Option<MembershipTier>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Staff account. Carries no membership number and never expires.
    pub fn new_admin(
        name: String,
        email: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: Role::Admin,
            membership_no: None,
            tier: None,
            expires_at: None,
            is_active: true,
            created_at: now,
        }
    }

    /// Borrowing member. Gets a generated membership number and an expiry
    /// derived from the chosen tier.
    pub fn new_member(
        name: String,
        email: String,
        password_hash: String,
        tier: MembershipTier,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: Role::Member,
            membership_no: Some(generate_membership_no(now)),
            tier: Some(tier),
            expires_at: Some(tier.expiry_from(now)),
            is_active: true,
            created_at: now,
        }
    }

    /// Whether this account may borrow right now.
    ///
    /// Admins always may. Members must be active and inside their paid
    /// period (expiry itself still counts as inside).
    pub fn is_active_for_borrowing(&self, now: DateTime<Utc>) -> bool {
        if self.role == Role::Admin {
            return true;
        }
        if !self.is_active {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now <= expires_at,
            None => false,
        }
    }
}

/// Membership number in the house format: `MEM` + epoch millis + random suffix
fn generate_membership_no(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("MEM{}{}", now.timestamp_millis(), suffix)
}

/// Account info safe to show or export (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub membership_no: Option<String>,
    pub tier: Option<MembershipTier>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Member> for MemberProfile {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
            role: member.role,
            membership_no: member.membership_no.clone(),
            tier: member.tier,
            expires_at: member.expires_at,
            is_active: member.is_active,
            created_at: member.created_at,
        }
    }
}
