//! Registration, login, and credential handling

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::invariants::assert_member_invariants;
use crate::models::{Member, MemberProfile, MembershipTier, Role};
use crate::permissions::{PermissionMatrix, StaffAction};
use crate::storage::MemberStore;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password with Argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Authentication(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Input for registering an account
#[derive(Debug, Clone)]
pub struct NewMemberRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to Member when absent
    pub role: Option<Role>,
    /// Required for members, ignored for admins
    pub tier: Option<MembershipTier>,
}

/// Registration and login service
pub struct Registrar<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> Registrar<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Register a new account
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub fn register(&self, request: NewMemberRequest) -> Result<MemberProfile> {
        let members = MemberStore::new(self.conn);

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidOperation("name is required".into()));
        }

        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidOperation("a valid email is required".into()));
        }

        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidOperation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if members.find_by_email(&email)?.is_some() {
            return Err(Error::InvalidOperation(
                "email is already registered".into(),
            ));
        }

        let role = request.role.unwrap_or(Role::Member);
        let password_hash = hash_password(&request.password)?;
        let now = self.clock.now();

        let member = match role {
            Role::Admin => Member::new_admin(name, email, password_hash, now),
            Role::Member => {
                let tier = request.tier.ok_or_else(|| {
                    Error::InvalidOperation("membership tier is required for members".into())
                })?;
                Member::new_member(name, email, password_hash, tier, now)
            }
        };
        assert_member_invariants(&member);

        members.create(&member)?;
        info!(member_id = %member.id, role = %member.role, "Member registered");

        Ok(MemberProfile::from(&member))
    }

    /// Log in with email and password.
    ///
    /// Unknown email and wrong password produce the same error.
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<MemberProfile> {
        let members = MemberStore::new(self.conn);
        let email = email.trim().to_lowercase();

        let member = members
            .find_by_email(&email)?
            .ok_or_else(|| Error::Authentication("invalid email or password".into()))?;

        if !verify_password(&member.password_hash, password) {
            return Err(Error::Authentication("invalid email or password".into()));
        }

        info!(member_id = %member.id, "Member logged in");
        Ok(MemberProfile::from(&member))
    }

    /// Check a member's password without logging in
    pub fn verify_credential(&self, member: &Member, password: &str) -> bool {
        verify_password(&member.password_hash, password)
    }

    /// Toggle a member's active flag (staff action)
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub fn set_member_active(
        &self,
        actor: &Member,
        member_id: Uuid,
        is_active: bool,
    ) -> Result<MemberProfile> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::ToggleMemberActive) {
            return Err(Error::PermissionDenied(
                "only staff can change a member's active flag".into(),
            ));
        }

        let members = MemberStore::new(self.conn);
        let member = members
            .find_by_id(member_id)?
            .ok_or_else(|| Error::NotFound("member not found".into()))?;

        members.set_active(member.id, is_active)?;
        info!(member_id = %member.id, is_active, "Member active flag changed");

        let updated = members
            .find_by_id(member.id)?
            .ok_or_else(|| Error::NotFound("member not found".into()))?;
        Ok(MemberProfile::from(&updated))
    }
}
