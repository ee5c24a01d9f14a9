//! Member storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_uuid, role_from_str, tier_from_str_opt, OptionalExt,
};
use crate::error::Result;
use crate::models::{Member, Role};

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: role_from_str(&row.get::<_, String>(4)?),
        membership_no: row.get(5)?,
        tier: tier_from_str_opt(row.get::<_, Option<String>>(6)?),
        expires_at: parse_datetime_opt(row.get::<_, Option<String>>(7)?)?,
        is_active: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

pub struct MemberStore<'a> {
    conn: &'a Connection,
}

impl<'a> MemberStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new member
    #[instrument(skip(self, member), fields(email = %member.email))]
    pub fn create(&self, member: &Member) -> Result<()> {
        self.conn.execute(
            "INSERT INTO members (id, name, email, password_hash, role, membership_no, tier, \
             expires_at, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                member.id.to_string(),
                member.name,
                member.email,
                member.password_hash,
                member.role.as_str(),
                member.membership_no,
                member.tier.map(|t| t.as_str()),
                member.expires_at.map(|t| t.to_rfc3339()),
                member.is_active,
                member.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find member by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password_hash, role, membership_no, tier, expires_at, \
             is_active, created_at FROM members WHERE id = ?1",
        )?;

        let member = stmt
            .query_row(params![id.to_string()], member_from_row)
            .optional()?;

        Ok(member)
    }

    /// Find member by email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password_hash, role, membership_no, tier, expires_at, \
             is_active, created_at FROM members WHERE email = ?1",
        )?;

        let member = stmt.query_row(params![email], member_from_row).optional()?;

        Ok(member)
    }

    /// List members with a given role, newest first
    pub fn list_by_role(&self, role: Role) -> Result<Vec<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password_hash, role, membership_no, tier, expires_at, \
             is_active, created_at FROM members WHERE role = ?1 ORDER BY created_at DESC",
        )?;

        let members = stmt
            .query_map(params![role.as_str()], member_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(members)
    }

    /// Set the active flag
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE members SET is_active = ?1 WHERE id = ?2",
            params![is_active, id.to_string()],
        )?;
        Ok(())
    }
}
