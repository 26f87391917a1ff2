//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order matches chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Enums use their `as_str` names.

use chrono::{DateTime, SecondsFormat, Utc};
use roster_core::{
  member::{Member, MemberKind, MembershipType, PaymentStatus},
  number::NumberSequence,
};
use uuid::Uuid;

use crate::{Error, Result};

/// Column list shared by every member `SELECT`, in [`RawMember`] order.
pub const MEMBER_COLUMNS: &str = "member_id, name, email, phone, kind, category,
  registration_number, membership_type, payment_reference, payment_status,
  member_number, registration_date, last_updated";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_kind(k: MemberKind) -> &'static str { k.as_str() }

pub fn decode_kind(s: &str) -> Result<MemberKind> {
  match s {
    "student" => Ok(MemberKind::Student),
    "non_student" => Ok(MemberKind::NonStudent),
    other => Err(Error::Decode { column: "kind", value: other.to_owned() }),
  }
}

pub fn encode_status(s: PaymentStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<PaymentStatus> {
  s.parse().map_err(|_| Error::Decode {
    column: "payment_status",
    value:  s.to_owned(),
  })
}

pub fn encode_membership_type(t: MembershipType) -> &'static str { t.as_str() }

pub fn decode_membership_type(s: &str) -> Result<MembershipType> {
  s.parse().map_err(|_| Error::Decode {
    column: "membership_type",
    value:  s.to_owned(),
  })
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// A `members` row as plain column values, before decoding.
pub struct RawMember {
  pub member_id:           String,
  pub name:                String,
  pub email:               String,
  pub phone:               String,
  pub kind:                String,
  pub category:            Option<String>,
  pub registration_number: Option<String>,
  pub membership_type:     String,
  pub payment_reference:   String,
  pub payment_status:      String,
  pub member_number:       Option<String>,
  pub registration_date:   String,
  pub last_updated:        String,
}

impl RawMember {
  /// Row mapper for queries selecting [`MEMBER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:           row.get(0)?,
      name:                row.get(1)?,
      email:               row.get(2)?,
      phone:               row.get(3)?,
      kind:                row.get(4)?,
      category:            row.get(5)?,
      registration_number: row.get(6)?,
      membership_type:     row.get(7)?,
      payment_reference:   row.get(8)?,
      payment_status:      row.get(9)?,
      member_number:       row.get(10)?,
      registration_date:   row.get(11)?,
      last_updated:        row.get(12)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:           decode_uuid(&self.member_id)?,
      name:                self.name,
      email:               self.email,
      phone:               self.phone,
      kind:                decode_kind(&self.kind)?,
      category:            self.category,
      registration_number: self.registration_number,
      membership_type:     decode_membership_type(&self.membership_type)?,
      payment_reference:   self.payment_reference,
      payment_status:      decode_status(&self.payment_status)?,
      member_number:       self.member_number,
      registration_date:   decode_dt(&self.registration_date)?,
      last_updated:        decode_dt(&self.last_updated)?,
    })
  }
}

/// A `number_sequences` row.
pub struct RawSequence {
  pub abbreviation: String,
  pub last_value:   i64,
  pub updated_at:   String,
}

impl RawSequence {
  pub fn into_sequence(self) -> Result<NumberSequence> {
    let last_value = u64::try_from(self.last_value).map_err(|_| Error::Decode {
      column: "last_value",
      value:  self.last_value.to_string(),
    })?;
    Ok(NumberSequence {
      abbreviation: self.abbreviation,
      last_value,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
