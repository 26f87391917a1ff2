//! Member records and the inputs that create or change them.
//!
//! Inputs arrive loosely typed ([`Registration`], [`MemberPatch`]) so that a
//! missing or malformed field surfaces as [`Error::Validation`] rather than a
//! deserialisation failure. Validation produces the strict forms
//! ([`NewMember`], [`MemberChanges`]) that stores accept.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Whether the member registered as a student or not. Decides what the
/// `category` field holds.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
  /// `category` is a course code, e.g. `CE`.
  #[default]
  Student,
  /// `category` is a free-text area of interest.
  NonStudent,
}

impl MemberKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::NonStudent => "non_student",
    }
  }

  /// Human label for the category field of this kind.
  pub fn category_label(self) -> &'static str {
    match self {
      Self::Student => "course",
      Self::NonStudent => "area of interest",
    }
  }
}

impl FromStr for MemberKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "student" => Ok(Self::Student),
      "non_student" | "non-student" | "nonstudent" => Ok(Self::NonStudent),
      other => Err(Error::Validation(format!("unknown member type: {other:?}"))),
    }
  }
}

// ─── Payment status ──────────────────────────────────────────────────────────

/// Payment verification state. Every transition between the three states is
/// legal; there is no terminal state.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  #[default]
  Pending,
  Confirmed,
  Rejected,
}

impl PaymentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Confirmed => "confirmed",
      Self::Rejected => "rejected",
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "confirmed" => Ok(Self::Confirmed),
      "rejected" => Ok(Self::Rejected),
      other => Err(Error::InvalidStatus(other.to_owned())),
    }
  }
}

// ─── Membership type ─────────────────────────────────────────────────────────

/// Membership tier, assigned by an administrator after registration.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
  #[default]
  Pending,
  Ordinary,
  Associate,
  Honorary,
}

impl MembershipType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Ordinary => "ordinary",
      Self::Associate => "associate",
      Self::Honorary => "honorary",
    }
  }
}

impl FromStr for MembershipType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(Self::Pending),
      "ordinary" => Ok(Self::Ordinary),
      "associate" => Ok(Self::Associate),
      "honorary" => Ok(Self::Honorary),
      other => {
        Err(Error::Validation(format!("unknown membership type: {other:?}")))
      }
    }
  }
}

// ─── Member ──────────────────────────────────────────────────────────────────

/// A registrant of the association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
  pub member_id:           Uuid,
  pub name:                String,
  /// Trimmed and lower-cased; unique across the registry.
  pub email:               String,
  /// Digits only.
  pub phone:               String,
  pub kind:                MemberKind,
  /// Course code for students, area of interest otherwise.
  pub category:            Option<String>,
  pub registration_number: Option<String>,
  pub membership_type:     MembershipType,
  pub payment_reference:   String,
  pub payment_status:      PaymentStatus,
  /// `PREFIX/ABBR/NNN`, assigned on first confirmation.
  pub member_number:       Option<String>,
  /// Set once at creation; never changes.
  pub registration_date:   DateTime<Utc>,
  pub last_updated:        DateTime<Utc>,
}

impl Member {
  /// Case-insensitive substring match across name, email, phone, member
  /// number and category. An empty needle matches everything.
  pub fn matches_search(&self, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
      return true;
    }

    [
      Some(self.name.as_str()),
      Some(self.email.as_str()),
      Some(self.phone.as_str()),
      self.member_number.as_deref(),
      self.category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
  }
}

// ─── Registration ────────────────────────────────────────────────────────────

/// Public registration form as submitted. camelCase aliases keep older
/// clients working.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
  pub name:                Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  #[serde(alias = "memberType")]
  pub member_type:         Option<String>,
  pub course:              Option<String>,
  #[serde(alias = "areaOfInterest")]
  pub area_of_interest:    Option<String>,
  #[serde(alias = "registrationNumber")]
  pub registration_number: Option<String>,
  #[serde(alias = "paymentReference")]
  pub payment_reference:   Option<String>,
  /// Omitted means the client collected consent out of band.
  pub consent:             Option<bool>,
}

/// A validated registration, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
  pub name:                String,
  pub email:               String,
  pub phone:               String,
  pub kind:                MemberKind,
  pub category:            String,
  pub registration_number: Option<String>,
  pub payment_reference:   String,
}

impl Registration {
  pub fn validate(self) -> Result<NewMember> {
    if self.consent == Some(false) {
      return Err(Error::validation(
        "consent to the terms and privacy policy is required",
      ));
    }

    let kind = match self.member_type.as_deref().map(str::trim) {
      None | Some("") => MemberKind::default(),
      Some(raw) => raw.parse()?,
    };

    let name = required("name", self.name)?;
    let email = normalize_email(&required("email", self.email)?)?;
    let phone = normalize_phone(&required("phone", self.phone)?)?;
    let category = match kind {
      MemberKind::Student => required("course", self.course)?,
      MemberKind::NonStudent => {
        required("area of interest", self.area_of_interest)?
      }
    };
    let payment_reference =
      required("payment reference", self.payment_reference)?;

    Ok(NewMember {
      name,
      email,
      phone,
      kind,
      category,
      registration_number: optional(self.registration_number),
      payment_reference,
    })
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// An administrator's edit. Keys outside this struct (`member_id`,
/// `registration_date`, `member_number`, ...) are ignored by serde and
/// therefore silently dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
  pub name:                Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  #[serde(alias = "memberType")]
  pub member_type:         Option<String>,
  pub category:            Option<String>,
  pub course:              Option<String>,
  #[serde(alias = "areaOfInterest")]
  pub area_of_interest:    Option<String>,
  #[serde(alias = "membershipType")]
  pub membership_type:     Option<String>,
  #[serde(alias = "paymentReference")]
  pub payment_reference:   Option<String>,
  #[serde(alias = "registrationNumber")]
  pub registration_number: Option<String>,
}

/// A validated, normalised patch. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberChanges {
  pub name:                Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub kind:                Option<MemberKind>,
  pub category:            Option<String>,
  pub membership_type:     Option<MembershipType>,
  pub payment_reference:   Option<String>,
  /// `Some(None)` clears the registration number.
  pub registration_number: Option<Option<String>>,
}

impl MemberPatch {
  pub fn validate(self) -> Result<MemberChanges> {
    let category = self.category.or(self.course).or(self.area_of_interest);

    Ok(MemberChanges {
      name:                present("name", self.name)?,
      email:               present("email", self.email)?
        .map(|e| normalize_email(&e))
        .transpose()?,
      phone:               present("phone", self.phone)?
        .map(|p| normalize_phone(&p))
        .transpose()?,
      kind:                present("member type", self.member_type)?
        .map(|k| k.parse::<MemberKind>())
        .transpose()?,
      category:            present("category", category)?,
      membership_type:     present("membership type", self.membership_type)?
        .map(|t| t.parse::<MembershipType>())
        .transpose()?,
      payment_reference:   present("payment reference", self.payment_reference)?,
      registration_number: self.registration_number.map(|r| optional(Some(r))),
    })
  }
}

impl MemberChanges {
  pub fn is_empty(&self) -> bool { self == &Self::default() }

  /// Write every present field onto `member`. Numbering and timestamps are
  /// the store's responsibility.
  pub fn apply(&self, member: &mut Member) {
    if let Some(name) = &self.name {
      member.name = name.clone();
    }
    if let Some(email) = &self.email {
      member.email = email.clone();
    }
    if let Some(phone) = &self.phone {
      member.phone = phone.clone();
    }
    if let Some(kind) = self.kind {
      member.kind = kind;
    }
    if let Some(category) = &self.category {
      member.category = Some(category.clone());
    }
    if let Some(membership_type) = self.membership_type {
      member.membership_type = membership_type;
    }
    if let Some(reference) = &self.payment_reference {
      member.payment_reference = reference.clone();
    }
    if let Some(registration_number) = &self.registration_number {
      member.registration_number = registration_number.clone();
    }
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Trim and lower-case an email address, rejecting anything not shaped like
/// `local@domain.tld`.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  let invalid = || Error::Validation(format!("invalid email address: {raw:?}"));

  if email.chars().any(char::is_whitespace) {
    return Err(invalid());
  }
  let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
  if local.is_empty() || domain.contains('@') {
    return Err(invalid());
  }
  let has_inner_dot = domain
    .char_indices()
    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
  if !has_inner_dot {
    return Err(invalid());
  }

  Ok(email)
}

/// Reduce a phone number to its digits.
pub fn normalize_phone(raw: &str) -> Result<String> {
  let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
  if digits.is_empty() {
    return Err(Error::Validation(format!("invalid phone number: {raw:?}")));
  }
  Ok(digits)
}

fn required(field: &str, value: Option<String>) -> Result<String> {
  present(field, value)?
    .ok_or_else(|| Error::Validation(format!("{field} is required")))
}

/// Like [`required`] but absence is fine; only a blank value is rejected.
fn present(field: &str, value: Option<String>) -> Result<Option<String>> {
  match value.map(|v| v.trim().to_owned()) {
    Some(v) if v.is_empty() => {
      Err(Error::Validation(format!("{field} cannot be blank")))
    }
    other => Ok(other),
  }
}

fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}
