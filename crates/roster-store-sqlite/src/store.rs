//! [`SqliteStore`], the SQLite implementation of [`MemberStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, Transaction, TransactionBehavior};
use uuid::Uuid;

use roster_core::{
  lifecycle::{self, MemberStats, MemberUpdate, StatusTransition},
  member::{Member, MemberChanges, MembershipType, NewMember, PaymentStatus},
  number::{self, Allocation, NumberFormat, NumberSequence},
  store::{MemberQuery, MemberStore},
};

use crate::{
  encode::{
    decode_status, encode_dt, encode_kind, encode_membership_type,
    encode_status, encode_uuid, RawMember, RawSequence, MEMBER_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A member registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  format: Arc<NumberFormat>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, format: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, format: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the number format used for allocations.
  pub fn with_number_format(mut self, format: NumberFormat) -> Self {
    self.format = Arc::new(format);
    self
  }

  pub fn number_format(&self) -> &NumberFormat { &self.format }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// The current time at the precision timestamps are stored with, so that a
/// returned member equals the same member read back.
fn timestamp() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Transaction plumbing ────────────────────────────────────────────────────

/// Failure inside a transaction closure: either SQLite itself or a domain
/// rejection that must abort (and so roll back) the transaction.
enum TxError {
  Sqlite(rusqlite::Error),
  Store(Error),
}

impl From<rusqlite::Error> for TxError {
  fn from(e: rusqlite::Error) -> Self { Self::Sqlite(e) }
}

impl From<Error> for TxError {
  fn from(e: Error) -> Self { Self::Store(e) }
}

impl From<roster_core::Error> for TxError {
  fn from(e: roster_core::Error) -> Self { Self::Store(Error::Core(e)) }
}

impl From<TxError> for Error {
  fn from(e: TxError) -> Self {
    match e {
      TxError::Sqlite(e) => Error::Database(tokio_rusqlite::Error::from(e)),
      TxError::Store(e) => e,
    }
  }
}

/// Take the write lock up front so the read-then-write below cannot race
/// another writer.
fn begin(conn: &mut rusqlite::Connection) -> rusqlite::Result<Transaction<'_>> {
  conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// Map a UNIQUE violation on `members.email` to [`roster_core::Error::DuplicateEmail`].
fn email_conflict(e: rusqlite::Error, email: &str) -> TxError {
  match &e {
    rusqlite::Error::SqliteFailure(f, Some(msg))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.contains("members.email") =>
    {
      roster_core::Error::DuplicateEmail(email.to_owned()).into()
    }
    _ => e.into(),
  }
}

fn load_member(conn: &rusqlite::Connection, id: Uuid) -> TxResult<Member> {
  let raw = conn
    .query_row(
      &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawMember::from_row,
    )
    .optional()?
    .ok_or(roster_core::Error::NotFound(id))?;
  Ok(raw.into_member()?)
}

fn email_taken_by_other(
  conn: &rusqlite::Connection,
  email: &str,
  id: Uuid,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM members WHERE email = ?1 AND member_id != ?2",
        rusqlite::params![email, encode_uuid(id)],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn insert_member(conn: &rusqlite::Connection, m: &Member) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO members ({MEMBER_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ),
    rusqlite::params![
      encode_uuid(m.member_id),
      m.name,
      m.email,
      m.phone,
      encode_kind(m.kind),
      m.category,
      m.registration_number,
      encode_membership_type(m.membership_type),
      m.payment_reference,
      encode_status(m.payment_status),
      m.member_number,
      encode_dt(m.registration_date),
      encode_dt(m.last_updated),
    ],
  )?;
  Ok(())
}

/// Write every mutable column. `registration_date` is never touched.
fn write_member(conn: &rusqlite::Connection, m: &Member) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE members SET
       name = ?2, email = ?3, phone = ?4, kind = ?5, category = ?6,
       registration_number = ?7, membership_type = ?8, payment_reference = ?9,
       payment_status = ?10, member_number = ?11, last_updated = ?12
     WHERE member_id = ?1",
    rusqlite::params![
      encode_uuid(m.member_id),
      m.name,
      m.email,
      m.phone,
      encode_kind(m.kind),
      m.category,
      m.registration_number,
      encode_membership_type(m.membership_type),
      m.payment_reference,
      encode_status(m.payment_status),
      m.member_number,
      encode_dt(m.last_updated),
    ],
  )?;
  Ok(())
}

// ─── Allocation ──────────────────────────────────────────────────────────────

/// The next value for `abbreviation`: one past the larger of the persisted
/// counter and the highest suffix already stored under the sequence prefix.
/// The scan seeds counters for rows numbered before counters existed.
fn next_value(
  conn: &rusqlite::Connection,
  format: &NumberFormat,
  abbreviation: &str,
) -> rusqlite::Result<u64> {
  let counter: Option<i64> = conn
    .query_row(
      "SELECT last_value FROM number_sequences WHERE abbreviation = ?1",
      rusqlite::params![abbreviation],
      |r| r.get(0),
    )
    .optional()?;

  let prefix = format.sequence_prefix(abbreviation);
  let mut stmt = conn.prepare(
    "SELECT member_number FROM members
     WHERE member_number IS NOT NULL AND substr(member_number, 1, ?2) = ?1",
  )?;
  let existing = stmt
    .query_map(
      rusqlite::params![prefix, prefix.chars().count() as i64],
      |r| r.get::<_, String>(0),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let scanned = number::next_in_sequence(existing.iter().map(String::as_str));
  let counted = counter.map_or(0, |c| c.max(0) as u64) + 1;
  Ok(scanned.max(counted))
}

/// Allocate a number for `category` and advance its counter. Must run inside
/// the caller's write transaction.
///
/// If the sequence cannot be read the result is a degraded, clock-derived
/// number; the counter is left alone.
fn allocate(
  conn: &rusqlite::Connection,
  format: &NumberFormat,
  category: &str,
  now: DateTime<Utc>,
) -> rusqlite::Result<Allocation> {
  let abbreviation = format.abbreviation(category);

  let next = match next_value(conn, format, abbreviation) {
    Ok(next) => next,
    Err(e) => {
      let number = format.degraded(abbreviation, now);
      let reason =
        roster_core::Error::AllocationDegraded(format!("{abbreviation}: {e}"));
      tracing::warn!(%number, error = %reason, "falling back to degraded member number");
      return Ok(Allocation::Degraded(number));
    }
  };

  conn.execute(
    "INSERT INTO number_sequences (abbreviation, last_value, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT (abbreviation) DO UPDATE SET
       last_value = excluded.last_value,
       updated_at = excluded.updated_at",
    rusqlite::params![abbreviation, next as i64, encode_dt(now)],
  )?;

  Ok(Allocation::Assigned(format.format(abbreviation, next)))
}

// ─── Write transactions ──────────────────────────────────────────────────────

type TxResult<T> = std::result::Result<T, TxError>;

fn register_tx(conn: &mut rusqlite::Connection, row: &Member) -> TxResult<()> {
  let tx = begin(conn)?;
  if email_taken_by_other(&tx, &row.email, row.member_id)? {
    return Err(roster_core::Error::DuplicateEmail(row.email.clone()).into());
  }
  insert_member(&tx, row).map_err(|e| email_conflict(e, &row.email))?;
  tx.commit()?;
  Ok(())
}

fn update_tx(
  conn:    &mut rusqlite::Connection,
  format:  &NumberFormat,
  id:      Uuid,
  changes: &MemberChanges,
  now:     DateTime<Utc>,
) -> TxResult<MemberUpdate> {
  let tx = begin(conn)?;
  let mut member = load_member(&tx, id)?;

  if let Some(email) = &changes.email
    && email_taken_by_other(&tx, email, id)?
  {
    return Err(roster_core::Error::DuplicateEmail(email.clone()).into());
  }

  let renumber = lifecycle::needs_renumber(&member, changes.category.as_deref());
  changes.apply(&mut member);

  let mut renumbered      = None;
  let mut previous_number = None;
  if renumber && let Some(category) = member.category.as_deref() {
    let allocation = allocate(&tx, format, category, now)?;
    previous_number = member.member_number.replace(allocation.number().to_owned());
    renumbered = Some(allocation);
  }

  member.last_updated = now;
  write_member(&tx, &member).map_err(|e| email_conflict(e, &member.email))?;
  tx.commit()?;

  Ok(MemberUpdate { member, renumbered, previous_number })
}

fn transition_tx(
  conn:   &mut rusqlite::Connection,
  format: &NumberFormat,
  id:     Uuid,
  status: PaymentStatus,
  now:    DateTime<Utc>,
) -> TxResult<StatusTransition> {
  let tx = begin(conn)?;
  let mut member = load_member(&tx, id)?;
  let previous   = member.payment_status;

  let mut allocation = None;
  if lifecycle::needs_number(&member, status)
    && let Some(category) = member.category.as_deref()
  {
    let assigned = allocate(&tx, format, category, now)?;
    member.member_number = Some(assigned.number().to_owned());
    allocation = Some(assigned);
  }

  member.payment_status = status;
  member.last_updated   = now;
  write_member(&tx, &member)?;
  tx.commit()?;

  Ok(StatusTransition { member, previous, allocation })
}

fn delete_tx(conn: &mut rusqlite::Connection, id: Uuid) -> TxResult<Member> {
  let tx = begin(conn)?;
  let member = load_member(&tx, id)?;
  tx.execute(
    "DELETE FROM members WHERE member_id = ?1",
    rusqlite::params![encode_uuid(id)],
  )?;
  tx.commit()?;
  Ok(member)
}

// ─── MemberStore impl ────────────────────────────────────────────────────────

impl MemberStore for SqliteStore {
  type Error = Error;

  async fn register(&self, input: NewMember) -> Result<Member> {
    let now = timestamp();
    let member = Member {
      member_id:           Uuid::new_v4(),
      name:                input.name,
      email:               input.email,
      phone:               input.phone,
      kind:                input.kind,
      category:            Some(input.category),
      registration_number: input.registration_number,
      membership_type:     MembershipType::Pending,
      payment_reference:   input.payment_reference,
      payment_status:      PaymentStatus::Pending,
      member_number:       None,
      registration_date:   now,
      last_updated:        now,
    };

    let row = member.clone();
    self
      .conn
      .call(move |conn| Ok(register_tx(conn, &row)))
      .await??;

    Ok(member)
  }

  async fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?1"),
              rusqlite::params![id_str],
              RawMember::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_member).transpose()
  }

  async fn list_members(&self, query: &MemberQuery) -> Result<Vec<Member>> {
    let status   = query.payment_status.map(encode_status);
    let tier     = query.membership_type.map(encode_membership_type);

    let raws: Vec<RawMember> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEMBER_COLUMNS} FROM members
           WHERE (?1 IS NULL OR payment_status = ?1)
             AND (?2 IS NULL OR membership_type = ?2)
           ORDER BY registration_date DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status, tier], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut members = raws
      .into_iter()
      .map(RawMember::into_member)
      .collect::<Result<Vec<_>>>()?;

    if let Some(needle) = query.search.as_deref() {
      members.retain(|m| m.matches_search(needle));
    }

    Ok(members)
  }

  async fn update_member(
    &self,
    id:      Uuid,
    changes: MemberChanges,
  ) -> Result<MemberUpdate> {
    let format = Arc::clone(&self.format);
    let now    = timestamp();

    let update = self
      .conn
      .call(move |conn| Ok(update_tx(conn, &format, id, &changes, now)))
      .await??;

    Ok(update)
  }

  async fn set_payment_status(
    &self,
    id:     Uuid,
    status: PaymentStatus,
  ) -> Result<StatusTransition> {
    let format = Arc::clone(&self.format);
    let now    = timestamp();

    let transition = self
      .conn
      .call(move |conn| Ok(transition_tx(conn, &format, id, status, now)))
      .await??;

    Ok(transition)
  }

  async fn delete_member(&self, id: Uuid) -> Result<Member> {
    let removed = self
      .conn
      .call(move |conn| Ok(delete_tx(conn, id)))
      .await??;

    Ok(removed)
  }

  async fn stats(&self) -> Result<MemberStats> {
    let counts: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT payment_status, COUNT(*) FROM members GROUP BY payment_status",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut stats = MemberStats::default();
    for (status, count) in counts {
      let count = count.max(0) as u64;
      stats.total += count;
      match decode_status(&status)? {
        PaymentStatus::Pending => stats.pending += count,
        PaymentStatus::Confirmed => stats.confirmed += count,
        PaymentStatus::Rejected => stats.rejected += count,
      }
    }
    Ok(stats)
  }

  async fn sequences(&self) -> Result<Vec<NumberSequence>> {
    let raws: Vec<RawSequence> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT abbreviation, last_value, updated_at
           FROM number_sequences ORDER BY abbreviation",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawSequence {
              abbreviation: r.get(0)?,
              last_value:   r.get(1)?,
              updated_at:   r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSequence::into_sequence).collect()
  }
}
