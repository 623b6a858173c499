//! SQLite track and portfolio store.
//!
//! Track saves are optimistic: the update only applies when the stored
//! version still matches the caller's copy, and bumps it in the same
//! statement.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use rust_decimal::Decimal;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{PortfolioRow, TrackRow};
use crate::adapter::outbound::sqlite::database::schema::{portfolios, tracks};
use crate::domain::{Portfolio, Track, TrackId, TrackKind, TrackStatus, UserId};
use crate::error::{Error, RaceError, Result};
use crate::port::{PortfolioStore, SaveOutcome, TrackStore};

type Conn = PooledConnection<ConnectionManager<diesel::SqliteConnection>>;

/// SQLite-backed implementation of [`TrackStore`] and [`PortfolioStore`].
pub struct SqliteStore {
    /// Database connection pool.
    pool: DbPool,
}

fn parse_err(e: impl std::fmt::Display) -> Error {
    Error::Parse(e.to_string())
}

fn db_err(e: diesel::result::Error) -> Error {
    Error::Database(e.to_string())
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<Conn> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn to_row(track: &Track) -> Result<TrackRow> {
        Ok(TrackRow {
            id: track.id.to_string(),
            bet_amount: track.bet_amount.to_string(),
            kind: track.kind.as_str().to_string(),
            creator: track.creator.as_ref().map(ToString::to_string),
            status: track.status.as_str().to_string(),
            num_players: i32::try_from(track.num_players).map_err(parse_err)?,
            max_players: i32::try_from(track.max_players).map_err(parse_err)?,
            start_at: track.start,
            end_at: track.end,
            duration: track.duration,
            created_at: track.created_at,
            users: serde_json::to_string(&track.users).map_err(parse_err)?,
            players: serde_json::to_string(&track.players).map_err(parse_err)?,
            winners: serde_json::to_string(&track.winners).map_err(parse_err)?,
            version: i64::try_from(track.version).map_err(parse_err)?,
        })
    }

    fn from_row(row: TrackRow) -> Result<Track> {
        Ok(Track {
            id: TrackId::from(row.id),
            bet_amount: Decimal::from_str(&row.bet_amount).map_err(parse_err)?,
            kind: TrackKind::from_str(&row.kind).map_err(Error::Parse)?,
            creator: row.creator.map(UserId::from),
            status: TrackStatus::from_str(&row.status).map_err(Error::Parse)?,
            num_players: usize::try_from(row.num_players).map_err(parse_err)?,
            max_players: usize::try_from(row.max_players).map_err(parse_err)?,
            start: row.start_at,
            end: row.end_at,
            duration: row.duration,
            created_at: row.created_at,
            users: serde_json::from_str(&row.users).map_err(parse_err)?,
            players: serde_json::from_str(&row.players).map_err(parse_err)?,
            winners: serde_json::from_str(&row.winners).map_err(parse_err)?,
            version: u64::try_from(row.version).map_err(parse_err)?,
        })
    }

    fn portfolio_from_row(row: PortfolioRow) -> Result<Portfolio> {
        Ok(Portfolio::new(
            TrackId::from(row.track_id),
            UserId::from(row.user_id),
            serde_json::from_str(&row.assets).map_err(parse_err)?,
        ))
    }
}

#[async_trait]
impl TrackStore for SqliteStore {
    async fn get(&self, id: &TrackId) -> Result<Option<Track>> {
        let mut conn = self.conn()?;
        let row: Option<TrackRow> = tracks::table
            .find(id.as_str())
            .select(TrackRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        row.map(Self::from_row).transpose()
    }

    async fn insert(&self, track: &Track) -> Result<()> {
        let row = Self::to_row(track)?;
        let mut conn = self.conn()?;
        diesel::insert_into(tracks::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(())
    }

    async fn save(&self, track: &Track) -> Result<SaveOutcome> {
        let mut next = track.clone();
        next.version += 1;
        let row = Self::to_row(&next)?;
        let expected = i64::try_from(track.version).map_err(parse_err)?;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            tracks::table
                .filter(tracks::id.eq(track.id.as_str()))
                .filter(tracks::version.eq(expected)),
        )
        .set(&row)
        .execute(&mut conn)
        .map_err(db_err)?;

        if updated == 1 {
            return Ok(SaveOutcome::Saved(next));
        }
        let exists: i64 = tracks::table
            .filter(tracks::id.eq(track.id.as_str()))
            .count()
            .get_result(&mut conn)
            .map_err(db_err)?;
        if exists == 0 {
            return Err(RaceError::TrackNotFound(track.id.clone()).into());
        }
        Ok(SaveOutcome::Stale)
    }

    async fn list_by_status(&self, status: TrackStatus) -> Result<Vec<Track>> {
        let mut conn = self.conn()?;
        let rows: Vec<TrackRow> = tracks::table
            .filter(tracks::status.eq(status.as_str()))
            .order((tracks::created_at.asc(), tracks::id.asc()))
            .select(TrackRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn find_awaiting_with_member(&self, user: &UserId) -> Result<Option<Track>> {
        // Narrow with LIKE on the JSON member list, then confirm on the
        // decoded track so ids that are substrings of others don't match.
        let needle = format!("%{}%", serde_json::to_string(user).map_err(parse_err)?);
        let mut conn = self.conn()?;
        let rows: Vec<TrackRow> = tracks::table
            .filter(tracks::status.eq(TrackStatus::Awaiting.as_str()))
            .filter(tracks::users.like(needle))
            .select(TrackRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        for row in rows {
            let track = Self::from_row(row)?;
            if track.has_member(user) {
                return Ok(Some(track));
            }
        }
        Ok(None)
    }

    async fn list(&self, limit: usize) -> Result<Vec<Track>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut conn = self.conn()?;
        let rows: Vec<TrackRow> = tracks::table
            .order((tracks::created_at.desc(), tracks::id.asc()))
            .limit(limit)
            .select(TrackRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn tracks_by_creator(&self, creator: &UserId) -> Result<Vec<Track>> {
        let mut conn = self.conn()?;
        let rows: Vec<TrackRow> = tracks::table
            .filter(tracks::creator.eq(creator.as_str()))
            .order((tracks::created_at.desc(), tracks::id.asc()))
            .select(TrackRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(Self::from_row).collect()
    }
}

#[async_trait]
impl PortfolioStore for SqliteStore {
    async fn insert(&self, portfolio: &Portfolio) -> Result<bool> {
        let row = PortfolioRow {
            track_id: portfolio.track_id.to_string(),
            user_id: portfolio.user_id.to_string(),
            assets: serde_json::to_string(&portfolio.assets).map_err(parse_err)?,
        };
        let mut conn = self.conn()?;
        let inserted = diesel::insert_or_ignore_into(portfolios::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    async fn get(&self, track_id: &TrackId, user_id: &UserId) -> Result<Option<Portfolio>> {
        let mut conn = self.conn()?;
        let row: Option<PortfolioRow> = portfolios::table
            .find((track_id.as_str(), user_id.as_str()))
            .select(PortfolioRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        row.map(Self::portfolio_from_row).transpose()
    }

    async fn list_for_track(&self, track_id: &TrackId) -> Result<Vec<Portfolio>> {
        let mut conn = self.conn()?;
        let rows: Vec<PortfolioRow> = portfolios::table
            .filter(portfolios::track_id.eq(track_id.as_str()))
            .order(portfolios::user_id.asc())
            .select(PortfolioRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(Self::portfolio_from_row).collect()
    }
}
