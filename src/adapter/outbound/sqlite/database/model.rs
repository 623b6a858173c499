//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{portfolios, tracks};

/// Database row for a track.
///
/// Players, members and final standings are stored as JSON text.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = tracks)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackRow {
    pub id: String,
    pub bet_amount: String,
    pub kind: String,
    pub creator: Option<String>,
    pub status: String,
    pub num_players: i32,
    pub max_players: i32,
    pub start_at: i64,
    pub end_at: i64,
    pub duration: i64,
    pub created_at: i64,
    pub users: String,
    pub players: String,
    pub winners: String,
    pub version: i64,
}

/// Database row for a portfolio.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioRow {
    pub track_id: String,
    pub user_id: String,
    pub assets: String,
}
