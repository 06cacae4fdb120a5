use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqliteQueryResult;
use sqlx::{Row, Sqlite, SqlitePool};

use crate::records::{Evaluation, PositionRecord};
use crate::store::CanonicalStore;

/// SQLite persistence for the canonical store. Rows are append-only; the
/// single permitted mutation is flipping the `superseded` status tag.

pub const DB_URL: &str = "sqlite://dfrc.db";
pub const RECORD_TABLE: &str = "canonical_records";

pub async fn create_db_if_not_exists(url: &str) -> SqlitePool {
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        println!("Creating Database {}", url);

        match Sqlite::create_database(url).await {
            Ok(_) => println!("Succesfully created DB"),
            Err(error) => panic!("Failed to create DB {}", error),
        }
    } else {
        println!("Existing Database found");
    }

    SqlitePool::connect(url).await.expect("failed to connect to DB")
}

pub async fn create_tables_if_not_exists(db: &SqlitePool) -> Result<(), sqlx::Error> {
    // position_id, setups, evaluation fields, contributor, submitted_at, validator, symmetry metadata, superseded flag
    sqlx::query(&format!(r"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY NOT NULL,
            position_id INTEGER NOT NULL,
            white TEXT NOT NULL,
            black TEXT NOT NULL,
            cp INTEGER,
            mate INTEGER,
            depth INTEGER NOT NULL,
            pv TEXT NOT NULL,
            contributor TEXT NOT NULL,
            submitted_at INTEGER NOT NULL,
            validator TEXT,
            mirrored INTEGER NOT NULL,
            flipped INTEGER NOT NULL,
            superseded INTEGER NOT NULL
        );
    ", RECORD_TABLE)).execute(db).await?;

    Ok(())
}

#[derive(Clone, Debug)]
pub struct RecordRow {
    pub position_id: i64,
    pub white: String,
    pub black: String,
    pub cp: Option<i64>,
    pub mate: Option<i32>,
    pub depth: u32,
    pub pv: String,
    pub contributor: String,
    pub submitted_at: i64,
    pub validator: Option<String>,
    pub mirrored: bool,
    pub flipped: bool,
    pub superseded: bool,
}

impl RecordRow {
    pub fn from_record(record: &PositionRecord, superseded: bool) -> RecordRow {
        let mirrored = record.white == record.black;
        let flipped = record.white.chars().rev().eq(record.black.chars());

        RecordRow {
            position_id: record.position_id as i64,
            white: record.white.clone(),
            black: record.black.clone(),
            cp: record.evaluation.cp,
            mate: record.evaluation.mate,
            depth: record.evaluation.depth,
            pv: record.evaluation.pv.join(" "),
            contributor: record.contributor.clone(),
            submitted_at: record.submitted_at,
            validator: record.validator.clone(),
            mirrored,
            flipped,
            superseded,
        }
    }

    pub async fn insert(&self, db: &SqlitePool, table_name: &str) -> Result<SqliteQueryResult, sqlx::Error> {
        let result = sqlx::query(&format!(r"
            INSERT INTO {} (
                position_id,
                white,
                black,
                cp,
                mate,
                depth,
                pv,
                contributor,
                submitted_at,
                validator,
                mirrored,
                flipped,
                superseded
            ) VALUES (
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?,
                ?
            );
        ", table_name))
            .bind(self.position_id)
            .bind(self.white.clone())
            .bind(self.black.clone())
            .bind(self.cp)
            .bind(self.mate)
            .bind(self.depth)
            .bind(self.pv.clone())
            .bind(self.contributor.clone())
            .bind(self.submitted_at)
            .bind(self.validator.clone())
            .bind(self.mirrored as u32)
            .bind(self.flipped as u32)
            .bind(self.superseded as u32)
            .execute(db)
            .await?;

        Ok(result)
    }
}

/// Flips the superseded tag on every row of a position except the current
/// winner. The winner is identified by contributor and timestamp since row
/// payloads carry no other identity.
pub async fn mark_superseded_except(
    db: &SqlitePool,
    table_name: &str,
    position_id: i64,
    winner_contributor: &str,
    winner_submitted_at: i64,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(&format!(r"
        UPDATE {}
        SET superseded = 1
        WHERE position_id = ? AND NOT (contributor = ? AND submitted_at = ?);
    ", table_name))
        .bind(position_id)
        .bind(winner_contributor.to_string())
        .bind(winner_submitted_at)
        .execute(db)
        .await
}

/// Rebuilds the in-memory snapshot from the persisted rows, in append order.
pub async fn load_store(db: &SqlitePool, table_name: &str) -> Result<CanonicalStore, sqlx::Error> {
    let rows = sqlx::query(&format!(r"
        SELECT position_id, white, black, cp, mate, depth, pv, contributor, submitted_at, validator, superseded
        FROM {}
        ORDER BY id;
    ", table_name))
        .fetch_all(db)
        .await?;

    let mut store = CanonicalStore::new();
    for row in rows {
        let pv: String = row.try_get("pv")?;
        let pv = if pv.is_empty() {
            Vec::new()
        } else {
            pv.split(' ').map(|uci_move| uci_move.to_string()).collect()
        };

        let record = PositionRecord {
            position_id: row.try_get::<i64, _>("position_id")? as u64,
            white: row.try_get("white")?,
            black: row.try_get("black")?,
            evaluation: Evaluation {
                cp: row.try_get("cp")?,
                mate: row.try_get("mate")?,
                depth: row.try_get("depth")?,
                pv,
            },
            contributor: row.try_get("contributor")?,
            submitted_at: row.try_get("submitted_at")?,
            validator: row.try_get("validator")?,
        };

        let superseded: bool = row.try_get::<u32, _>("superseded")? != 0;
        if superseded {
            store.insert_superseded(record);
        } else {
            store.insert_accepted(record);
        }
    }

    Ok(store)
}
