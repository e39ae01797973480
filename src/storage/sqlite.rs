use crate::model::{ProductObservation, StorageError};
use crate::storage::ObservationStore;
use crate::utils::truncate_chars;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

/// Longest part number / site name kept; anything beyond is cut off.
pub const MAX_TEXT_LEN: usize = 63;

/// Whether a session may change data. Read sessions never commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Read,
    Write,
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file and creates the schema if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        // observed_date is the processing date (UTC), not the submission date.
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_id TEXT NOT NULL UNIQUE,
                part_number TEXT,
                price INTEGER,
                observed_date TEXT NOT NULL,
                site TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Runs `f` inside a transaction. Commits only for a successful write
    /// session; every other exit path rolls back when the transaction drops.
    pub fn session<T>(
        &self,
        mode: SessionMode,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(value) => {
                if mode == SessionMode::Write {
                    tx.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                warn!("Rolling back {:?} session: {}", mode, e);
                Err(e)
            }
        }
    }

    /// Looks up one observation by submission id.
    pub fn get(&self, submission_id: &str) -> Result<Option<ProductObservation>, StorageError> {
        self.session(SessionMode::Read, |tx| {
            let row = tx
                .query_row(
                    "SELECT submission_id, part_number, price, observed_date, site
                     FROM observations WHERE submission_id = ?1",
                    params![submission_id],
                    |row| {
                        Ok(ProductObservation {
                            submission_id: row.get(0)?,
                            part_number: row.get(1)?,
                            price: row.get(2)?,
                            observed_date: row.get::<_, NaiveDate>(3)?,
                            site_name: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.session(SessionMode::Read, |tx| {
            let n: i64 = tx.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }
}

impl ObservationStore for SqliteStorage {
    fn exists(&self, submission_id: &str) -> Result<bool, StorageError> {
        self.session(SessionMode::Read, |tx| {
            let mut stmt = tx.prepare("SELECT 1 FROM observations WHERE submission_id = ?1")?;
            let mut rows = stmt.query(params![submission_id])?;
            Ok(rows.next()?.is_some())
        })
    }

    fn insert(&self, obs: &ProductObservation) -> Result<(), StorageError> {
        let part_number = obs.part_number.as_deref().map(|p| truncate_chars(p, MAX_TEXT_LEN));
        let site = truncate_chars(&obs.site_name, MAX_TEXT_LEN);

        self.session(SessionMode::Write, |tx| {
            tx.execute(
                "INSERT INTO observations (submission_id, part_number, price, observed_date, site)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&obs.submission_id, part_number, obs.price, obs.observed_date, site],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => {
                    StorageError::Duplicate(obs.submission_id.clone())
                }
                _ => StorageError::Database(e),
            })?;
            Ok(())
        })?;

        debug!("Stored observation {:?}", obs);
        info!("written to db");
        Ok(())
    }
}
