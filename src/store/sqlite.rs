//! SQLite-backed portal store.
//!
//! Backs the [`PortalStore`](super::PortalStore) contract with a single
//! database file at `{root_dir}/wallboard.db`. The portal CRUD side writes
//! through the same file; this service only reads collections and applies
//! partial card updates.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::DateTime;
use rusqlite::{Connection, params};

use super::schema::{apply_schema, read_schema_version};
use super::types::{Card, CardPatch, Category, Contact, Task};

/// Database filename within the portal data directory.
const DB_FILENAME: &str = "wallboard.db";

/// SQLite-backed store.
///
/// Thread-safe via an internal `Mutex<Connection>`. All writes are
/// serialized; reads can proceed concurrently with WAL mode on the SQLite
/// side, though we still acquire the mutex for simplicity.
pub struct SqliteStore {
    root: PathBuf,
    conn: Mutex<Connection>,
}

/// Errors local to the SQLite store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

impl SqliteStore {
    /// Open (or create) the database at `{root_dir}/wallboard.db`.
    ///
    /// Applies the schema if the database is new.
    pub fn new(root_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let db_path = root_dir.join(DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        apply_schema(&conn)?;
        Ok(Self {
            root: root_dir.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    /// Returns the data directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// List all cards ordered by id.
    pub fn all_cards(&self) -> Result<Vec<Card>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, subtitle, image, schedule_entries FROM cards ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_card)?;

        let mut cards = Vec::new();
        for r in rows {
            cards.push(r?);
        }
        Ok(cards)
    }

    /// Fetch one card by id.
    pub fn card(&self, id: i64) -> Result<Option<Card>, StoreError> {
        let conn = self.lock()?;
        fetch_card(&conn, id)
    }

    /// Apply a partial update to a card.
    ///
    /// Only the fields present in the patch are written; `schedule_entries`
    /// can be cleared to NULL independently of `image`. Returns the updated
    /// card, or `None` when no card has that id.
    pub fn apply_card_patch(&self, id: i64, patch: &CardPatch) -> Result<Option<Card>, StoreError> {
        let conn = self.lock()?;

        let changed = match (&patch.image, &patch.schedule_entries) {
            (None, None) => {
                // Nothing to write; report the current row.
                return fetch_card(&conn, id);
            }
            (Some(image), None) => conn.execute(
                "UPDATE cards SET image = ?1 WHERE id = ?2",
                params![image, id],
            )?,
            (None, Some(blob)) => conn.execute(
                "UPDATE cards SET schedule_entries = ?1 WHERE id = ?2",
                params![blob, id],
            )?,
            (Some(image), Some(blob)) => conn.execute(
                "UPDATE cards SET image = ?1, schedule_entries = ?2 WHERE id = ?3",
                params![image, blob, id],
            )?,
        };

        if changed == 0 {
            return Ok(None);
        }
        fetch_card(&conn, id)
    }

    /// List all tasks ordered by id.
    pub fn all_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, title, done, category_id, due_date FROM tasks ORDER BY id")?;
        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for r in rows {
            tasks.push(r?);
        }
        Ok(tasks)
    }

    /// List all categories ordered by id.
    pub fn all_categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut categories = Vec::new();
        for r in rows {
            categories.push(r?);
        }
        Ok(categories)
    }

    /// List all contacts ordered by id.
    pub fn all_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, department, phone, email FROM contacts ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Contact {
                id: row.get(0)?,
                name: row.get(1)?,
                department: row.get(2)?,
                phone: row.get(3)?,
                email: row.get(4)?,
            })
        })?;

        let mut contacts = Vec::new();
        for r in rows {
            contacts.push(r?);
        }
        Ok(contacts)
    }

    /// Insert a card row. Used by fixtures and the portal CRUD side.
    pub fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cards (id, title, subtitle, image, schedule_entries) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                card.id,
                card.title,
                card.subtitle,
                card.image,
                card.schedule_entries
            ],
        )?;
        Ok(())
    }

    /// Insert a task row.
    pub fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, title, done, category_id, due_date) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id,
                task.title,
                task.done,
                task.category_id,
                task.due_date.map(|d| d.timestamp_millis())
            ],
        )?;
        Ok(())
    }

    /// Insert a category row.
    pub fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO categories (id, name) VALUES (?1, ?2)",
            params![category.id, category.name],
        )?;
        Ok(())
    }

    /// Insert a contact row.
    pub fn insert_contact(&self, contact: &Contact) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contacts (id, name, department, phone, email) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                contact.id,
                contact.name,
                contact.department,
                contact.phone,
                contact.email
            ],
        )?;
        Ok(())
    }

    /// Acquire the connection mutex.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn fetch_card(conn: &Connection, id: i64) -> Result<Option<Card>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, subtitle, image, schedule_entries FROM cards WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![id], row_to_card)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

fn row_to_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        image: row.get(3)?,
        schedule_entries: row.get(4)?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let due_ms: Option<i64> = row.get(4)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        done: row.get(2)?,
        category_id: row.get(3)?,
        due_date: due_ms.and_then(DateTime::from_timestamp_millis),
    })
}
