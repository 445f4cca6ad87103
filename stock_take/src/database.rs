//! Item store: SQLite schema and row-level primitives
//!
//! Uses parameterized queries exclusively (no SQL string concatenation of values).
//! Uniqueness of barcodes and part numbers and `qty >= 0` are enforced by the
//! schema itself, so every writer is held to them.

use crate::error::{StoreError, StoreResult};
use crate::models::{Item, ItemPatch, NewItem};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const ITEM_COLUMNS: &str = "id, barcode, part_number, name, qty, loc";

/// Open (or create) the database file and initialize the schema
///
/// `busy_timeout` bounds how long a write waits on a lock held by another connection.
pub fn open_database(path: &Path, busy_timeout: Duration) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Initialize the database schema
///
/// - `items`: one row per distinct barcode. AUTOINCREMENT keeps ids from being reused
///   after a delete. `qty` must stay an integer, so `qty + 1` overflowing into a REAL
///   is rejected instead of stored.
/// - Part numbers are unique, except for the `-` marker of an explicitly blanked field.
pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS items (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            barcode     TEXT NOT NULL UNIQUE,
            part_number TEXT,
            name        TEXT,
            qty         INTEGER NOT NULL DEFAULT 0
                        CHECK (qty >= 0 AND typeof(qty) = 'integer'),
            loc         TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_items_part_number
            ON items(part_number) WHERE part_number <> '-';
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        barcode: row.get(1)?,
        part_number: row.get(2)?,
        name: row.get(3)?,
        qty: row.get(4)?,
        loc: row.get(5)?,
    })
}

/// Get an item by its barcode
pub fn find_by_barcode(conn: &Connection, barcode: &str) -> StoreResult<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE barcode = ?1"),
            params![barcode],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Get an item by id
pub fn find_by_id(conn: &Connection, id: i64) -> StoreResult<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Insert a new item with `qty = 1`
///
/// Fails with [`StoreError::ConstraintViolation`] if the barcode or part number is taken.
pub fn insert_item(conn: &Connection, item: &NewItem) -> StoreResult<Item> {
    let inserted = conn.query_row(
        &format!(
            "INSERT INTO items (barcode, part_number, name, qty, loc)
             VALUES (?1, ?2, ?3, 1, ?4)
             RETURNING {ITEM_COLUMNS}"
        ),
        params![item.barcode, item.part_number, item.name, item.loc],
        item_from_row,
    )?;
    Ok(inserted)
}

/// Add one to the quantity of the item with this barcode
///
/// Single statement, so concurrent increments never lose a count. At `i64::MAX`
/// this fails with [`StoreError::ConstraintViolation`].
pub fn increment_qty(conn: &Connection, barcode: &str) -> StoreResult<Item> {
    conn.query_row(
        &format!("UPDATE items SET qty = qty + 1 WHERE barcode = ?1 RETURNING {ITEM_COLUMNS}"),
        params![barcode],
        item_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::UnknownBarcode(barcode.to_string()))
}

/// Apply the columns present in `patch` to item `id` and return the updated row
pub fn patch_item(conn: &Connection, id: i64, patch: &ItemPatch) -> StoreResult<Item> {
    // Column names come from ItemField, never from the request
    let text_values: Vec<(&'static str, Option<&str>)> = patch
        .text_edits()
        .map(|(field, edit)| (field.column(), edit.as_column()))
        .collect();

    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<&dyn ToSql> = Vec::new();
    for (column, value) in &text_values {
        values.push(value);
        assignments.push(format!("{} = ?{}", column, values.len()));
    }
    if let Some(qty) = &patch.qty {
        values.push(qty);
        assignments.push(format!("qty = ?{}", values.len()));
    }

    if assignments.is_empty() {
        return find_by_id(conn, id)?.ok_or(StoreError::NotFound(id));
    }

    values.push(&id);
    let sql = format!(
        "UPDATE items SET {} WHERE id = ?{} RETURNING {ITEM_COLUMNS}",
        assignments.join(", "),
        values.len()
    );

    conn.query_row(&sql, values.as_slice(), item_from_row)
        .optional()?
        .ok_or(StoreError::NotFound(id))
}

/// Delete an item by id
///
/// Returns whether a row was removed; deleting a missing id is not an error.
pub fn delete_item(conn: &Connection, id: i64) -> StoreResult<bool> {
    let removed = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// All items ordered by id
pub fn list_items(conn: &Connection) -> StoreResult<Vec<Item>> {
    let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))?;
    let items = stmt
        .query_map([], item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Get total count of items in database
pub fn item_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?)
}

#[cfg(test)]
pub use tests::new_item;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextEdit;

    /// Create an in-memory database for testing
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    /// New item with only a barcode and an optional part number
    pub fn new_item(barcode: &str, part_number: Option<&str>) -> NewItem {
        NewItem {
            barcode: barcode.to_string(),
            part_number: part_number.map(str::to_string),
            ..NewItem::default()
        }
    }

    #[test]
    fn init_schema_creates_table() {
        let conn = test_db();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='items'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = test_db();
        insert_item(&conn, &new_item("A1", None)).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(item_count(&conn).unwrap(), 1);
    }

    #[test]
    fn insert_sets_qty_one_and_fields() {
        let conn = test_db();
        let item = insert_item(
            &conn,
            &NewItem {
                barcode: "A1".to_string(),
                part_number: Some("P-1".to_string()),
                name: Some("Widget".to_string()),
                loc: None,
            },
        )
        .unwrap();

        assert_eq!(item.qty, 1);
        assert_eq!(item.barcode, "A1");
        assert_eq!(item.part_number.as_deref(), Some("P-1"));
        assert_eq!(item.name.as_deref(), Some("Widget"));
        assert!(item.loc.is_none());
        assert_eq!(find_by_barcode(&conn, "A1").unwrap(), Some(item.clone()));
        assert_eq!(find_by_id(&conn, item.id).unwrap(), Some(item));
    }

    #[test]
    fn insert_duplicate_barcode_is_constraint_violation() {
        let conn = test_db();
        insert_item(&conn, &new_item("A1", None)).unwrap();
        let err = insert_item(&conn, &new_item("A1", None)).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[test]
    fn insert_duplicate_part_number_is_constraint_violation() {
        let conn = test_db();
        insert_item(&conn, &new_item("A1", Some("P-1"))).unwrap();
        let err = insert_item(&conn, &new_item("B2", Some("P-1"))).unwrap_err();
        match err {
            StoreError::ConstraintViolation(msg) => assert!(msg.contains("part_number")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(item_count(&conn).unwrap(), 1);
    }

    #[test]
    fn missing_part_numbers_do_not_collide() {
        let conn = test_db();
        insert_item(&conn, &new_item("A1", None)).unwrap();
        insert_item(&conn, &new_item("B2", None)).unwrap();
        insert_item(&conn, &new_item("C3", Some("-"))).unwrap();
        insert_item(&conn, &new_item("D4", Some("-"))).unwrap();
        assert_eq!(item_count(&conn).unwrap(), 4);
    }

    #[test]
    fn increment_adds_one() {
        let conn = test_db();
        let first = insert_item(&conn, &new_item("A1", None)).unwrap();
        let second = increment_qty(&conn, "A1").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.qty, 2);
    }

    #[test]
    fn increment_unknown_barcode_errors() {
        let conn = test_db();
        let err = increment_qty(&conn, "nope").unwrap_err();
        assert!(matches!(err, StoreError::UnknownBarcode(ref b) if b == "nope"));
    }

    #[test]
    fn patch_applies_only_given_columns() {
        let conn = test_db();
        let item = insert_item(
            &conn,
            &NewItem {
                barcode: "A1".to_string(),
                name: Some("Widget".to_string()),
                ..NewItem::default()
            },
        )
        .unwrap();

        let patch = ItemPatch {
            loc: Some(TextEdit::Set("Bay3".to_string())),
            qty: Some(10),
            ..ItemPatch::default()
        };
        let updated = patch_item(&conn, item.id, &patch).unwrap();

        assert_eq!(updated.loc.as_deref(), Some("Bay3"));
        assert_eq!(updated.qty, 10);
        assert_eq!(updated.name.as_deref(), Some("Widget"));
        assert_eq!(updated.barcode, "A1");
    }

    #[test]
    fn patch_writes_blank_marker_and_null() {
        let conn = test_db();
        let item = insert_item(&conn, &new_item("A1", Some("P-1"))).unwrap();

        let patch = ItemPatch {
            name: Some(TextEdit::Blank),
            part_number: Some(TextEdit::Null),
            ..ItemPatch::default()
        };
        let updated = patch_item(&conn, item.id, &patch).unwrap();
        assert_eq!(updated.name.as_deref(), Some("-"));
        assert!(updated.part_number.is_none());
    }

    #[test]
    fn patch_missing_id_is_not_found() {
        let conn = test_db();
        let patch = ItemPatch {
            qty: Some(1),
            ..ItemPatch::default()
        };
        let err = patch_item(&conn, 42, &patch).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[test]
    fn patch_duplicate_part_number_is_constraint_violation() {
        let conn = test_db();
        insert_item(&conn, &new_item("A1", Some("P-1"))).unwrap();
        let second = insert_item(&conn, &new_item("B2", Some("P-2"))).unwrap();

        let patch = ItemPatch {
            part_number: Some(TextEdit::Set("P-1".to_string())),
            ..ItemPatch::default()
        };
        let err = patch_item(&conn, second.id, &patch).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert_eq!(
            find_by_id(&conn, second.id).unwrap().unwrap().part_number.as_deref(),
            Some("P-2")
        );
    }

    #[test]
    fn negative_qty_rejected_by_schema() {
        let conn = test_db();
        let item = insert_item(&conn, &new_item("A1", None)).unwrap();
        let patch = ItemPatch {
            qty: Some(-5),
            ..ItemPatch::default()
        };
        let err = patch_item(&conn, item.id, &patch).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert_eq!(find_by_id(&conn, item.id).unwrap().unwrap().qty, 1);
    }

    #[test]
    fn increment_at_max_qty_is_constraint_violation() {
        let conn = test_db();
        let item = insert_item(&conn, &new_item("A1", None)).unwrap();
        let patch = ItemPatch {
            qty: Some(i64::MAX),
            ..ItemPatch::default()
        };
        patch_item(&conn, item.id, &patch).unwrap();

        let err = increment_qty(&conn, "A1").unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert_eq!(find_by_id(&conn, item.id).unwrap().unwrap().qty, i64::MAX);
    }

    #[test]
    fn delete_is_idempotent() {
        let conn = test_db();
        let item = insert_item(&conn, &new_item("A1", None)).unwrap();
        assert!(delete_item(&conn, item.id).unwrap());
        assert!(!delete_item(&conn, item.id).unwrap());
        assert!(find_by_id(&conn, item.id).unwrap().is_none());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let conn = test_db();
        let first = insert_item(&conn, &new_item("A1", None)).unwrap();
        delete_item(&conn, first.id).unwrap();
        let again = insert_item(&conn, &new_item("A1", None)).unwrap();
        assert!(again.id > first.id);
    }

    #[test]
    fn list_items_orders_by_id() {
        let conn = test_db();
        assert!(list_items(&conn).unwrap().is_empty());

        for barcode in ["C", "A", "B"] {
            insert_item(&conn, &new_item(barcode, None)).unwrap();
        }
        let barcodes: Vec<String> = list_items(&conn)
            .unwrap()
            .into_iter()
            .map(|i| i.barcode)
            .collect();
        assert_eq!(barcodes, vec!["C", "A", "B"]);
    }

    #[test]
    fn open_database_creates_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("stock.db");
        let conn = open_database(&path, Duration::from_millis(100)).unwrap();
        insert_item(&conn, &new_item("A1", None)).unwrap();
        drop(conn);

        let conn = open_database(&path, Duration::from_millis(100)).unwrap();
        assert_eq!(item_count(&conn).unwrap(), 1);
    }
}
