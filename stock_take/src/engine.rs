//! Scan and update engine
//!
//! Decides what a barcode scan does (create or increment) and validates edits
//! before they reach the item store. Every validation failure is raised before
//! the first write, so a rejected request never leaves a partial change behind.

use crate::database::{
    delete_item, find_by_barcode, find_by_id, increment_qty, insert_item, list_items, patch_item,
};
use crate::error::{Result, StockError, StoreError};
use crate::models::{Item, ItemPatch, NewItem, ScanRequest};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::{Map, Value};

/// Which details a brand new item must carry on its first scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewItemPolicy {
    /// Name, part number and location are all optional
    #[default]
    Optional,
    /// First scan must supply a name and a part number
    RequireDetails,
}

/// What a scan did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Created(Item),
    Incremented(Item),
}

impl ScanOutcome {
    /// The item as it is stored after the scan
    pub fn item(&self) -> &Item {
        match self {
            ScanOutcome::Created(item) | ScanOutcome::Incremented(item) => item,
        }
    }

    pub fn into_item(self) -> Item {
        match self {
            ScanOutcome::Created(item) | ScanOutcome::Incremented(item) => item,
        }
    }
}

/// Trimmed value, or `None` when empty or whitespace-only
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turn a scan request into the row that would be inserted for an unseen barcode
fn new_item_from_request(request: &ScanRequest, barcode: &str) -> NewItem {
    NewItem {
        barcode: barcode.to_string(),
        part_number: non_blank(request.part_number.as_deref()),
        name: non_blank(request.name.as_deref()),
        loc: non_blank(request.loc.as_deref()),
    }
}

/// Uniqueness or range failures on a scan write are the caller's to resolve
fn conflict_on_constraint(err: StoreError) -> StockError {
    match err {
        StoreError::ConstraintViolation(msg) => StockError::Conflict(msg),
        other => StockError::Store(other),
    }
}

fn check_policy(item: &NewItem, policy: NewItemPolicy) -> Result<()> {
    if policy == NewItemPolicy::RequireDetails {
        if item.name.is_none() {
            return Err(StockError::MissingRequiredField("name"));
        }
        if item.part_number.is_none() {
            return Err(StockError::MissingRequiredField("partNumber"));
        }
    }
    Ok(())
}

/// Record one scan of a barcode
///
/// An unseen barcode becomes a new item with `qty = 1`; a known barcode gets its
/// quantity incremented and every other field in the request is ignored.
///
/// The lookup and the write share one `BEGIN IMMEDIATE` transaction, so two
/// first scans of the same barcode cannot both insert: the second one waits for
/// the write lock and then sees the row.
pub fn scan(
    conn: &mut Connection,
    request: &ScanRequest,
    policy: NewItemPolicy,
) -> Result<ScanOutcome> {
    let barcode = request
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or(StockError::MissingBarcode)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::from)?;

    let outcome = match find_by_barcode(&tx, barcode)? {
        Some(_) => {
            let item = increment_qty(&tx, barcode).map_err(conflict_on_constraint)?;
            log::debug!("Scan {}: qty now {}", barcode, item.qty);
            ScanOutcome::Incremented(item)
        }
        None => {
            let new_item = new_item_from_request(request, barcode);
            check_policy(&new_item, policy)?;
            let item = insert_item(&tx, &new_item).map_err(conflict_on_constraint)?;
            log::info!("Created item {} for barcode {}", item.id, barcode);
            ScanOutcome::Created(item)
        }
    };

    tx.commit().map_err(StoreError::from)?;
    Ok(outcome)
}

/// Apply a partial edit, given as a raw field map, to an existing item
///
/// Checks run in order: the item must exist, every key must be editable and
/// every value valid, and at least one field must be given. Only then is the
/// row written.
pub fn update(conn: &Connection, id: i64, fields: &Map<String, Value>) -> Result<Item> {
    if find_by_id(conn, id)?.is_none() {
        return Err(StockError::NotFound(id));
    }

    let patch = ItemPatch::from_fields(fields)?;
    apply_patch(conn, id, &patch)
}

/// Write an already-typed patch to item `id`
pub fn apply_patch(conn: &Connection, id: i64, patch: &ItemPatch) -> Result<Item> {
    if patch.is_empty() {
        return Err(StockError::NoFieldsToUpdate);
    }

    let item = patch_item(conn, id, patch).map_err(|e| match e {
        StoreError::ConstraintViolation(msg) => StockError::Conflict(msg),
        StoreError::NotFound(id) => StockError::NotFound(id),
        other => StockError::BadRequest(other.to_string()),
    })?;

    log::debug!("Updated item {}", id);
    Ok(item)
}

/// Delete an item; succeeds whether or not it still existed
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    if delete_item(conn, id)? {
        log::info!("Deleted item {}", id);
    } else {
        log::debug!("Delete of item {}: already gone", id);
    }
    Ok(())
}

/// Every item, ordered by id
pub fn list(conn: &Connection) -> Result<Vec<Item>> {
    Ok(list_items(conn)?)
}
