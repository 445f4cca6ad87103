//! Item records and the request payloads that create or edit them

use crate::error::StockError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored marker for a text field the user explicitly blanked
///
/// Exempt from part-number uniqueness: any number of items may have a blanked
/// part number at once.
pub const CLEARED: &str = "-";

/// One counted stock item, as stored and as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub barcode: String,
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub qty: i64,
    pub loc: Option<String>,
}

/// Body of a scan request
///
/// `name`, `part_number` and `loc` only matter when the barcode is new.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub loc: Option<String>,
}

impl ScanRequest {
    /// Scan request carrying only a barcode
    pub fn barcode(barcode: &str) -> Self {
        Self {
            barcode: Some(barcode.to_string()),
            ..Self::default()
        }
    }
}

/// Validated fields for inserting a brand new item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub barcode: String,
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub loc: Option<String>,
}

/// Change to a single optional text column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    /// Store this value
    Set(String),
    /// Explicitly blanked by the user, persisted as [`CLEARED`]
    Blank,
    /// Back to never-set (NULL)
    Null,
}

impl TextEdit {
    /// Interpret a JSON value sent for a text field.
    ///
    /// Whitespace-only strings are blanks; other scalars are stored as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => TextEdit::Null,
            Value::String(s) if s.trim().is_empty() => TextEdit::Blank,
            Value::String(s) => TextEdit::Set(s.clone()),
            other => TextEdit::Set(other.to_string()),
        }
    }

    /// Value written to the column
    pub fn as_column(&self) -> Option<&str> {
        match self {
            TextEdit::Set(s) => Some(s.as_str()),
            TextEdit::Blank => Some(CLEARED),
            TextEdit::Null => None,
        }
    }
}

/// Editable columns of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    PartNumber,
    Name,
    Qty,
    Loc,
}

impl ItemField {
    /// Field name used in request bodies
    pub fn key(&self) -> &'static str {
        match self {
            ItemField::PartNumber => "partNumber",
            ItemField::Name => "name",
            ItemField::Qty => "qty",
            ItemField::Loc => "loc",
        }
    }

    /// Column name in the `items` table
    pub fn column(&self) -> &'static str {
        match self {
            ItemField::PartNumber => "part_number",
            ItemField::Name => "name",
            ItemField::Qty => "qty",
            ItemField::Loc => "loc",
        }
    }

    /// Look up an editable field by its request key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "partNumber" => Some(ItemField::PartNumber),
            "name" => Some(ItemField::Name),
            "qty" => Some(ItemField::Qty),
            "loc" => Some(ItemField::Loc),
            _ => None,
        }
    }
}

/// Partial edit of an item; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub part_number: Option<TextEdit>,
    pub name: Option<TextEdit>,
    pub qty: Option<i64>,
    pub loc: Option<TextEdit>,
}

impl ItemPatch {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.part_number.is_none() && self.name.is_none() && self.qty.is_none() && self.loc.is_none()
    }

    /// Build a patch from an arbitrary JSON field map.
    ///
    /// All keys are checked against the editable fields before any value is
    /// looked at, so an unknown key wins over a bad value elsewhere in the map.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, StockError> {
        let known = fields
            .iter()
            .map(|(key, value)| {
                ItemField::from_key(key)
                    .map(|field| (field, value))
                    .ok_or_else(|| StockError::InvalidField(key.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut patch = ItemPatch::default();
        for (field, value) in known {
            match field {
                ItemField::Qty => patch.qty = Some(parse_qty(value)?),
                ItemField::PartNumber => patch.part_number = Some(TextEdit::from_json(value)),
                ItemField::Name => patch.name = Some(TextEdit::from_json(value)),
                ItemField::Loc => patch.loc = Some(TextEdit::from_json(value)),
            }
        }

        Ok(patch)
    }

    /// Text columns that are part of this patch
    pub fn text_edits(&self) -> impl Iterator<Item = (ItemField, &TextEdit)> {
        [
            (ItemField::PartNumber, self.part_number.as_ref()),
            (ItemField::Name, self.name.as_ref()),
            (ItemField::Loc, self.loc.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, edit)| edit.map(|e| (field, e)))
    }
}

/// Accept only whole, non-negative JSON numbers (no string coercion)
fn parse_qty(value: &Value) -> Result<i64, StockError> {
    let invalid = || StockError::InvalidQty(value.to_string());
    let Value::Number(n) = value else {
        return Err(invalid());
    };

    let qty = match n.as_i64() {
        Some(q) => q,
        None => match n.as_f64() {
            // i64::MAX as f64 rounds up to 2^63, which would saturate
            Some(f) if f.fract() == 0.0 && f >= 0.0 && f < i64::MAX as f64 => f as i64,
            _ => return Err(invalid()),
        },
    };

    if qty < 0 {
        return Err(invalid());
    }
    Ok(qty)
}
