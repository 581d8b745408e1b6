/// Number of fields in the fixed record schema.
pub const FIELD_COUNT: usize = 8;

/// Minimum accepted SKU length, in characters.
pub const MIN_SKU_CHARS: usize = 3;

/// A single harvested row, mapped onto the fixed schema.
///
/// All fields are textual as delivered by the source view. `item_number` is
/// the identity key; the remaining fields carry no uniqueness guarantees and
/// may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub item_number: String,
    pub cost: String,
    pub sku: String,
    pub details: String,
    pub product: String,
    pub dimensions: String,
    pub weight_kg: String,
    /// Serialized as `type`; renamed here because of the keyword.
    pub kind: String,
}

impl Record {
    /// Maps an ordered cell array onto the schema by position.
    ///
    /// Extra trailing cells are dropped; missing trailing cells become empty
    /// strings, which the validator then rejects where the field is required.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();
        Self {
            item_number: cell(0),
            cost: cell(1),
            sku: cell(2),
            details: cell(3),
            product: cell(4),
            dimensions: cell(5),
            weight_kg: cell(6),
            kind: cell(7),
        }
    }

    /// The identity key used for deduplication.
    pub fn identity(&self) -> &str {
        &self.item_number
    }

    /// Well-formedness gate for acceptance into the collection.
    ///
    /// Requires an integer `item_number` and a SKU of at least
    /// [`MIN_SKU_CHARS`] characters. Everything else may be empty.
    pub fn is_well_formed(&self) -> bool {
        if self.item_number.parse::<i64>().is_err() {
            return false;
        }
        self.sku.chars().count() >= MIN_SKU_CHARS
    }
}
