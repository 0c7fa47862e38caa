use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity};

use crate::{BrandId, CategoryId, ItemId, LocationId};

/// A stock-keeping unit with its quantity on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub ref_num: String,
    pub name: String,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub location_id: LocationId,
    pub qty_in_stock: i64,
    pub unit: String,
    pub lot_num: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub pack_size: Option<i32>,
    pub remarks: Option<String>,
}

impl Item {
    /// Build an item from validated details.
    pub fn from_details(id: ItemId, details: ItemDetails) -> Self {
        Self {
            id,
            ref_num: details.ref_num,
            name: details.name,
            category_id: details.category_id,
            brand_id: details.brand_id,
            location_id: details.location_id,
            qty_in_stock: details.qty_in_stock,
            unit: details.unit,
            lot_num: details.lot_num,
            expiry_date: details.expiry_date,
            pack_size: details.pack_size,
            remarks: details.remarks,
        }
    }

    /// Replace every editable field with `details` (identity is kept).
    pub fn apply_details(&mut self, details: ItemDetails) {
        *self = Self::from_details(self.id, details);
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

/// Editable item fields, used both to create an item and to edit one.
///
/// Edits replace all fields at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub ref_num: String,
    pub name: String,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub location_id: LocationId,
    pub qty_in_stock: i64,
    pub unit: String,
    #[serde(default)]
    pub lot_num: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub pack_size: Option<i32>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl ItemDetails {
    /// Trim text fields and validate primitive ranges.
    ///
    /// Blank optional text becomes `None`.
    pub fn validated(mut self) -> DomainResult<Self> {
        self.ref_num = required_text(&self.ref_num, "ref_num")?;
        self.name = required_text(&self.name, "name")?;
        self.unit = required_text(&self.unit, "unit")?;
        self.lot_num = optional_text(self.lot_num.take());
        self.remarks = optional_text(self.remarks.take());

        if self.qty_in_stock < 0 {
            return Err(DomainError::validation("qty_in_stock cannot be negative"));
        }
        if let Some(pack_size) = self.pack_size {
            if pack_size <= 0 {
                return Err(DomainError::validation("pack_size must be positive"));
            }
        }

        Ok(self)
    }
}

fn required_text(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn details() -> ItemDetails {
        ItemDetails {
            ref_num: "REF-001".to_string(),
            name: "Flour".to_string(),
            category_id: CategoryId::new(),
            brand_id: BrandId::new(),
            location_id: LocationId::new(),
            qty_in_stock: 100,
            unit: "kg".to_string(),
            lot_num: None,
            expiry_date: None,
            pack_size: None,
            remarks: None,
        }
    }

    #[test]
    fn validated_trims_and_blanks_optional_text() {
        let d = ItemDetails {
            name: "  Flour  ".to_string(),
            lot_num: Some("   ".to_string()),
            remarks: Some(" keep dry ".to_string()),
            ..details()
        }
        .validated()
        .unwrap();

        assert_eq!(d.name, "Flour");
        assert_eq!(d.lot_num, None);
        assert_eq!(d.remarks.as_deref(), Some("keep dry"));
    }

    #[test]
    fn validated_rejects_blank_required_fields() {
        for d in [
            ItemDetails { ref_num: " ".to_string(), ..details() },
            ItemDetails { name: String::new(), ..details() },
            ItemDetails { unit: "\t".to_string(), ..details() },
        ] {
            assert!(matches!(d.validated(), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn validated_rejects_negative_stock_and_non_positive_pack_size() {
        let negative = ItemDetails { qty_in_stock: -1, ..details() };
        assert!(matches!(negative.validated(), Err(DomainError::Validation(_))));

        let zero_pack = ItemDetails { pack_size: Some(0), ..details() };
        assert!(matches!(zero_pack.validated(), Err(DomainError::Validation(_))));

        let ok_pack = ItemDetails { pack_size: Some(12), ..details() };
        assert!(ok_pack.validated().is_ok());
    }

    #[test]
    fn apply_details_keeps_identity() {
        let id = ItemId::new();
        let mut item = Item::from_details(id, details());

        item.apply_details(ItemDetails { qty_in_stock: 3, name: "Sugar".to_string(), ..details() });

        assert_eq!(item.id(), id);
        assert_eq!(item.name, "Sugar");
        assert_eq!(item.qty_in_stock, 3);
    }
}
