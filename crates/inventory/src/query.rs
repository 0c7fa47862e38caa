//! Item listing: filtering, sorting and pagination.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

use crate::{BrandId, CategoryId, Item, LocationId};

/// Listing filters. Absent filters match every item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilters {
    /// Case-insensitive substring of the item name or reference number.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub brand: Option<BrandId>,
    #[serde(default)]
    pub location: Option<LocationId>,
}

impl InventoryFilters {
    /// Search term, lowercased, or `None` if blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, item: &Item) -> bool {
        if let Some(term) = self.search_term() {
            let hit = item.name.to_lowercase().contains(&term)
                || item.ref_num.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }

        self.category.is_none_or(|c| c == item.category_id)
            && self.brand.is_none_or(|b| b == item.brand_id)
            && self.location.is_none_or(|l| l == item.location_id)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    RefNum,
    QtyInStock,
    ExpiryDate,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl ItemSort {
    /// Total order over items; ties are broken by id so pages are stable.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let primary = match self.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::RefNum => a.ref_num.to_lowercase().cmp(&b.ref_num.to_lowercase()),
            SortField::QtyInStock => a.qty_in_stock.cmp(&b.qty_in_stock),
            // Items without an expiry date go last.
            SortField::ExpiryDate => match (a.expiry_date, b.expiry_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };

        let ordered = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        ordered.then_with(|| a.id.cmp(&b.id))
    }
}

/// One page of a listing (0-based index).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    index: u32,
    size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    pub fn new(index: u32, size: u32) -> DomainResult<Self> {
        if size == 0 || size > Self::MAX_SIZE {
            return Err(DomainError::validation(format!(
                "page size must be between 1 and {}",
                Self::MAX_SIZE
            )));
        }
        Ok(Self { index, size })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.index) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            index: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub filters: InventoryFilters,
    pub sort: ItemSort,
    pub page: Page,
}

impl ItemQuery {
    /// Evaluate the query over an in-memory collection.
    pub fn run<'a>(&self, items: impl IntoIterator<Item = &'a Item>) -> ItemPage {
        let mut matched: Vec<&Item> = items
            .into_iter()
            .filter(|item| self.filters.matches(item))
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let total = matched.len() as u64;
        let offset = usize::try_from(self.page.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(self.page.size() as usize)
            .cloned()
            .collect();

        ItemPage {
            items,
            total,
            page_index: self.page.index(),
            page_size: self.page.size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Number of matching items across all pages.
    pub total: u64,
    pub page_index: u32,
    pub page_size: u32,
}
