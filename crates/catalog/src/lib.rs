use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Lowest price any item may carry after a mutation.
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub const PRICE_SCALE: u32 = 2;

pub type ItemId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(id: ItemId, price: Decimal, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: format!("Item {id}"),
            price: normalize_price(price),
            updated_at,
        }
    }
}

/// Rounds to cents (half to even) and lifts the result to [`MIN_PRICE`].
pub fn normalize_price(price: Decimal) -> Decimal {
    price
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven)
        .max(MIN_PRICE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceChange {
    Up,
    Down,
    Unchanged,
}

impl PriceChange {
    pub fn between(previous: Decimal, current: Decimal) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => PriceChange::Up,
            std::cmp::Ordering::Less => PriceChange::Down,
            std::cmp::Ordering::Equal => PriceChange::Unchanged,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            PriceChange::Up => "▲",
            PriceChange::Down => "▼",
            PriceChange::Unchanged => "",
        }
    }
}

/// An item as shown to the user. `price_change` stays empty until the first
/// update cycle after subscribing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedRow {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change: Option<PriceChange>,
}

impl PricedRow {
    pub fn untagged(item: Item) -> Self {
        Self {
            item,
            price_change: None,
        }
    }
}
