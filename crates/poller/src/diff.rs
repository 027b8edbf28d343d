use std::collections::HashMap;

use catalog::{Item, ItemId, PriceChange, PricedRow};

/// Tags each item of `current` with its direction against the item with the
/// same id in `previous`. Ids missing from `previous` count as unchanged.
pub fn classify(previous: &[Item], current: &[Item]) -> Vec<PricedRow> {
    let by_id: HashMap<ItemId, &Item> = previous.iter().map(|item| (item.id, item)).collect();
    current
        .iter()
        .map(|item| {
            let change = by_id
                .get(&item.id)
                .map(|prev| PriceChange::between(prev.price, item.price))
                .unwrap_or(PriceChange::Unchanged);
            PricedRow {
                item: item.clone(),
                price_change: Some(change),
            }
        })
        .collect()
}
