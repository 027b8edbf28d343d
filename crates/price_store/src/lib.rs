use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use catalog::{normalize_price, Item, ItemId};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info};

pub const DEFAULT_ITEM_COUNT: u32 = 10;

// Walk steps are drawn on a 1e-7 grid: ±500_000 * 1e-7 = ±5%.
const STEP_SCALE: u32 = 7;
const MAX_STEP_UNITS: i64 = 500_000;

// Seed prices are drawn on a 1e-5 grid over (0, 100].
const SEED_SCALE: u32 = 5;
const MAX_SEED_UNITS: i64 = 10_000_000;

/// In-memory price book shared by every request handler.
///
/// Cloning is cheap and yields another handle to the same book. The item list
/// and the random source sit behind a single mutex, so a walk and a read never
/// interleave.
#[derive(Clone)]
pub struct PriceStore {
    inner: Arc<Inner>,
}

struct Inner {
    item_count: u32,
    seed: Option<u64>,
    book: OnceLock<Mutex<Book>>,
}

struct Book {
    items: Vec<Item>,
    rng: StdRng,
}

fn item_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_COUNT, None)
    }
}

impl PriceStore {
    /// Creates an empty store. Items are seeded by [`PriceStore::initialize`]
    /// or by the first read or walk, whichever comes first.
    pub fn new(item_count: u32, seed: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Inner {
                item_count,
                seed,
                book: OnceLock::new(),
            }),
        }
    }

    /// Creates an already initialized store holding `items`.
    pub fn from_items(mut items: Vec<Item>) -> Self {
        items.sort_by_key(|item| item.id);
        let store = Self::new(item_count(items.len()), None);
        let book = Book {
            items,
            rng: StdRng::from_entropy(),
        };
        // Fresh cell, cannot already be set.
        let _ = store.inner.book.set(Mutex::new(book));
        store
    }

    /// Seeds the item list. Exactly one caller performs the seeding even when
    /// several race on a fresh store; it is the only one that gets `true`.
    pub fn initialize(&self) -> bool {
        let mut seeded = false;
        self.inner.book.get_or_init(|| {
            seeded = true;
            Mutex::new(self.inner.seed_book())
        });
        seeded
    }

    /// Copy of every item, ordered by id.
    pub fn snapshot(&self) -> Vec<Item> {
        self.lock().items.clone()
    }

    /// Moves every price by an independent step in [-5%, +5%] and returns the
    /// resulting snapshot.
    pub fn apply_random_walk(&self) -> Vec<Item> {
        let mut book = self.lock();
        let now = Utc::now();
        let Book { items, rng } = &mut *book;
        for item in items.iter_mut() {
            let step = Decimal::new(rng.gen_range(-MAX_STEP_UNITS..=MAX_STEP_UNITS), STEP_SCALE);
            item.price = normalize_price(item.price * (Decimal::ONE + step));
            item.updated_at = item.updated_at.max(now);
        }
        debug!(items = items.len(), "applied random walk");
        items.clone()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.lock().items.iter().map(|item| item.id).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Book> {
        self.inner
            .book
            .get_or_init(|| Mutex::new(self.inner.seed_book()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn seed_book(&self) -> Book {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = Utc::now();
        let items = (1..=self.item_count)
            .map(|id| {
                let units = rng.gen_range(1..=MAX_SEED_UNITS);
                Item::new(id, Decimal::new(units, SEED_SCALE), now)
            })
            .collect::<Vec<_>>();
        info!(items = items.len(), seeded = self.seed.is_some(), "price store initialized");
        Book { items, rng }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::MIN_PRICE;
    use chrono::TimeZone;
    use std::thread;

    #[test]
    fn seeds_sequential_named_items() {
        let store = PriceStore::new(10, Some(7));
        let items = store.snapshot();
        assert_eq!(items.len(), 10);
        for (idx, item) in items.iter().enumerate() {
            assert_eq!(item.id as usize, idx + 1);
            assert_eq!(item.name, format!("Item {}", idx + 1));
            assert!(item.price >= MIN_PRICE);
            assert!(item.price <= Decimal::new(100, 0));
            assert_eq!(item.price.round_dp(2), item.price);
        }
    }

    #[test]
    fn concurrent_initialization_seeds_once() {
        let store = PriceStore::new(10, None);
        let results = thread::scope(|scope| {
            let handles = (0..16)
                .map(|_| {
                    let store = store.clone();
                    scope.spawn(move || {
                        let seeded = store.initialize();
                        (seeded, store.snapshot())
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().expect("init thread panicked"))
                .collect::<Vec<_>>()
        });

        assert_eq!(results.iter().filter(|(seeded, _)| *seeded).count(), 1);
        let first = &results[0].1;
        for (_, snapshot) in &results {
            assert_eq!(snapshot, first);
        }
        assert!(!store.initialize(), "re-initialization must be a no-op");
        assert_eq!(&store.snapshot(), first);
    }

    #[test]
    fn walk_keeps_prices_positive_and_in_cents() {
        let store = PriceStore::new(10, Some(42));
        for _ in 0..500 {
            for item in store.apply_random_walk() {
                assert!(item.price >= MIN_PRICE, "price {} under floor", item.price);
                assert_eq!(item.price.round_dp(2), item.price);
            }
        }
    }

    #[test]
    fn walk_moves_at_most_five_percent() {
        let store = PriceStore::new(10, Some(3));
        let before = store.snapshot();
        let after = store.apply_random_walk();
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.id, new.id);
            let bound = (old.price * Decimal::new(5, 2)).round_dp(2) + Decimal::new(1, 2);
            assert!((new.price - old.price).abs() <= bound);
        }
    }

    #[test]
    fn floor_holds_for_cheapest_item() {
        let now = Utc::now();
        let store = PriceStore::from_items(vec![Item::new(1, MIN_PRICE, now)]);
        for _ in 0..200 {
            let price = store.apply_random_walk()[0].price;
            assert!(price >= MIN_PRICE);
            assert!(price < Decimal::new(5, 2));
        }
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let future = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let store = PriceStore::from_items(vec![
            Item::new(1, Decimal::new(1099, 2), future),
            Item::new(2, Decimal::new(2050, 2), Utc::now()),
        ]);
        let before = store.snapshot();
        let after = store.apply_random_walk();
        for (old, new) in before.iter().zip(&after) {
            assert!(new.updated_at >= old.updated_at);
        }
        assert_eq!(after[0].updated_at, future);
    }

    #[test]
    fn membership_is_fixed() {
        let store = PriceStore::new(5, None);
        let ids = store.ids();
        for _ in 0..10 {
            store.apply_random_walk();
        }
        assert_eq!(store.ids(), ids);
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn same_seed_same_walk() {
        let a = PriceStore::new(10, Some(99));
        let b = PriceStore::new(10, Some(99));
        let prices = |items: Vec<Item>| items.into_iter().map(|i| i.price).collect::<Vec<_>>();
        assert_eq!(prices(a.snapshot()), prices(b.snapshot()));
        assert_eq!(prices(a.apply_random_walk()), prices(b.apply_random_walk()));
    }

    #[test]
    fn from_items_orders_by_id() {
        let now = Utc::now();
        let store = PriceStore::from_items(vec![
            Item::new(2, Decimal::new(2050, 2), now),
            Item::new(1, Decimal::new(1099, 2), now),
        ]);
        assert!(!store.initialize());
        assert_eq!(store.ids(), vec![1, 2]);
    }

    #[test]
    fn item_count_saturates() {
        assert_eq!(item_count(3), 3);
        assert_eq!(item_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn readers_never_observe_a_partial_walk() {
        let store = PriceStore::new(25, None);
        store.initialize();
        thread::scope(|scope| {
            for _ in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let walked = store.apply_random_walk();
                        let stamp = walked[0].updated_at;
                        assert!(walked.iter().all(|item| item.updated_at == stamp));
                    }
                });
            }
            for _ in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let seen = store.snapshot();
                        let stamp = seen[0].updated_at;
                        assert!(seen.iter().all(|item| item.updated_at == stamp));
                    }
                });
            }
        });
    }
}
