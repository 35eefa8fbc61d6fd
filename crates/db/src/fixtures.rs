use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use aura_core::domain::action::{ActionKind, TrackedAction};
use aura_core::domain::product::{Product, ProductId};
use aura_core::domain::user::Credentials;

use crate::connection::DbPool;
use crate::repositories::{
    ProductRepository, RepositoryError, SqlEventLog, SqlProductRepository, SqlUserRepository,
    UserRepository,
};

pub const DEFAULT_SEED: u64 = 42;

const DEMO_USER_COUNT: usize = 10;
const DEMO_PASSWORD: &str = "password123";
const MIN_ACTIONS_PER_USER: usize = 5;
const MAX_ACTIONS_PER_USER: usize = 15;

struct CatalogEntry {
    id: &'static str,
    name: &'static str,
    tagline: &'static str,
    description: &'static str,
    long_description: &'static str,
    price: i64,
    category: &'static str,
    image_url: &'static str,
    features: &'static [&'static str],
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "p1",
        name: "Aura Harmony",
        tagline: "Listen naturally.",
        description: "Audio that feels like the open air. Warm acoustic fabric over a recycled sandstone composite frame.",
        long_description: "Open-air drivers sit inside a breathable acoustic fabric that adapts to your temperature. The headband is cast from a recycled sandstone composite that stays cool to the touch.",
        price: 429,
        category: "Audio",
        image_url: "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?auto=format&fit=crop&q=80&w=1000",
        features: &["Organic Noise Cancellation", "50h Battery", "Natural Soundstage"],
    },
    CatalogEntry {
        id: "p2",
        name: "Aura Epoch",
        tagline: "Moments, not minutes.",
        description: "A timepiece designed for wellness. Ceramic casing on a sustainable vegan leather strap.",
        long_description: "A calm E-Ink hybrid display that reads like paper. Epoch tracks stress through skin temperature and heart rate variability and nudges you to breathe. The hypoallergenic ceramic case is hand polished.",
        price: 349,
        category: "Wearable",
        image_url: "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&fit=crop&q=80&w=1000",
        features: &["Stress Monitoring", "E-Ink Hybrid Display", "7-Day Battery"],
    },
    CatalogEntry {
        id: "p3",
        name: "Aura Canvas",
        tagline: "Capture the warmth.",
        description: "A display with the feel of paper. Soft on the eyes, vivid in color, textured to the touch.",
        long_description: "A matte, nano-etched OLED panel scatters ambient light so the screen looks like quality magazine paper. Built for reading, sketching and showing art.",
        price: 1099,
        category: "Mobile",
        image_url: "https://images.unsplash.com/photo-1544816155-12df9643f363?auto=format&fit=crop&q=80&w=1000",
        features: &["Paper-like OLED", "Portrait Lens", "Sandstone Texture"],
    },
    CatalogEntry {
        id: "p4",
        name: "Aura Essence",
        tagline: "Return to nature.",
        description: "An air purifier that doubles as a sculpture. Whisper quiet, with subtle natural scents.",
        long_description: "A moss-based bio-filter paired with HEPA filtration scrubs pollutants from the room, while cedar, bergamot and rain oils diffuse on a schedule that follows the day.",
        price: 599,
        category: "Home",
        image_url: "https://images.pexels.com/photos/8092420/pexels-photo-8092420.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        features: &["Bio-HEPA Filter", "Aromatherapy", "Silent Night Mode"],
    },
    CatalogEntry {
        id: "p5",
        name: "Aura Beam",
        tagline: "Light that breathes.",
        description: "Circadian lighting that follows the sun, with a candle-like glow in the evening.",
        long_description: "Beam syncs with local sunrise and sunset: cool, energizing light by day and a warm amber glow without blue light at night. A wave of the hand adjusts brightness.",
        price: 249,
        category: "Home",
        image_url: "https://images.unsplash.com/photo-1565814329452-e1efa11c5b89?auto=format&fit=crop&q=80&w=1000",
        features: &["Circadian Rhythm Sync", "Warm Dimming", "Touchless Control"],
    },
    CatalogEntry {
        id: "p6",
        name: "Aura Scribe",
        tagline: "Thought in motion.",
        description: "A stylus with the friction of graphite. Charges wirelessly when attached to Aura Canvas.",
        long_description: "A custom elastomer tip reproduces the microscopic drag of graphite on paper, and the balanced body disappears in the hand.",
        price: 129,
        category: "Mobile",
        image_url: "https://images.pexels.com/photos/2647376/pexels-photo-2647376.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        features: &["Zero Latency", "Textured Tip", "Wireless Charging"],
    },
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub products: usize,
    pub users: usize,
    /// Zero when the action log already had rows.
    pub actions_inserted: u64,
}

/// Demo storefront: six products, the `test` login, `user1..user10`, and a
/// reproducible browsing history for the numbered users.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub fn catalog() -> Vec<Product> {
        CATALOG
            .iter()
            .map(|entry| Product {
                id: ProductId(entry.id.to_string()),
                name: entry.name.to_string(),
                tagline: entry.tagline.to_string(),
                description: entry.description.to_string(),
                long_description: entry.long_description.to_string(),
                price: entry.price,
                category: entry.category.to_string(),
                image_url: entry.image_url.to_string(),
                features: entry.features.iter().map(|feature| feature.to_string()).collect(),
            })
            .collect()
    }

    pub fn credentials() -> Vec<Credentials> {
        let mut accounts = vec![Credentials::new("test", "1234")];
        accounts.extend(
            (1..=DEMO_USER_COUNT).map(|n| Credentials::new(format!("user{n}"), DEMO_PASSWORD)),
        );
        accounts
    }

    /// 5..=15 actions per numbered user: 60% view, 30% click, 10% buy, uniform
    /// over the catalog. Same seed, same history.
    pub fn browsing_history(seed: u64) -> Vec<TrackedAction> {
        let mut rng = StdRng::seed_from_u64(seed);
        let started = Utc::now();
        let mut actions = Vec::new();

        for n in 1..=DEMO_USER_COUNT {
            let user_id = format!("user{n}");
            let count = rng.gen_range(MIN_ACTIONS_PER_USER..=MAX_ACTIONS_PER_USER);
            for _ in 0..count {
                let product = &CATALOG[rng.gen_range(0..CATALOG.len())];
                let roll: f64 = rng.gen();
                let kind = if roll < 0.6 {
                    ActionKind::View
                } else if roll < 0.9 {
                    ActionKind::Click
                } else {
                    ActionKind::Buy
                };
                let occurred_at = started + Duration::milliseconds(actions.len() as i64);
                if let Ok(action) = TrackedAction::at(&user_id, kind, product.id, occurred_at) {
                    actions.push(action);
                }
            }
        }

        actions
    }

    /// Idempotent: products are upserted, users inserted once, and the
    /// browsing history is only written into an empty action log.
    pub async fn load(pool: &DbPool, seed: u64) -> Result<SeedResult, RepositoryError> {
        let products = SqlProductRepository::new(pool.clone());
        let catalog = Self::catalog();
        let product_count = catalog.len();
        for product in catalog {
            products.save(product).await?;
        }

        let users = SqlUserRepository::new(pool.clone());
        let accounts = Self::credentials();
        for account in &accounts {
            users.ensure(account).await?;
        }

        let events = SqlEventLog::new(pool.clone());
        let actions_inserted = if events.count().await? == 0 {
            events.append_batch(&Self::browsing_history(seed)).await?
        } else {
            0
        };

        Ok(SeedResult { products: product_count, users: accounts.len(), actions_inserted })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use aura_core::domain::action::ActionKind;

    use super::{DemoSeedDataset, DEFAULT_SEED};
    use crate::repositories::{ProductRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations};

    #[test]
    fn catalog_has_six_products_in_id_order() {
        let catalog = DemoSeedDataset::catalog();
        let ids: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5", "p6"]);
        assert!(catalog.iter().all(|p| p.features.len() == 3 && p.price > 0));
    }

    #[test]
    fn browsing_history_is_reproducible_and_bounded() {
        let first = DemoSeedDataset::browsing_history(DEFAULT_SEED);
        let second = DemoSeedDataset::browsing_history(DEFAULT_SEED);
        let pairs = |actions: &[aura_core::TrackedAction]| {
            actions
                .iter()
                .map(|a| (a.user_id.0.clone(), a.kind, a.product_id.0.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&first), pairs(&second));

        let mut per_user: BTreeMap<String, usize> = BTreeMap::new();
        for action in &first {
            *per_user.entry(action.user_id.0.clone()).or_default() += 1;
        }
        assert_eq!(per_user.len(), 10);
        assert!(per_user.values().all(|count| (5..=15).contains(count)));
        assert!(first.iter().any(|a| a.kind == ActionKind::View));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = DemoSeedDataset::load(&pool, DEFAULT_SEED).await.expect("seed");
        let second = DemoSeedDataset::load(&pool, DEFAULT_SEED).await.expect("seed again");

        assert_eq!(first.products, 6);
        assert_eq!(first.users, 11);
        assert!(first.actions_inserted >= 50);
        assert_eq!(second.actions_inserted, 0);

        let listed = SqlProductRepository::new(pool).list().await.expect("list");
        assert_eq!(listed.len(), 6);
        assert_eq!(listed[0].name, "Aura Harmony");
    }
}
