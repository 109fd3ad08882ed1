use serde::{Deserialize, Serialize};

/// One row of the `services` or `extras` catalog. The two catalogs are
/// disjoint: a booking references exactly one service and any number of
/// extras.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
}
