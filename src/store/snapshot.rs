//! In-memory [`SalesStore`] over an exported snapshot of products and sales.

use super::{
    Basket, HourlyCount, ProductRevenue, ProductVelocity, SaleCounts, SalesStore, SalesTotals,
    StockLevel, StoreError, WeekdayRevenue,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    #[serde(default)]
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_min_stock")]
    pub min_stock: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_min_stock() -> i64 {
    5
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Voided,
    Pending,
}

/// One line of a sale. The product name is denormalized as printed on the receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemRecord {
    pub product_id: String,
    pub product_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: f64,
    pub line_total: f64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub status: SaleStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<SaleItemRecord>,
}

impl SaleRecord {
    fn is_completed_since(&self, since: DateTime<Utc>) -> bool {
        self.status == SaleStatus::Completed && self.created_at >= since
    }
}

/// Exported products and sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub sales: Vec<SaleRecord>,
}

/// Answers [`SalesStore`] queries by scanning a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    snapshot: Snapshot,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        debug!(
            "Loaded snapshot with {} products and {} sales from {}",
            snapshot.products.len(),
            snapshot.sales.len(),
            path.display()
        );
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn completed_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &SaleRecord> {
        self.snapshot
            .sales
            .iter()
            .filter(move |sale| sale.is_completed_since(since))
    }
}

#[async_trait]
impl SalesStore for SnapshotStore {
    async fn product_velocity(&self, since: DateTime<Utc>) -> Result<Vec<ProductVelocity>, StoreError> {
        let mut sold: HashMap<&str, i64> = HashMap::new();
        for sale in self.completed_since(since) {
            for item in &sale.items {
                *sold.entry(item.product_id.as_str()).or_default() += item.quantity;
            }
        }

        let mut rows: Vec<ProductVelocity> = self
            .snapshot
            .products
            .iter()
            .filter_map(|product| {
                sold.get(product.id.as_str()).map(|&total_sold| ProductVelocity {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    stock: product.stock,
                    min_stock: product.min_stock,
                    cost: product.cost,
                    total_sold,
                })
            })
            .collect();

        rows.sort_by(|a, b| b.total_sold.cmp(&a.total_sold).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn low_stock_products(&self) -> Result<Vec<StockLevel>, StoreError> {
        Ok(self
            .snapshot
            .products
            .iter()
            .filter(|p| p.is_active && p.stock <= p.min_stock)
            .map(|p| StockLevel {
                product_id: p.id.clone(),
                name: p.name.clone(),
                stock: p.stock,
                min_stock: p.min_stock,
            })
            .collect())
    }

    async fn completed_revenue(
        &self,
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<f64, StoreError> {
        Ok(self
            .completed_since(from)
            .filter(|sale| until.map_or(true, |end| sale.created_at < end))
            .map(|sale| sale.total)
            .sum())
    }

    async fn sale_counts(&self, since: DateTime<Utc>) -> Result<SaleCounts, StoreError> {
        let mut counts = SaleCounts::default();
        for sale in self.snapshot.sales.iter().filter(|s| s.created_at >= since) {
            counts.total += 1;
            if sale.status == SaleStatus::Voided {
                counts.voided += 1;
            }
        }
        Ok(counts)
    }

    async fn completed_baskets(&self, since: DateTime<Utc>) -> Result<Vec<Basket>, StoreError> {
        Ok(self
            .completed_since(since)
            .map(|sale| {
                let names: BTreeSet<&str> =
                    sale.items.iter().map(|i| i.product_name.as_str()).collect();
                Basket {
                    sale_id: sale.id.clone(),
                    product_names: names.into_iter().map(String::from).collect(),
                }
            })
            .collect())
    }

    async fn completed_totals(&self, since: DateTime<Utc>) -> Result<SalesTotals, StoreError> {
        let mut totals = SalesTotals::default();
        for sale in self.completed_since(since) {
            totals.transactions += 1;
            totals.revenue += sale.total;
        }
        Ok(totals)
    }

    async fn top_products_by_revenue(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ProductRevenue>, StoreError> {
        let mut grouped: HashMap<&str, (i64, f64)> = HashMap::new();
        for sale in self.completed_since(since) {
            for item in &sale.items {
                let entry = grouped.entry(item.product_name.as_str()).or_default();
                entry.0 += item.quantity;
                entry.1 += item.line_total;
            }
        }

        let mut rows: Vec<ProductRevenue> = grouped
            .into_iter()
            .map(|(name, (quantity, revenue))| ProductRevenue {
                product_name: name.to_string(),
                quantity,
                revenue,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.revenue
                .partial_cmp(&a.revenue)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn revenue_by_weekday(&self, since: DateTime<Utc>) -> Result<Vec<WeekdayRevenue>, StoreError> {
        let mut grouped: BTreeMap<u32, (u64, f64)> = BTreeMap::new();
        for sale in self.completed_since(since) {
            let entry = grouped
                .entry(sale.created_at.weekday().num_days_from_sunday())
                .or_default();
            entry.0 += 1;
            entry.1 += sale.total;
        }

        Ok(grouped
            .into_iter()
            .map(|(weekday, (transactions, revenue))| WeekdayRevenue {
                weekday,
                transactions,
                revenue,
            })
            .collect())
    }

    async fn transactions_by_hour(&self, since: DateTime<Utc>) -> Result<Vec<HourlyCount>, StoreError> {
        let mut grouped: BTreeMap<u32, u64> = BTreeMap::new();
        for sale in self.completed_since(since) {
            *grouped.entry(sale.created_at.hour()).or_default() += 1;
        }

        Ok(grouped
            .into_iter()
            .map(|(hour, transactions)| HourlyCount { hour, transactions })
            .collect())
    }
}
