//! Read-only access to operational data.
//!
//! The analytics modules never touch storage directly: they ask a
//! [`SalesStore`] for plain tabular records and compute everything else
//! themselves. [`SnapshotStore`] answers the same queries from an exported
//! JSON snapshot.

pub mod snapshot;

pub use snapshot::{ProductRecord, SaleItemRecord, SaleRecord, SaleStatus, Snapshot, SnapshotStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to read operational data. Always fatal to an analytics call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("query failed: {0}")]
    Query(String),
}

/// Units sold of one product in a window, joined with its stock levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVelocity {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
    pub cost: f64,
    pub total_sold: i64,
}

/// An active product at or below its minimum stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
}

/// Sales of every status in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCounts {
    pub total: u64,
    pub voided: u64,
}

/// Distinct product names of one completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    pub sale_id: String,
    pub product_names: Vec<String>,
}

/// Count and revenue of completed transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub transactions: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub product_name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayRevenue {
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u32,
    pub transactions: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub transactions: u64,
}

/// Read interface to products and sales.
///
/// Every window is `[since, now)`; only completed sales count unless a
/// method says otherwise.
#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Units sold per product since `since`, highest first.
    async fn product_velocity(&self, since: DateTime<Utc>) -> Result<Vec<ProductVelocity>, StoreError>;

    /// Active products whose stock is at or below their minimum.
    async fn low_stock_products(&self) -> Result<Vec<StockLevel>, StoreError>;

    /// Completed revenue in `[from, until)`, or from `from` onward when `until` is `None`.
    async fn completed_revenue(
        &self,
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<f64, StoreError>;

    /// Sales of any status, and how many of them were voided.
    async fn sale_counts(&self, since: DateTime<Utc>) -> Result<SaleCounts, StoreError>;

    async fn completed_baskets(&self, since: DateTime<Utc>) -> Result<Vec<Basket>, StoreError>;

    async fn completed_totals(&self, since: DateTime<Utc>) -> Result<SalesTotals, StoreError>;

    /// Products ranked by line revenue, at most `limit`.
    async fn top_products_by_revenue(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ProductRevenue>, StoreError>;

    async fn revenue_by_weekday(&self, since: DateTime<Utc>) -> Result<Vec<WeekdayRevenue>, StoreError>;

    async fn transactions_by_hour(&self, since: DateTime<Utc>) -> Result<Vec<HourlyCount>, StoreError>;
}
