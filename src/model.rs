//! Domain read models mirrored from the remote API's JSON shapes.
//!
//! These are denormalized snapshots with no identity of their own; the remote
//! system is the single source of truth and the cache window is the only
//! lifetime they have on this side.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Account role of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Pharmacist,
    Cashier,
    Manager,
    Admin,
}

impl Role {
    /// Stable lowercase name used in filters and key serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Pharmacist => "pharmacist",
            Self::Cashier => "cashier",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub branch: Option<i64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Medicine,
    Supplement,
    MedicalDevice,
}

impl ProductKind {
    /// Stable lowercase name used in filters and key serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medicine => "medicine",
            Self::Supplement => "supplement",
            Self::MedicalDevice => "medical_device",
        }
    }
}

/// A sellable product: medicine, supplement, or medical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub kind: ProductKind,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Lifecycle status of an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Stable lowercase name used in filters and key serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A single line of an [`Order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: i64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer: i64,
    #[serde(default)]
    pub branch: Option<i64>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stock level of one product at one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: i64,
    pub product: i64,
    pub product_name: String,
    pub branch: i64,
    pub current_stock: i64,
    pub minimum_stock: i64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Returns `true` if the record is at or below its minimum stock level.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }
}

/// Kind of stock movement recorded by an [`InventoryTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Restock,
    Sale,
    Adjustment,
    Transfer,
}

/// A stock movement against an [`InventoryRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: i64,
    pub record: i64,
    pub kind: TransactionKind,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A pharmacy branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Delivery status of a dispatched order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// Stable lowercase name used in filters and key serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// A delivery assignment for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub order: i64,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A generated report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub branch: Option<i64>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Loyalty point balance of a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyPoints {
    pub id: i64,
    pub customer: i64,
    pub points: i64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Review status of a [`Prescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Approved,
    Rejected,
    Filled,
}

impl PrescriptionStatus {
    /// Stable lowercase name used in filters and key serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Filled => "filled",
        }
    }
}

/// A submitted prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub customer: i64,
    pub status: PrescriptionStatus,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}
