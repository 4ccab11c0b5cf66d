//! # Domain Types
//!
//! Core domain types for the Tally back-office ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  StockMovement  │   │   CostChange    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  signed delta   │   │  old/new cost   │       │
//! │  │  stock          │◄──│  kind + ref     │   │  append-only    │       │
//! │  │  min_stock      │   │  append-only    │   │  latest=current │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Purchase     │   │      Sale       │   │   SalesReturn   │       │
//! │  │  PENDING        │   │  COMPLETED      │   │  refunded item  │       │
//! │  │  RECEIVED       │   │  VOID           │   │  subset + reason│       │
//! │  │  CANCELLED      │   │  RETURNED       │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Customer.credit_balance  = what the customer owes the business         │
//! │  Supplier.credit_balance  = what the business owes the supplier         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ledger Invariant
//! `Product.stock` always equals the running sum of all signed
//! [`StockMovement`] deltas for that product. The stock column is a
//! materialized balance; the movement log is the source of truth and the
//! audit trail. Nothing outside the stock ledger primitive mutates either.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog with its materialized stock balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.), unique when present.
    pub barcode: Option<String>,

    /// Display name.
    pub name: String,

    /// Unit of measure ("pcs", "kg", "box").
    pub unit: String,

    /// Selling price in cents.
    pub selling_price_cents: i64,

    /// Reorder threshold. Low stock when `stock <= min_stock_level`.
    pub min_stock_level: i64,

    /// Materialized on-hand quantity.
    ///
    /// Invariant: equals the sum of all movement deltas for this product.
    /// Mutated only through the stock ledger primitive, never edited directly.
    pub stock: i64,

    /// Expiry date propagated from the most recent purchase, if any.
    pub expiry_date: Option<NaiveDate>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Low-stock predicate: at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock_level
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The typed reason for a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received against a purchase order.
    Purchase,
    /// Goods sold to a customer.
    Sale,
    /// Manual correction or compensating reversal.
    Adjustment,
    /// Written off as damaged.
    Damage,
    /// Written off as expired.
    Expired,
    /// Written off as lost.
    Lost,
    /// Goods returned by a customer and restocked.
    ReturnIn,
}

/// What entity a movement was caused by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Purchase,
    Sale,
    SalesReturn,
    Adjustment,
}

/// One signed stock-quantity change. Immutable, append-only.
///
/// One row per stock-affecting event; together these rows are the audit
/// trail behind every `Product.stock` balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,

    /// Signed quantity change. Positive = into stock, negative = out.
    pub delta: i64,

    pub kind: MovementKind,

    /// Entity that caused this movement, if any.
    pub reference_kind: Option<ReferenceKind>,
    pub reference_id: Option<String>,

    /// Authenticated actor who triggered the movement.
    pub actor: String,

    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// Cost History
// =============================================================================

/// One entry in a product's append-only cost history.
///
/// There is no mutable "current cost" field on [`Product`]; the current
/// cost is the `new_cost_cents` of the latest entry. Appending instead of
/// overwriting avoids lost updates between concurrent purchases of the
/// same product and preserves the full pricing audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CostChange {
    pub id: String,
    pub product_id: String,
    pub actor: String,

    /// Previous recorded cost; `None` for the first entry.
    pub old_cost_cents: Option<i64>,
    pub new_cost_cents: i64,

    /// Why the cost changed ("purchase", "manual edit").
    pub reason: String,

    /// Purchase that caused the change, when applicable.
    pub reference_id: Option<String>,

    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// The lifecycle state of a purchase order.
///
/// `Cancelled` is terminal: a cancelled purchase can no longer be edited,
/// voided again, or paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Received,
    Cancelled,
}

/// A purchase order from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    pub status: PurchaseStatus,

    /// Σ(item line totals).
    pub subtotal_cents: i64,

    /// Modeled but computed as zero in all current flows.
    pub discount_cents: i64,
    /// Modeled but computed as zero in all current flows.
    pub tax_cents: i64,

    /// Invariant: total = subtotal − discount + tax.
    pub total_cents: i64,

    /// Expiry date to propagate to received products, if given.
    pub expiry_date: Option<NaiveDate>,

    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on a purchase order.
///
/// Items are fully replaceable: editing a purchase reverses every existing
/// item, deletes the rows, and reapplies the new set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// The lifecycle state of a sale.
///
/// `Void` is terminal. `Returned` is reached once every line item has been
/// refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Void,
    Returned,
}

/// How much of a sale has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Partial,
}

/// What kind of ledger event a sale row represents.
///
/// `DebtCollection` rows are synthetic sales created by the debt settlement
/// allocator: they carry a total and an invoice number but never line items.
/// Code that iterates sale items must go through [`Sale::expects_line_items`]
/// so the item-less case is handled explicitly instead of by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    Sale,
    DebtCollection,
}

/// Payment instrument for sales and supplier payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// A sale transaction (or a synthetic debt-collection event).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Globally monotonic invoice number from the shared sequence.
    pub invoice_no: i64,

    pub customer_id: String,
    pub kind: SaleKind,
    pub status: SaleStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether this sale carries line items at all.
    ///
    /// Debt-collection sales are item-less by construction; per-item logic
    /// (refunds, item reports) must check this before iterating.
    #[inline]
    pub fn expects_line_items(&self) -> bool {
        matches!(self.kind, SaleKind::Sale)
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
}

// =============================================================================
// Sales Return
// =============================================================================

/// A refund event against a sale: header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesReturn {
    pub id: String,
    pub sale_id: String,
    pub reason: String,
    /// Σ(line totals) of the refunded items.
    pub total_cents: i64,
    pub refunded_by: String,
    pub created_at: DateTime<Utc>,
}

/// One refunded item within a return event.
///
/// References the original sale item; a sale item can appear in at most
/// one return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesReturnItem {
    pub id: String,
    pub return_id: String,
    pub sale_item_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Counterparties
// =============================================================================

/// A customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Unique when present; duplicates surface as a conflict.
    pub phone: Option<String>,

    /// Lifetime spend across non-void sales.
    pub total_spent_cents: i64,
    /// Number of completed visits.
    pub visit_count: i64,

    /// Outstanding debt owed to the business. Never negative.
    pub credit_balance_cents: i64,
    pub credit_limit_cents: i64,

    /// Sentinel flag for the anonymous walk-in customer.
    ///
    /// Set once at system initialization; the walk-in row is exempt from
    /// stat tracking and cannot be deleted.
    pub is_walk_in: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,

    /// Amount the business owes this supplier. Never negative.
    pub credit_balance_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payments
// =============================================================================

/// An immutable payment received from a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerPayment {
    pub id: String,
    pub customer_id: String,
    /// Sale this payment settles; for debt repayments, the synthetic
    /// debt-collection sale.
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub received_by: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable payment made to a supplier against a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchasePayment {
    pub id: String,
    pub purchase_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub paid_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Manual Stock Adjustment
// =============================================================================

/// Direction of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Add,
    Remove,
}

/// Why a manual adjustment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Damage,
    Expired,
    Lost,
    Recount,
    Other,
}

impl AdjustmentReason {
    /// Movement kind recorded for this reason.
    ///
    /// Damage/Expired/Lost map to their own movement kinds so write-offs
    /// are distinguishable in the audit trail; everything else is a plain
    /// adjustment.
    pub fn movement_kind(&self) -> MovementKind {
        match self {
            AdjustmentReason::Damage => MovementKind::Damage,
            AdjustmentReason::Expired => MovementKind::Expired,
            AdjustmentReason::Lost => MovementKind::Lost,
            AdjustmentReason::Recount | AdjustmentReason::Other => MovementKind::Adjustment,
        }
    }
}

/// An audited manual stock correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAdjustment {
    pub id: String,
    pub product_id: String,
    pub direction: AdjustmentDirection,
    pub quantity: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
    pub stock_before: i64,
    pub stock_after: i64,
    pub adjusted_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, min: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".into(),
            sku: "SKU-1".into(),
            barcode: None,
            name: "Test".into(),
            unit: "pcs".into(),
            selling_price_cents: 100,
            min_stock_level: min,
            stock,
            expiry_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_predicate_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn test_adjustment_reason_movement_kinds() {
        assert_eq!(
            AdjustmentReason::Damage.movement_kind(),
            MovementKind::Damage
        );
        assert_eq!(
            AdjustmentReason::Expired.movement_kind(),
            MovementKind::Expired
        );
        assert_eq!(AdjustmentReason::Lost.movement_kind(), MovementKind::Lost);
        assert_eq!(
            AdjustmentReason::Recount.movement_kind(),
            MovementKind::Adjustment
        );
        assert_eq!(
            AdjustmentReason::Other.movement_kind(),
            MovementKind::Adjustment
        );
    }

    #[test]
    fn test_debt_collection_sales_are_item_less() {
        let now = Utc::now();
        let sale = Sale {
            id: "s1".into(),
            invoice_no: 1,
            customer_id: "c1".into(),
            kind: SaleKind::DebtCollection,
            status: SaleStatus::Completed,
            payment_status: PaymentStatus::Paid,
            payment_method: Some(PaymentMethod::Cash),
            total_cents: 2500,
            notes: None,
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(!sale.expects_line_items());
    }
}
