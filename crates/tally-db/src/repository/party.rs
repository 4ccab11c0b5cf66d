//! # Party Repository
//!
//! Read access for customers and suppliers.
//!
//! Credit balances here are two different debts:
//! - `Customer.credit_balance_cents`: what the customer owes the business.
//! - `Supplier.credit_balance_cents`: what the business owes the supplier.

use sqlx::SqlitePool;

use crate::error::DbResult;
use tally_core::{Customer, CustomerPayment, Supplier};

const CUSTOMER_COLUMNS: &str = "id, name, phone, total_spent_cents, visit_count, \
     credit_balance_cents, credit_limit_cents, is_walk_in, created_at, updated_at";

const SUPPLIER_COLUMNS: &str =
    "id, name, phone, credit_balance_cents, created_at, updated_at";

/// Repository for customer and supplier reads.
#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
}

impl PartyRepository {
    /// Creates a new PartyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PartyRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    /// Gets a customer by ID.
    pub async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// The walk-in sentinel customer.
    ///
    /// Seeded by the initial migration; identified by flag, not by name.
    pub async fn walk_in_customer(&self) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE is_walk_in = 1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Customers with outstanding debt, largest first.
    pub async fn debtors(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE credit_balance_cents > 0 \
             ORDER BY credit_balance_cents DESC"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Payment history for a customer, newest first.
    pub async fn customer_payments(&self, customer_id: &str) -> DbResult<Vec<CustomerPayment>> {
        let payments = sqlx::query_as::<_, CustomerPayment>(
            "SELECT id, customer_id, sale_id, amount_cents, method, received_by, created_at \
             FROM customer_payments \
             WHERE customer_id = ?1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    /// Gets a supplier by ID.
    pub async fn get_supplier(&self, id: &str) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1");
        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(supplier)
    }

    /// Suppliers the business owes money to, largest first.
    pub async fn creditors(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers \
             WHERE credit_balance_cents > 0 \
             ORDER BY credit_balance_cents DESC"
        );
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(suppliers)
    }
}
