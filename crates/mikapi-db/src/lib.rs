// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod rest;
mod sqlite;

use anyhow::{Context, Result, bail};
use mikapi_app::{
    Customer, CustomerDetail, CustomerId, LedgerDraft, Order, OrderDraft, OrderId, SaveReport,
    SettlementSummary, compute_total,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

pub use rest::RestBackend;
pub use sqlite::{PragmaColumn, SqliteBackend};

pub const APP_NAME: &str = "mikapi";
pub const DEFAULT_CUSTOMERS_TABLE: &str = "mikapi_customers";
pub const DEFAULT_ORDERS_TABLE: &str = "mikapi_orders";

/// One table row as exchanged with a backend: column name to JSON value.
pub type Row = Map<String, Value>;

/// Equality condition on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_owned(),
            value: value.into(),
        }
    }
}

/// The generic table query surface the store is built on.
pub trait TableBackend {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>>;
    fn insert(&self, table: &str, record: &Row) -> Result<Row>;
    /// Returns the rows as they read after the update.
    fn update(&self, table: &str, record: &Row, filters: &[Filter]) -> Result<Vec<Row>>;
    fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;

    /// Cheapest request that proves the table is reachable.
    fn probe(&self, table: &str) -> Result<()> {
        self.select(table, &[]).map(|_| ())
    }
}

impl<B: TableBackend + ?Sized> TableBackend for Box<B> {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        (**self).select(table, filters)
    }

    fn insert(&self, table: &str, record: &Row) -> Result<Row> {
        (**self).insert(table, record)
    }

    fn update(&self, table: &str, record: &Row, filters: &[Filter]) -> Result<Vec<Row>> {
        (**self).update(table, record, filters)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        (**self).delete(table, filters)
    }

    fn probe(&self, table: &str) -> Result<()> {
        (**self).probe(table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub customers: String,
    pub orders: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            customers: DEFAULT_CUSTOMERS_TABLE.to_owned(),
            orders: DEFAULT_ORDERS_TABLE.to_owned(),
        }
    }
}

impl TableNames {
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.customers)?;
        validate_table_name(&self.orders)?;
        if self.customers == self.orders {
            bail!(
                "customers and orders tables must differ, both are {:?}",
                self.customers
            );
        }
        Ok(())
    }
}

pub fn validate_table_name(name: &str) -> Result<()> {
    if !is_safe_identifier(name) {
        bail!("invalid table name {name:?}; use letters, digits, and underscores only");
    }
    Ok(())
}

pub(crate) fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
        && !identifier.as_bytes()[0].is_ascii_digit()
}

/// Customer and order operations over any [`TableBackend`].
pub struct Store<B> {
    backend: B,
    tables: TableNames,
}

impl<B: TableBackend> Store<B> {
    pub fn new(backend: B, tables: TableNames) -> Result<Self> {
        tables.validate()?;
        Ok(Self { backend, tables })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn ping(&self) -> Result<()> {
        self.backend
            .probe(&self.tables.customers)
            .with_context(|| format!("reach table {}", self.tables.customers))?;
        self.backend
            .probe(&self.tables.orders)
            .with_context(|| format!("reach table {}", self.tables.orders))?;
        Ok(())
    }

    pub fn list_customers(&self, settled: bool) -> Result<Vec<Customer>> {
        let rows = self
            .backend
            .select(&self.tables.customers, &[Filter::eq("settled", settled)])
            .context("query customers")?;
        let mut customers: Vec<Customer> = decode_rows(rows, "customer")?;
        customers.sort_by_key(|customer| customer.id);
        Ok(customers)
    }

    pub fn list_settled_customers(&self) -> Result<Vec<Customer>> {
        self.list_customers(true)
    }

    pub fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        let rows = self
            .backend
            .select(&self.tables.customers, &[id_filter(customer_id.get())])
            .with_context(|| format!("query customer {customer_id}"))?;
        let mut customers: Vec<Customer> = decode_rows(rows, "customer")?;
        Ok(if customers.is_empty() {
            None
        } else {
            Some(customers.swap_remove(0))
        })
    }

    /// A blank name creates nothing and is not an error.
    pub fn create_customer(&self, name: &str) -> Result<Option<Customer>> {
        let Some(name) = mikapi_app::new_customer_name(name) else {
            tracing::debug!("ignored blank customer name");
            return Ok(None);
        };

        let record = object(json!({ "name": name, "settled": false }));
        let row = self
            .backend
            .insert(&self.tables.customers, &record)
            .with_context(|| format!("insert customer {name:?}"))?;
        let customer: Customer = decode_row(row, "customer")?;
        tracing::info!(customer_id = %customer.id, name = %customer.name, "customer created");
        Ok(Some(customer))
    }

    pub fn update_customer(
        &self,
        customer_id: CustomerId,
        name: &str,
        memo: &str,
    ) -> Result<Customer> {
        let record = object(json!({ "name": name, "memo": memo }));
        let rows = self
            .backend
            .update(
                &self.tables.customers,
                &record,
                &[id_filter(customer_id.get())],
            )
            .with_context(|| format!("update customer {customer_id}"))?;
        let mut customers: Vec<Customer> = decode_rows(rows, "customer")?;
        if customers.is_empty() {
            bail!("customer {customer_id} not found -- reload the list and retry");
        }
        Ok(customers.swap_remove(0))
    }

    /// Idempotent; there is no way back to unsettled.
    pub fn mark_settled(&self, customer_id: CustomerId) -> Result<()> {
        let record = object(json!({ "settled": true }));
        let rows = self
            .backend
            .update(
                &self.tables.customers,
                &record,
                &[id_filter(customer_id.get())],
            )
            .with_context(|| format!("settle customer {customer_id}"))?;
        if rows.is_empty() {
            tracing::warn!(customer_id = %customer_id, "settle matched no customer");
        } else {
            tracing::info!(customer_id = %customer_id, "customer settled");
        }
        Ok(())
    }

    pub fn list_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = self
            .backend
            .select(
                &self.tables.orders,
                &[Filter::eq("customer_id", customer_id.get())],
            )
            .with_context(|| format!("query orders for customer {customer_id}"))?;
        let mut orders: Vec<Order> = decode_rows(rows, "order")?;
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    /// Inserts when the draft has no id, otherwise overwrites the row in place.
    pub fn upsert_order(
        &self,
        customer_id: CustomerId,
        customer_name: &str,
        draft: &OrderDraft,
    ) -> Result<Order> {
        draft.validate()?;
        let mut record = object(json!({
            "name": customer_name,
            "item": draft.item,
            "quantity": draft.quantity,
            "price": draft.price,
        }));

        match draft.id {
            None => {
                record.insert("customer_id".to_owned(), json!(customer_id.get()));
                let row = self
                    .backend
                    .insert(&self.tables.orders, &record)
                    .with_context(|| format!("insert order for customer {customer_id}"))?;
                let order: Order = decode_row(row, "order")?;
                tracing::debug!(order_id = %order.id, customer_id = %customer_id, "order inserted");
                Ok(order)
            }
            Some(order_id) => {
                let rows = self
                    .backend
                    .update(&self.tables.orders, &record, &[id_filter(order_id.get())])
                    .with_context(|| format!("update order {order_id}"))?;
                let mut orders: Vec<Order> = decode_rows(rows, "order")?;
                if orders.is_empty() {
                    bail!("order {order_id} no longer exists -- reload the tab and retry");
                }
                tracing::debug!(order_id = %order_id, "order updated");
                Ok(orders.swap_remove(0))
            }
        }
    }

    pub fn delete_order(&self, order_id: OrderId) -> Result<()> {
        self.backend
            .delete(&self.tables.orders, &[id_filter(order_id.get())])
            .with_context(|| format!("delete order {order_id}"))?;
        tracing::info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    pub fn load_detail(&self, customer_id: CustomerId) -> Result<Option<CustomerDetail>> {
        let Some(customer) = self.get_customer(customer_id)? else {
            return Ok(None);
        };
        let orders = self.list_orders(customer_id)?;
        Ok(Some(CustomerDetail { customer, orders }))
    }

    pub fn settlement_summaries(&self) -> Result<Vec<SettlementSummary>> {
        self.list_settled_customers()?
            .into_iter()
            .map(|customer| {
                let orders = self.list_orders(customer.id)?;
                let total = compute_total(&orders).with_context(|| {
                    format!(
                        "total for customer {} overflows -- fix the stored quantities or prices",
                        customer.id
                    )
                })?;
                Ok(SettlementSummary {
                    customer,
                    orders,
                    total,
                })
            })
            .collect()
    }

    /// Writes the header fields, then every row in order. Stops at the first
    /// failure; rows written before it stay written. Inserted rows get their
    /// new id in `ledger`, so a retry updates them instead of inserting again.
    pub fn save_ledger(&self, ledger: &mut LedgerDraft) -> Result<SaveReport> {
        ledger.validate()?;
        self.update_customer(ledger.customer_id, &ledger.name, &ledger.memo)?;

        let LedgerDraft {
            customer_id,
            name,
            rows,
            ..
        } = ledger;
        let mut report = SaveReport::default();
        let total_rows = rows.len();
        for (index, draft) in rows.iter_mut().enumerate() {
            let order = self
                .upsert_order(*customer_id, name, draft)
                .with_context(|| {
                    format!(
                        "save row {} ({} of {total_rows} rows saved before the failure)",
                        index + 1,
                        report.rows_written()
                    )
                })?;
            if draft.is_saved() {
                report.updated += 1;
            } else {
                draft.id = Some(order.id);
                report.inserted += 1;
            }
        }

        tracing::info!(
            customer_id = %customer_id,
            inserted = report.inserted,
            updated = report.updated,
            "ledger saved"
        );
        Ok(report)
    }
}

fn id_filter(id: i64) -> Filter {
    Filter::eq("id", id)
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn decode_row<T: DeserializeOwned>(row: Row, what: &str) -> Result<T> {
    serde_json::from_value(Value::Object(row)).with_context(|| {
        format!("decode {what} row -- the id column must be an integer key (bigint identity), not uuid")
    })
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>, what: &str) -> Result<Vec<T>> {
    rows.into_iter().map(|row| decode_row(row, what)).collect()
}
