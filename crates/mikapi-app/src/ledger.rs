// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Customer, CustomerId, Order, OrderField, OrderId};

/// Price adjustment applied by a single `+`/`-` on the price column.
pub const PRICE_STEP: i64 = 100;

pub trait LineAmount {
    fn quantity(&self) -> i64;
    fn price(&self) -> i64;

    /// `None` when `quantity * price` does not fit in an `i64`.
    fn amount(&self) -> Option<i64> {
        self.quantity().checked_mul(self.price())
    }
}

impl LineAmount for Order {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn price(&self) -> i64 {
        self.price
    }
}

impl LineAmount for OrderDraft {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn price(&self) -> i64 {
        self.price
    }
}

/// Sum of `quantity * price` over every line; 0 when there are none and
/// `None` on overflow.
pub fn compute_total<'a, L, I>(lines: I) -> Option<i64>
where
    L: LineAmount + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .try_fold(0i64, |total, line| total.checked_add(line.amount()?))
}

/// An order row as edited on the detail page. `id` is `None` until the row is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub id: Option<OrderId>,
    pub item: String,
    pub quantity: i64,
    pub price: i64,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self::blank()
    }
}

impl OrderDraft {
    pub fn blank() -> Self {
        Self {
            id: None,
            item: String::new(),
            quantity: 1,
            price: 0,
        }
    }

    pub fn new(item: impl Into<String>, quantity: i64, price: i64) -> Self {
        Self {
            id: None,
            item: item.into(),
            quantity,
            price,
        }
    }

    pub fn from_order(order: &Order) -> Self {
        Self {
            id: Some(order.id),
            item: order.item.clone(),
            quantity: order.quantity,
            price: order.price,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn increment_quantity(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    pub fn decrement_quantity(&mut self) {
        self.quantity = self.quantity.saturating_sub(1).max(0);
    }

    pub fn step_price(&mut self, steps: i64) {
        self.price = self
            .price
            .saturating_add(steps.saturating_mul(PRICE_STEP))
            .max(0);
    }

    pub fn field_text(&self, field: OrderField) -> String {
        match field {
            OrderField::Item => self.item.clone(),
            OrderField::Quantity => self.quantity.to_string(),
            OrderField::Price => self.price.to_string(),
        }
    }
}

/// Working copy of one customer's tab: the editable header fields plus every
/// order row, saved or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDraft {
    pub customer_id: CustomerId,
    pub name: String,
    pub memo: String,
    pub settled: bool,
    pub rows: Vec<OrderDraft>,
}

impl LedgerDraft {
    pub fn from_detail(customer: &Customer, orders: &[Order]) -> Self {
        Self {
            customer_id: customer.id,
            name: customer.name.clone(),
            memo: customer.memo_text().to_owned(),
            settled: customer.settled,
            rows: orders.iter().map(OrderDraft::from_order).collect(),
        }
    }

    pub fn total(&self) -> Option<i64> {
        compute_total(&self.rows)
    }

    pub fn add_row(&mut self) -> usize {
        self.rows.push(OrderDraft::blank());
        self.rows.len() - 1
    }

    pub fn remove_row(&mut self, index: usize) -> Option<OrderDraft> {
        if index >= self.rows.len() {
            return None;
        }
        Some(self.rows.remove(index))
    }

    pub fn unsaved_rows(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_saved()).count()
    }
}

/// Outcome of a confirm: which writes went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    pub inserted: usize,
    pub updated: usize,
}

impl SaveReport {
    pub fn rows_written(&self) -> usize {
        self.inserted + self.updated
    }
}
