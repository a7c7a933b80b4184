// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::ids::*;

/// A patron's tab. `settled` only ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settled: bool,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        serialize_with = "time::serde::rfc3339::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl Customer {
    pub fn memo_text(&self) -> &str {
        self.memo.as_deref().unwrap_or("")
    }
}

/// One line item on a customer's tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub item: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: i64,
    /// Customer name at the time the row was last written.
    #[serde(default, rename = "name", deserialize_with = "null_as_default")]
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementSummary {
    pub customer: Customer,
    pub orders: Vec<Order>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Open,
    Settled,
    Detail,
}

impl Page {
    pub const LISTS: [Self; 2] = [Self::Open, Self::Settled];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open tabs",
            Self::Settled => "settled",
            Self::Detail => "detail",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Settled => "settled",
            Self::Detail => "detail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "settled" => Some(Self::Settled),
            "detail" => Some(Self::Detail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderField {
    Item,
    Quantity,
    Price,
}

impl OrderField {
    pub const ALL: [Self; 3] = [Self::Item, Self::Quantity, Self::Price];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Quantity => "qty",
            Self::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    NewCustomer,
    CustomerName,
    Memo,
    OrderCell(OrderField),
}

impl InputKind {
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::NewCustomer => "new customer name",
            Self::CustomerName => "customer name",
            Self::Memo => "memo",
            Self::OrderCell(OrderField::Item) => "item",
            Self::OrderCell(OrderField::Quantity) => "quantity",
            Self::OrderCell(OrderField::Price) => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Input(InputKind),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Hosted tables may declare the column without a time zone; those values are dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| OffsetDateTime::parse(&value, &Rfc3339).ok()))
}
