// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::validation::{MAX_PRICE, MAX_QUANTITY};
use crate::{LedgerDraft, OrderDraft};

/// Returns the name to create a customer with, or `None` when the input is
/// blank and nothing should be created.
pub fn new_customer_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_owned())
}

impl OrderDraft {
    pub fn validate(&self) -> Result<()> {
        if self.quantity < 0 {
            bail!("order quantity cannot be negative");
        }
        if self.quantity > MAX_QUANTITY {
            bail!("order quantity cannot exceed {MAX_QUANTITY}");
        }
        if self.price < 0 {
            bail!("order price cannot be negative");
        }
        if self.price > MAX_PRICE {
            bail!("order price cannot exceed {MAX_PRICE}");
        }
        Ok(())
    }
}

impl LedgerDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("customer name is required -- enter a name and retry");
        }
        for (index, row) in self.rows.iter().enumerate() {
            if let Err(error) = row.validate() {
                bail!("row {}: {error}", index + 1);
            }
        }
        Ok(())
    }
}
