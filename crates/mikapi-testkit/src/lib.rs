// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use mikapi_app::{OrderDraft, PRICE_STEP};
use std::path::PathBuf;

const FAMILY_NAMES: [&str; 16] = [
    "Tanaka", "Sato", "Suzuki", "Takahashi", "Watanabe", "Ito", "Yamamoto", "Nakamura",
    "Kobayashi", "Kato", "Yoshida", "Yamada", "Sasaki", "Matsumoto", "Inoue", "Kimura",
];

/// Menu items with their base price in whole currency units.
const MENU: [(&str, i64); 14] = [
    ("ramen", 800),
    ("gyoza", 500),
    ("karaage", 600),
    ("onigiri", 200),
    ("miso soup", 150),
    ("edamame", 300),
    ("curry rice", 900),
    ("udon", 700),
    ("matcha latte", 550),
    ("hojicha", 400),
    ("draft beer", 600),
    ("highball", 500),
    ("sake", 800),
    ("dango", 250),
];

const MEMOS: [&str; 8] = [
    "window seat",
    "pays at the end of the month",
    "regular, no onions",
    "group of four",
    "bring change for 10000",
    "counter seat",
    "birthday this week",
    "takeout on fridays",
];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// One seeded tab: the customer header plus its order lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoTab {
    pub name: String,
    pub memo: Option<String>,
    pub settled: bool,
    pub orders: Vec<OrderDraft>,
}

/// Produces the same café tabs for the same seed.
pub struct TabFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl TabFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn customer_name(&mut self) -> String {
        self.pick(&FAMILY_NAMES).to_owned()
    }

    pub fn order(&mut self) -> OrderDraft {
        let (item, base_price) = MENU[self.rng.int_n(MENU.len())];
        let quantity = 1 + self.rng.int_n(3) as i64;
        // Some shops round up: nudge a third of the prices by one step.
        let price = if self.rng.int_n(3) == 0 {
            base_price + PRICE_STEP
        } else {
            base_price
        };
        OrderDraft::new(item, quantity, price)
    }

    pub fn tab(&mut self) -> DemoTab {
        let name = self.customer_name();
        let memo = if self.rng.bool() {
            Some(self.pick(&MEMOS).to_owned())
        } else {
            None
        };
        let settled = self.rng.int_n(3) == 0;
        let count = 1 + self.rng.int_n(4);
        let orders = (0..count).map(|_| self.order()).collect();
        DemoTab {
            name,
            memo,
            settled,
            orders,
        }
    }

    /// `count` tabs with distinct names; at least one open and one settled
    /// whenever `count >= 2`.
    pub fn tabs(&mut self, count: usize) -> Vec<DemoTab> {
        let mut tabs: Vec<DemoTab> = Vec::with_capacity(count);
        let mut attempts = 0;
        while tabs.len() < count && attempts < count * 20 {
            attempts += 1;
            let tab = self.tab();
            if tabs.iter().any(|existing| existing.name == tab.name) {
                continue;
            }
            tabs.push(tab);
        }

        if tabs.len() >= 2 {
            if tabs.iter().all(|tab| tab.settled) {
                tabs[0].settled = false;
            }
            if tabs.iter().all(|tab| !tab.settled) {
                let last = tabs.len() - 1;
                tabs[last].settled = true;
            }
        }
        tabs
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("mikapi.db");
    Ok((dir, db_path))
}

pub fn menu_items() -> impl Iterator<Item = &'static str> {
    MENU.iter().map(|(item, _)| *item)
}
