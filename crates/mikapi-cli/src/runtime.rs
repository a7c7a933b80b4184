// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use mikapi_app::{
    Customer, CustomerDetail, CustomerId, LedgerDraft, OrderId, SaveReport, SettlementSummary,
};
use mikapi_db::{Store, TableBackend};

pub struct StoreRuntime<'a, B: TableBackend> {
    store: &'a Store<B>,
}

impl<'a, B: TableBackend> StoreRuntime<'a, B> {
    pub fn new(store: &'a Store<B>) -> Self {
        Self { store }
    }
}

impl<B: TableBackend> mikapi_tui::AppRuntime for StoreRuntime<'_, B> {
    fn load_customers(&mut self, settled: bool) -> Result<Vec<Customer>> {
        self.store.list_customers(settled)
    }

    fn load_settlements(&mut self) -> Result<Vec<SettlementSummary>> {
        self.store.settlement_summaries()
    }

    fn load_customer_detail(&mut self, customer_id: CustomerId) -> Result<Option<CustomerDetail>> {
        self.store.load_detail(customer_id)
    }

    fn create_customer(&mut self, name: &str) -> Result<Option<Customer>> {
        self.store.create_customer(name)
    }

    fn mark_settled(&mut self, customer_id: CustomerId) -> Result<()> {
        self.store.mark_settled(customer_id)
    }

    fn save_ledger(&mut self, ledger: &mut LedgerDraft) -> Result<SaveReport> {
        self.store.save_ledger(ledger)
    }

    fn delete_order(&mut self, order_id: OrderId) -> Result<()> {
        self.store.delete_order(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::Result;
    use mikapi_app::{LedgerDraft, OrderDraft};
    use mikapi_db::{SqliteBackend, Store, TableNames};
    use mikapi_tui::AppRuntime;

    fn memory_store() -> Result<Store<SqliteBackend>> {
        let tables = TableNames::default();
        let backend = SqliteBackend::open_memory()?;
        backend.bootstrap(&tables)?;
        Store::new(backend, tables)
    }

    #[test]
    fn created_customer_shows_up_as_open() -> Result<()> {
        let store = memory_store()?;
        let mut runtime = StoreRuntime::new(&store);

        let created = runtime
            .create_customer("Tanaka")?
            .expect("named customer should be created");
        let open = runtime.load_customers(false)?;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, created.id);
        assert!(runtime.load_customers(true)?.is_empty());
        Ok(())
    }

    #[test]
    fn ledger_save_then_settle_lands_in_settlements() -> Result<()> {
        let store = memory_store()?;
        let mut runtime = StoreRuntime::new(&store);
        let created = runtime
            .create_customer("Tanaka")?
            .expect("named customer should be created");

        let detail = runtime
            .load_customer_detail(created.id)?
            .expect("customer should load");
        let mut ledger = LedgerDraft::from_detail(&detail.customer, &detail.orders);
        ledger.rows.push(OrderDraft::new("ramen", 2, 800));
        ledger.rows.push(OrderDraft::new("gyoza", 1, 500));
        let report = runtime.save_ledger(&mut ledger)?;
        assert_eq!(report.inserted, 2);

        runtime.mark_settled(created.id)?;
        let settlements = runtime.load_settlements()?;
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].total, 2100);
        assert_eq!(settlements[0].orders.len(), 2);
        Ok(())
    }

    #[test]
    fn delete_order_removes_the_line() -> Result<()> {
        let store = memory_store()?;
        let customer = store
            .create_customer("Sato")?
            .expect("named customer should be created");
        let order = store.upsert_order(customer.id, "Sato", &OrderDraft::new("udon", 1, 700))?;

        let mut runtime = StoreRuntime::new(&store);
        runtime.delete_order(order.id)?;
        assert!(store.list_orders(customer.id)?.is_empty());
        Ok(())
    }

    #[test]
    fn blank_name_creates_nothing() -> Result<()> {
        let store = memory_store()?;
        let mut runtime = StoreRuntime::new(&store);
        assert!(runtime.create_customer("   ")?.is_none());
        assert!(runtime.load_customers(false)?.is_empty());
        Ok(())
    }
}
