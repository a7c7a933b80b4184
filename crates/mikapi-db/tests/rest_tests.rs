// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use mikapi_app::{CustomerId, OrderDraft, OrderId};
use mikapi_db::{RestBackend, Store, TableNames};
use serde_json::Value;
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

#[derive(Debug)]
struct Captured {
    method: Method,
    url: String,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: String,
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn json_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

type MockServer = (String, mpsc::Receiver<Captured>, thread::JoinHandle<()>);

/// Serves one canned response per request and reports what each request looked like.
fn serve(responses: Vec<(u16, &'static str)>) -> Result<MockServer> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    let (sender, receiver) = mpsc::channel();

    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let mut request = server.recv().expect("request expected");
            let mut payload = String::new();
            request
                .as_reader()
                .read_to_string(&mut payload)
                .expect("request body should read");
            let captured = Captured {
                method: request.method().clone(),
                url: request.url().to_owned(),
                apikey: header(&request, "apikey"),
                authorization: header(&request, "Authorization"),
                prefer: header(&request, "Prefer"),
                body: payload,
            };
            request
                .respond(json_response(status, body))
                .expect("response should succeed");
            sender.send(captured).expect("capture should send");
        }
    });

    Ok((addr, receiver, handle))
}

fn store(addr: &str) -> Result<Store<RestBackend>> {
    let backend = RestBackend::new(addr, "service-key", Duration::from_secs(2))?;
    Store::new(backend, TableNames::default())
}

#[test]
fn list_customers_filters_on_settled() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(
        200,
        r#"[{"id":2,"name":"Sato","settled":false,"memo":null,"created_at":"2026-02-19T12:34:56+00:00"},
            {"id":1,"name":"Tanaka","settled":false,"memo":"window seat","created_at":null}]"#,
    )])?;

    let customers = store(&addr)?.list_customers(false)?;
    let names: Vec<&str> = customers.iter().map(|customer| customer.name.as_str()).collect();
    assert_eq!(names, vec!["Tanaka", "Sato"]);

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Get);
    assert_eq!(
        request.url,
        "/rest/v1/mikapi_customers?settled=eq.false&select=*"
    );
    assert_eq!(request.apikey.as_deref(), Some("service-key"));
    assert_eq!(request.authorization.as_deref(), Some("Bearer service-key"));

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn create_customer_posts_and_returns_the_row() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(
        201,
        r#"[{"id":7,"name":"Tanaka","settled":false,"memo":null}]"#,
    )])?;

    let created = store(&addr)?
        .create_customer("Tanaka")?
        .expect("row should come back");
    assert_eq!(created.id, CustomerId::new(7));

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/rest/v1/mikapi_customers");
    assert_eq!(request.prefer.as_deref(), Some("return=representation"));
    let body: Value = serde_json::from_str(&request.body)?;
    assert_eq!(body, serde_json::json!({ "name": "Tanaka", "settled": false }));

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn blank_customer_name_sends_nothing() -> Result<()> {
    // Nothing listens here; any request would fail.
    let store = store("http://127.0.0.1:1")?;
    assert!(store.create_customer("  ")?.is_none());
    Ok(())
}

#[test]
fn upsert_with_id_patches_by_id_and_writes_the_name_snapshot() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(
        200,
        r#"[{"id":5,"customer_id":3,"name":"Tanaka","item":"ramen","quantity":3,"price":800}]"#,
    )])?;

    let mut draft = OrderDraft::new("ramen", 3, 800);
    draft.id = Some(OrderId::new(5));
    let order = store(&addr)?.upsert_order(CustomerId::new(3), "Tanaka", &draft)?;
    assert_eq!(order.quantity, 3);

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.url, "/rest/v1/mikapi_orders?id=eq.5");
    let body: Value = serde_json::from_str(&request.body)?;
    assert_eq!(body["name"], "Tanaka");
    assert_eq!(body["quantity"], 3);
    assert!(body.get("customer_id").is_none());

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn upsert_without_id_posts_customer_id_and_name_snapshot() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(
        201,
        r#"[{"id":12,"customer_id":3,"name":"Tanaka","item":"gyoza","quantity":1,"price":500}]"#,
    )])?;

    let order = store(&addr)?.upsert_order(
        CustomerId::new(3),
        "Tanaka",
        &OrderDraft::new("gyoza", 1, 500),
    )?;
    assert_eq!(order.id, OrderId::new(12));
    assert_eq!(order.customer_name, "Tanaka");

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/rest/v1/mikapi_orders");
    assert_eq!(request.prefer.as_deref(), Some("return=representation"));
    let body: Value = serde_json::from_str(&request.body)?;
    assert_eq!(
        body,
        serde_json::json!({
            "customer_id": 3,
            "name": "Tanaka",
            "item": "gyoza",
            "quantity": 1,
            "price": 500,
        })
    );

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn uuid_keyed_rows_fail_with_a_hint_about_integer_ids() -> Result<()> {
    let (addr, _captured, handle) = serve(vec![(
        200,
        r#"[{"id":"8f14e45f-ceea-467f-a0e6-1b5c1d2a3b4c","name":"Sato","settled":false}]"#,
    )])?;

    let error = store(&addr)?
        .list_customers(false)
        .expect_err("uuid ids should not decode");
    let message = format!("{error:#}");
    assert!(message.contains("integer key"), "{message}");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn delete_order_sends_delete_with_id_filter() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(204, "")])?;

    store(&addr)?.delete_order(OrderId::new(9))?;

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.url, "/rest/v1/mikapi_orders?id=eq.9");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn mark_settled_patches_the_flag() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(
        200,
        r#"[{"id":4,"name":"Sato","settled":true}]"#,
    )])?;

    store(&addr)?.mark_settled(CustomerId::new(4))?;

    let request = captured.recv()?;
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.url, "/rest/v1/mikapi_customers?id=eq.4");
    assert_eq!(request.body, r#"{"settled":true}"#);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn server_error_message_reaches_the_caller() -> Result<()> {
    let (addr, _captured, handle) = serve(vec![(
        401,
        r#"{"message":"Invalid API key","hint":"Double check your Supabase `anon` or `service_role` API key."}"#,
    )])?;

    let error = store(&addr)?
        .list_customers(true)
        .expect_err("401 should fail");
    let message = format!("{error:#}");
    assert!(message.contains("query customers"), "{message}");
    assert!(message.contains("server error (401): Invalid API key"), "{message}");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn ping_probes_both_tables() -> Result<()> {
    let (addr, captured, handle) = serve(vec![(200, "[]"), (200, "[]")])?;

    store(&addr)?.ping()?;

    let first = captured.recv()?;
    let second = captured.recv()?;
    assert_eq!(first.url, "/rest/v1/mikapi_customers?select=id&limit=1");
    assert_eq!(second.url, "/rest/v1/mikapi_orders?select=id&limit=1");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn unreachable_backend_error_is_actionable() -> Result<()> {
    let store = store("http://127.0.0.1:1")?;
    let error = store.ping().expect_err("nothing listens on port 1");
    let message = format!("{error:#}");
    assert!(message.contains("cannot reach http://127.0.0.1:1"), "{message}");
    Ok(())
}
