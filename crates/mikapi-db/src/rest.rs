// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::{Filter, Row, TableBackend};

const REST_PREFIX: &str = "/rest/v1";

/// PostgREST table client. Every request carries the key as both `apikey`
/// and bearer token.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base_url: String,
    rest_root: String,
    key: String,
    http: HttpClient,
}

impl RestBackend {
    pub fn new(base_url: &str, key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("store.url must not be empty -- set SUPABASE_URL or [store] url");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("store.url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "store.url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if key.trim().is_empty() {
            bail!("store.key must not be empty -- set SUPABASE_SERVICE_ROLE_KEY or [store] key");
        }

        let rest_root = if base_url.ends_with(REST_PREFIX) {
            base_url.clone()
        } else {
            format!("{base_url}{REST_PREFIX}")
        };

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            rest_root,
            key: key.trim().to_owned(),
            http,
        })
    }

    pub fn table_url(&self, table: &str, filters: &[Filter]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{table}", self.rest_root))
            .with_context(|| format!("build URL for table {table}"))?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &filter_operand(&filter.value));
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Accept", "application/json")
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    fn read_rows(response: Response, what: &str) -> Result<Vec<Row>> {
        let rows: Vec<Row> = response
            .json()
            .with_context(|| format!("decode {what} response"))?;
        Ok(rows)
    }
}

impl TableBackend for RestBackend {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        let mut url = self.table_url(table, filters)?;
        url.query_pairs_mut().append_pair("select", "*");
        tracing::debug!(table, filters = filters.len(), "select");
        let response = self.send(self.http.get(url))?;
        Self::read_rows(response, "select")
    }

    fn insert(&self, table: &str, record: &Row) -> Result<Row> {
        let url = self.table_url(table, &[])?;
        tracing::debug!(table, "insert");
        let response = self.send(
            self.http
                .post(url)
                .header("Prefer", "return=representation")
                .json(record),
        )?;
        Self::read_rows(response, "insert")?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("insert into {table} returned no row"))
    }

    fn update(&self, table: &str, record: &Row, filters: &[Filter]) -> Result<Vec<Row>> {
        if filters.is_empty() {
            bail!("refusing to update every row of {table} -- pass a filter");
        }
        let url = self.table_url(table, filters)?;
        tracing::debug!(table, filters = filters.len(), "update");
        let response = self.send(
            self.http
                .patch(url)
                .header("Prefer", "return=representation")
                .json(record),
        )?;
        Self::read_rows(response, "update")
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        if filters.is_empty() {
            bail!("refusing to delete every row of {table} -- pass a filter");
        }
        let url = self.table_url(table, filters)?;
        tracing::debug!(table, filters = filters.len(), "delete");
        self.send(self.http.delete(url))?;
        Ok(())
    }

    fn probe(&self, table: &str) -> Result<()> {
        let mut url = self.table_url(table, &[])?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        self.send(self.http.get(url))?;
        Ok(())
    }
}

fn filter_operand(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_owned(),
        Value::String(text) => format!("eq.{text}"),
        other => format!("eq.{other}"),
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check the store URL and your network ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<PostgrestError>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        let mut text = format!("server error ({}): {}", status.as_u16(), message);
        if let Some(hint) = parsed.hint
            && !hint.is_empty()
        {
            text.push_str(&format!(" (hint: {hint})"));
        }
        return anyhow!(text);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "server returned {} -- check the service role key",
            status.as_u16()
        );
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{RestBackend, clean_error_response, filter_operand};
    use crate::Filter;
    use anyhow::Result;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::time::Duration;

    #[test]
    fn rest_root_is_appended_once() -> Result<()> {
        let plain = RestBackend::new("https://demo.supabase.co/", "key", Duration::from_secs(1))?;
        let url = plain.table_url("mikapi_orders", &[])?;
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/mikapi_orders");

        let prefixed = RestBackend::new(
            "https://demo.supabase.co/rest/v1",
            "key",
            Duration::from_secs(1),
        )?;
        let url = prefixed.table_url("mikapi_orders", &[])?;
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/mikapi_orders");
        Ok(())
    }

    #[test]
    fn filters_encode_as_postgrest_equality() -> Result<()> {
        let backend = RestBackend::new("http://localhost:3000", "key", Duration::from_secs(1))?;
        let url = backend.table_url(
            "mikapi_customers",
            &[Filter::eq("settled", false), Filter::eq("name", "Sato Ken")],
        )?;
        assert_eq!(
            url.query(),
            Some("settled=eq.false&name=eq.Sato+Ken"),
        );
        Ok(())
    }

    #[test]
    fn null_filters_use_is_operator() {
        assert_eq!(filter_operand(&Value::Null), "is.null");
        assert_eq!(filter_operand(&json!(12)), "eq.12");
        assert_eq!(filter_operand(&json!("ramen")), "eq.ramen");
    }

    #[test]
    fn construction_rejects_bad_settings() {
        let empty_key = RestBackend::new("http://localhost:3000", " ", Duration::from_secs(1))
            .expect_err("blank key should fail");
        assert!(empty_key.to_string().contains("SUPABASE_SERVICE_ROLE_KEY"));

        let bad_scheme = RestBackend::new("ftp://localhost", "key", Duration::from_secs(1))
            .expect_err("ftp should fail");
        assert!(bad_scheme.to_string().contains("http or https"));
    }

    #[test]
    fn error_body_message_and_hint_are_kept() {
        let error = clean_error_response(
            StatusCode::NOT_FOUND,
            r#"{"code":"42P01","details":null,"hint":"Perhaps you meant the table 'public.mikapi_orders'","message":"relation \"public.orders\" does not exist"}"#,
        );
        let message = error.to_string();
        assert!(message.starts_with("server error (404)"));
        assert!(message.contains("does not exist"));
        assert!(message.contains("hint: Perhaps"));
    }

    #[test]
    fn unauthorized_without_body_mentions_the_key() {
        let error = clean_error_response(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("service role key"));
    }
}
