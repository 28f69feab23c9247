//! Record store backed by the hosted database's PostgREST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::models::{parse_timestamp, CalendarRecord};
use crate::store::RecordStore;
use crate::{Error, Result};

/// PostgREST code for "single object requested, zero rows returned".
const NO_ROWS_CODE: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Row sent to PostgREST on upsert.
#[derive(Debug, Serialize)]
struct RestRow<'a> {
    id: &'a str,
    settings: &'a Value,
    calendar_data: &'a Value,
    updated_at: DateTime<Utc>,
}

/// Row returned by PostgREST. `updated_at` is read loosely; GET never needs it.
#[derive(Debug, Deserialize)]
struct RestRowOut {
    #[serde(default)]
    settings: Value,
    #[serde(default)]
    calendar_data: Value,
    #[serde(default)]
    updated_at: Option<Value>,
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct RestError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RestRecordStore {
    client: Client,
    endpoint: String,
    key: String,
}

impl RestRecordStore {
    pub fn new(base_url: &str, key: &str, table: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            key: key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

/// Turn a non-success response into a store error.
async fn store_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<RestError>(&body) {
        Ok(RestError { code, message }) => Error::Store {
            code: code.unwrap_or_else(|| status.as_u16().to_string()),
            message: message.unwrap_or(body),
        },
        Err(_) => Error::Store {
            code: status.as_u16().to_string(),
            message: body,
        },
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn get(&self, id: &str) -> Result<Option<CalendarRecord>> {
        let response = self
            .request(reqwest::Method::GET)
            .header("Accept", SINGLE_OBJECT)
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return match store_error(response).await {
                Error::Store { code, .. } if code == NO_ROWS_CODE => {
                    debug!(id, "No calendar record found");
                    Ok(None)
                }
                err => Err(err),
            };
        }

        let row: RestRowOut = response.json().await?;
        let updated_at = row
            .updated_at
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or_default();

        Ok(Some(CalendarRecord {
            settings: row.settings,
            calendar_data: row.calendar_data,
            updated_at,
        }))
    }

    async fn upsert(&self, id: &str, record: &CalendarRecord) -> Result<()> {
        let row = RestRow {
            id,
            settings: &record.settings,
            calendar_data: &record.calendar_data,
            updated_at: record.updated_at,
        };

        let response = self
            .request(reqwest::Method::POST)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;
    use serde_json::json;

    fn row_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "eq.main".into()),
            Matcher::UrlEncoded("select".into(), "*".into()),
        ])
    }

    #[tokio::test]
    async fn test_get_existing_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/ccr_data")
            .match_query(row_query())
            .match_header("apikey", "test-key")
            .match_header("authorization", "Bearer test-key")
            .match_header("accept", SINGLE_OBJECT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"main","settings":{"a":1},"calendar_data":{"2024-01":["x"]},"updated_at":"2024-01-02T03:04:05.123+00:00"}"#,
            )
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        let record = store.get("main").await.unwrap().unwrap();

        assert_eq!(record.settings, json!({"a": 1}));
        assert_eq!(record.calendar_data, json!({"2024-01": ["x"]}));
        assert_eq!(record.updated_at.to_rfc3339(), "2024-01-02T03:04:05.123+00:00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_tolerates_loose_updated_at() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/ccr_data")
            .match_query(row_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"main","settings":{"a":1},"calendar_data":{"2024-01":["x"]},"updated_at":"2024-01-02T03:04:05.123"}"#,
            )
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        let record = store.get("main").await.unwrap().unwrap();

        assert_eq!(record.settings, json!({"a": 1}));
        assert_eq!(record.calendar_data, json!({"2024-01": ["x"]}));
        assert_eq!(record.updated_at.to_rfc3339(), "2024-01-02T03:04:05.123+00:00");
    }

    #[tokio::test]
    async fn test_get_unparseable_updated_at_still_reads() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/ccr_data")
            .match_query(row_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"main","settings":null,"calendar_data":{"k":1},"updated_at":12345}"#)
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        let record = store.get("main").await.unwrap().unwrap();

        assert_eq!(record.calendar_data, json!({"k": 1}));
        assert_eq!(record.updated_at, DateTime::<Utc>::default());
    }

    #[tokio::test]
    async fn test_get_no_rows_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/ccr_data")
            .match_query(row_query())
            .with_status(406)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
            )
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        assert!(store.get("main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_other_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/ccr_data")
            .match_query(row_query())
            .with_status(404)
            .with_body(r#"{"code":"42P01","message":"relation \"public.ccr_data\" does not exist"}"#)
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        match store.get("main").await {
            Err(Error::Store { code, .. }) => assert_eq!(code, "42P01"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upsert_posts_full_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/ccr_data")
            .match_header("prefer", "resolution=merge-duplicates,return=minimal")
            .match_header("apikey", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "id": "main",
                "settings": {"a": 1},
                "calendar_data": null,
                "updated_at": "2024-01-02T03:04:05Z"
            })))
            .with_status(201)
            .create_async()
            .await;

        let record = CalendarRecord {
            settings: json!({"a": 1}),
            calendar_data: Value::Null,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let store = RestRecordStore::new(&format!("{}/", server.url()), "test-key", "ccr_data").unwrap();
        store.upsert("main", &record).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upsert_failure_without_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/ccr_data")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let store = RestRecordStore::new(&server.url(), "test-key", "ccr_data").unwrap();
        match store
            .upsert("main", &CalendarRecord::new(Value::Null, Value::Null))
            .await
        {
            Err(Error::Store { code, message }) => {
                assert_eq!(code, "502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
