//! Stored response CRUD operations.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A snapshot of a response captured for a request identity.
///
/// The body is owned bytes, so a stored response can be read any number of
/// times once it has been captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Request identity key for this entry.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type EntryRow = (String, String, u16, String, String, Vec<u8>, String);

fn decode_row(row: EntryRow) -> Result<StoredResponse, Error> {
    let (method, url, status, status_text, headers_json, body, stored_at) = row;
    let headers = serde_json::from_str(&headers_json)
        .map_err(|e| Error::CorruptEntry(format!("headers for {url}: {e}")))?;
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| Error::CorruptEntry(format!("stored_at for {url}: {e}")))?
        .with_timezone(&Utc);
    Ok(StoredResponse { method, url, status, status_text, headers, body, stored_at })
}

impl CacheDb {
    /// Insert or overwrite the entry for a response's request identity.
    ///
    /// Creates the store if it does not exist yet. A full overwrite, never a
    /// merge with the previous entry.
    pub async fn put_entry(&self, store: &str, response: &StoredResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key = response.key();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![&store, Utc::now().to_rfc3339()],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                    store_name, key_hash, method, url, status, status_text,
                    headers_json, body, body_size, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(store_name, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    body_size = excluded.body_size,
                    stored_at = excluded.stored_at",
                    params![
                        &store,
                        &key,
                        &response.method,
                        &response.url,
                        response.status,
                        &response.status_text,
                        &headers_json,
                        &response.body,
                        response.body.len() as i64,
                        response.stored_at.to_rfc3339(),
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a request identity key in a store.
    ///
    /// Returns None on a miss, including when the store does not exist.
    pub async fn match_entry(&self, store: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE store_name = ?1 AND key_hash = ?2",
                    params![store, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_test_response(url: &str, body: &str) -> StoredResponse {
        StoredResponse {
            method: "GET".to_string(),
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
            stored_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = make_test_response("https://example.com/index.html", "<html></html>");

        db.put_entry("app-static-v1", &response).await.unwrap();

        let retrieved = db.match_entry("app-static-v1", &response.key()).await.unwrap().unwrap();
        assert_eq!(retrieved, response);
        assert_eq!(db.list_store_names().await.unwrap(), vec!["app-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("s", &make_test_response("https://example.com/a", "one"))
            .await
            .unwrap();
        db.put_entry("s", &make_test_response("https://example.com/a", "two"))
            .await
            .unwrap();

        assert_eq!(db.count_entries("s").await.unwrap(), 1);
        let entry = db
            .match_entry("s", &compute_request_key("GET", "https://example.com/a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.body, b"two");
    }

    #[tokio::test]
    async fn test_match_missing_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db
            .match_entry("nope", &compute_request_key("GET", "https://example.com/"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_entries_scoped_to_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = make_test_response("https://example.com/a", "x");
        db.put_entry("one", &response).await.unwrap();

        assert!(db.match_entry("two", &response.key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = make_test_response("https://example.com/a", "x");
        db.put_entry("s", &response).await.unwrap();

        db.delete_store("s").await.unwrap();
        db.open_store("s").await.unwrap();

        assert!(db.match_entry("s", &response.key()).await.unwrap().is_none());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = make_test_response("https://example.com/", "");
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.header("date"), None);
    }
}
