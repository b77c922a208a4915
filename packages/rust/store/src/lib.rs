//! Document-store HTTP client.
//!
//! Thin typed wrapper over the store's REST API: database property
//! management, title lookup, page creation/update/archival, and paginated
//! block upload. The translation engine only produces the block payloads;
//! everything here is the surrounding glue that persists them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use pagelift_shared::{Block, PageliftError, Result};

/// API version header value sent with every request.
const API_VERSION: &str = "2022-06-28";

/// Per-request ceiling on block-children payloads imposed by the store.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One page matched by a title query.
#[derive(Debug, Clone)]
pub struct QueryHit {
    /// Page identifier.
    pub id: String,
    /// Remote `last modified` property, when present and parseable.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Properties and cover captured from an existing page, preserved across an
/// archive-and-recreate update.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub properties: Value,
    pub cover: Option<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client for one database of the document store.
pub struct StoreClient {
    http: Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl StoreClient {
    /// Create a client for `database_id` against `base_url`
    /// (e.g. `https://api.notion.com/v1`; overridable for tests).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PageliftError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            database_id: database_id.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request with auth/version headers and parse the JSON body,
    /// mapping transport and status failures to tagged errors.
    async fn execute(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| PageliftError::Network(format!("{operation}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PageliftError::Network(format!("{operation}: body read failed: {e}")))?;

        if !status.is_success() {
            return Err(PageliftError::store(
                operation,
                format!("HTTP {status}: {body}"),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| PageliftError::store(operation, format!("invalid JSON response: {e}")))
    }

    // -----------------------------------------------------------------------
    // Database schema
    // -----------------------------------------------------------------------

    /// Fetch the database's property map.
    pub async fn database_properties(&self) -> Result<Value> {
        let url = self.url(&format!("/databases/{}", self.database_id));
        let data = self.execute("database_properties", self.http.get(url)).await?;
        Ok(data["properties"].clone())
    }

    /// Create a database property if it does not already exist.
    #[instrument(skip(self))]
    pub async fn ensure_property(&self, name: &str, kind: &str) -> Result<()> {
        let properties = self.database_properties().await?;
        if properties.get(name).is_some() {
            return Ok(());
        }

        let url = self.url(&format!("/databases/{}", self.database_id));
        let payload = json!({ "properties": { name: { kind: {} } } });
        self.execute("ensure_property", self.http.patch(url).json(&payload))
            .await?;
        info!(name, kind, "created missing database property");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pages
    // -----------------------------------------------------------------------

    /// Find pages whose title property equals `title`.
    #[instrument(skip(self))]
    pub async fn query_by_title(&self, title: &str) -> Result<Vec<QueryHit>> {
        let url = self.url(&format!("/databases/{}/query", self.database_id));
        let payload = json!({
            "filter": { "property": "title", "title": { "equals": title } }
        });
        let data = self
            .execute("query_by_title", self.http.post(url).json(&payload))
            .await?;

        let hits: Vec<QueryHit> = data["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|result| {
                        let id = result["id"].as_str()?.to_string();
                        let last_modified = result["properties"]["last modified"]["date"]
                            ["start"]
                            .as_str()
                            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                            .map(|dt| dt.with_timezone(&Utc));
                        Some(QueryHit { id, last_modified })
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(title, hits = hits.len(), "title query complete");
        Ok(hits)
    }

    /// Capture an existing page's properties and cover.
    pub async fn page_snapshot(&self, page_id: &str) -> Result<PageSnapshot> {
        let url = self.url(&format!("/pages/{page_id}"));
        let data = self.execute("page_snapshot", self.http.get(url)).await?;

        let properties = data
            .get("properties")
            .cloned()
            .ok_or_else(|| PageliftError::store("page_snapshot", "response has no properties"))?;
        let cover = data.get("cover").filter(|c| !c.is_null()).cloned();

        Ok(PageSnapshot { properties, cover })
    }

    /// Create a page in the database with up to the first
    /// [`MAX_BLOCKS_PER_REQUEST`] children. Returns the new page id; the
    /// caller appends any remaining blocks separately.
    #[instrument(skip_all, fields(children = children.len()))]
    pub async fn create_page(
        &self,
        properties: Value,
        cover: Value,
        children: &[Block],
    ) -> Result<String> {
        let first: Vec<Value> = children
            .iter()
            .take(MAX_BLOCKS_PER_REQUEST)
            .map(Block::to_json)
            .collect();

        let payload = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
            "cover": cover,
            "children": first,
        });

        let url = self.url("/pages");
        let data = self
            .execute("create_page", self.http.post(url).json(&payload))
            .await?;

        data["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PageliftError::store("create_page", "response has no page id"))
    }

    /// Append blocks to a page, chunked to respect the per-request ceiling.
    #[instrument(skip_all, fields(page_id = %page_id, blocks = blocks.len()))]
    pub async fn append_blocks(&self, page_id: &str, blocks: &[Block]) -> Result<()> {
        let url = self.url(&format!("/blocks/{page_id}/children"));

        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let payload = json!({
                "children": chunk.iter().map(Block::to_json).collect::<Vec<_>>(),
            });
            self.execute("append_blocks", self.http.patch(&url).json(&payload))
                .await?;
        }
        Ok(())
    }

    /// Archive (soft-delete) a page.
    pub async fn archive_page(&self, page_id: &str) -> Result<()> {
        let url = self.url(&format!("/pages/{page_id}"));
        let payload = json!({ "archived": true });
        self.execute("archive_page", self.http.patch(url).json(&payload))
            .await?;
        info!(page_id, "page archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelift_shared::{Color, TextSpan};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            rich_text: vec![TextSpan::plain(text)],
            color: Color::Default,
        }
    }

    async fn client_for(server: &MockServer) -> StoreClient {
        StoreClient::new(server.uri(), "secret-key", "db-1").unwrap()
    }

    #[tokio::test]
    async fn query_by_title_parses_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases/db-1/query"))
            .and(body_partial_json(json!({
                "filter": { "property": "title", "title": { "equals": "My Note" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": "page-1",
                    "properties": {
                        "last modified": { "date": { "start": "2024-03-01T10:30:00+00:00" } }
                    }
                }]
            })))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .await
            .query_by_title("My Note")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "page-1");
        let lm = hits[0].last_modified.unwrap();
        assert_eq!(lm.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 10:30");
    }

    #[tokio::test]
    async fn query_by_title_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .await
            .query_by_title("missing")
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn create_page_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .and(body_partial_json(json!({
                "parent": { "database_id": "db-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-page" })))
            .mount(&server)
            .await;

        let id = client_for(&server)
            .await
            .create_page(
                json!({ "title": { "title": [{ "text": { "content": "T" } }] } }),
                json!({ "type": "external", "external": { "url": "https://x/c.png" } }),
                &[paragraph("hello")],
            )
            .await
            .unwrap();
        assert_eq!(id, "new-page");
    }

    #[tokio::test]
    async fn create_page_caps_children_at_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p" })))
            .mount(&server)
            .await;

        let blocks: Vec<Block> = (0..120).map(|i| paragraph(&format!("b{i}"))).collect();
        client_for(&server)
            .await
            .create_page(json!({}), json!({}), &blocks)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["children"].as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn append_blocks_chunks_requests() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/page-9/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let blocks: Vec<Block> = (0..150).map(|i| paragraph(&format!("b{i}"))).collect();
        client_for(&server)
            .await
            .append_blocks("page-9", &blocks)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(first["children"].as_array().unwrap().len(), 100);
        assert_eq!(second["children"].as_array().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn ensure_property_skips_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": { "last modified": { "date": {} } }
            })))
            .mount(&server)
            .await;
        // No PATCH mock mounted: a creation attempt would 404 and fail.

        client_for(&server)
            .await
            .ensure_property("last modified", "date")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_property_creates_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "properties": {} })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/databases/db-1"))
            .and(body_partial_json(json!({
                "properties": { "category": { "select": {} } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .ensure_property("category", "select")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn archive_page_patches_archived_flag() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/pages/page-3"))
            .and(body_partial_json(json!({ "archived": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .archive_page("page-3")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn http_failure_maps_to_store_error_with_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .create_page(json!({}), json!({}), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PageliftError::Store { .. }));
        assert!(err.to_string().contains("create_page"));
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn requests_carry_auth_and_version_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/db-1"))
            .and(wiremock::matchers::header("Authorization", "Bearer secret-key"))
            .and(wiremock::matchers::header("Notion-Version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "properties": {} })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .database_properties()
            .await
            .unwrap();
    }
}
