//! Elasticsearch-compatible HTTP backend.
//!
//! A partition maps to the physical index `<name>-<partition>`; documents live
//! at `/<index>/_doc/<key>`. Requests rotate over the configured nodes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roomscout_shared::{Locale, Result, RoomscoutError};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::SearchIndex;
use crate::mapping;

const USER_AGENT: &str = concat!("roomscout/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn index_err(e: impl std::fmt::Display) -> RoomscoutError {
    RoomscoutError::Index(e.to_string())
}

/// HTTP index client.
pub struct ElasticIndex {
    client: Client,
    nodes: Vec<Url>,
    next: AtomicUsize,
    name: String,
}

impl ElasticIndex {
    /// Build a client for `nodes` writing under the index prefix `name`.
    ///
    /// No request is made here; an unreachable node surfaces on first use.
    pub fn connect(nodes: &[String], name: &str) -> Result<Self> {
        if nodes.is_empty() {
            return Err(RoomscoutError::config("no index nodes specified"));
        }

        let nodes = nodes
            .iter()
            .map(|node| {
                Url::parse(node)
                    .map_err(|e| RoomscoutError::config(format!("invalid index node {node}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RoomscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            nodes,
            next: AtomicUsize::new(0),
            name: name.to_string(),
        })
    }

    /// Physical index name for a partition.
    pub fn index_name(&self, partition: &str) -> String {
        format!("{}-{partition}", self.name)
    }

    fn node(&self) -> &Url {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        &self.nodes[i]
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.node().clone();
        url.path_segments_mut()
            .map_err(|()| RoomscoutError::config("index node cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Prepare one physical index per locale.
    ///
    /// Existing indices are deleted first when `drop_on_startup` is set;
    /// absent ones are created with the locale's mapping.
    #[instrument(skip_all, fields(index = %self.name, drop_on_startup = drop_on_startup))]
    pub async fn bootstrap(&self, locales: &[Locale], drop_on_startup: bool) -> Result<()> {
        for locale in locales {
            let index = self.index_name(&locale.partition());
            let mut exists = self.exists(&index).await?;

            if exists && drop_on_startup {
                self.delete_index(&index).await?;
                exists = false;
            }

            if exists {
                debug!(%index, "index already present");
                continue;
            }

            self.create_index(&index, locale).await?;
        }
        Ok(())
    }

    async fn exists(&self, index: &str) -> Result<bool> {
        let response = self
            .client
            .head(self.url(&[index])?)
            .send()
            .await
            .map_err(index_err)?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(RoomscoutError::Index(format!(
                "existence check for {index} returned HTTP {s}"
            ))),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&[index])?)
            .send()
            .await
            .map_err(index_err)?;

        if !response.status().is_success() {
            return Err(RoomscoutError::Index(format!(
                "deleting {index} returned HTTP {}",
                response.status()
            )));
        }
        warn!(%index, "dropped existing index");
        Ok(())
    }

    async fn create_index(&self, index: &str, locale: &Locale) -> Result<()> {
        let body = mapping::hotel_mapping(locale);
        let response = self
            .client
            .put(self.url(&[index])?)
            .json(&body)
            .send()
            .await
            .map_err(index_err)?;

        let status = response.status();
        let reply: Value = response.json().await.map_err(index_err)?;
        let acknowledged = reply
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !status.is_success() || !acknowledged {
            return Err(RoomscoutError::Index(format!(
                "index {index} was not acknowledged (HTTP {status})"
            )));
        }

        info!(%index, analyzer = mapping::analyzer_for(locale), "created index");
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn upsert(&self, partition: &str, key: &str, document: &Value) -> Result<()> {
        let index = self.index_name(partition);
        let response = self
            .client
            .put(self.url(&[index.as_str(), "_doc", key])?)
            .json(document)
            .send()
            .await
            .map_err(index_err)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RoomscoutError::Index(format!(
                "upsert {index}/{key} returned HTTP {status}: {detail}"
            )));
        }
        Ok(())
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<Value>> {
        let index = self.index_name(partition);
        let response = self
            .client
            .get(self.url(&[index.as_str(), "_doc", key])?)
            .send()
            .await
            .map_err(index_err)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let mut reply: Value = response.json().await.map_err(index_err)?;
                Ok(reply.get_mut("_source").map(Value::take))
            }
            s => Err(RoomscoutError::Index(format!(
                "get {index}/{key} returned HTTP {s}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "elastic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_empty_node_list() {
        let err = ElasticIndex::connect(&[], "booking").err().unwrap();
        assert!(err.to_string().contains("no index nodes"));
    }

    #[test]
    fn rotates_over_nodes() {
        let index = ElasticIndex::connect(
            &["http://a:9200".into(), "http://b:9200/".into()],
            "booking",
        )
        .unwrap();

        let first = index.url(&["booking-hotel-en", "_doc", "x"]).unwrap();
        let second = index.url(&["booking-hotel-en", "_doc", "x"]).unwrap();
        let third = index.url(&["booking-hotel-en", "_doc", "x"]).unwrap();

        assert_eq!(first.as_str(), "http://a:9200/booking-hotel-en/_doc/x");
        assert_eq!(second.as_str(), "http://b:9200/booking-hotel-en/_doc/x");
        assert_eq!(third.host_str(), Some("a"));
    }

    #[tokio::test]
    async fn upsert_puts_document_by_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/booking-hotel-en/_doc/abzakovo-park"))
            .and(body_partial_json(json!({"name": "Abzakovo Park"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        index
            .upsert("hotel-en", "abzakovo-park", &json!({"name": "Abzakovo Park"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upsert_rejection_is_an_index_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        let err = index
            .upsert("hotel-en", "a", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, RoomscoutError::Index(_)));
        assert!(err.to_string().contains("mapper_parsing_exception"));
    }

    #[tokio::test]
    async fn get_returns_source_or_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/booking-hotel-ru/_doc/found"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "booking-hotel-ru",
                "_id": "found",
                "found": true,
                "_source": {"name": "Медведь"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/booking-hotel-ru/_doc/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"found": false})))
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        assert_eq!(
            index.get("hotel-ru", "found").await.unwrap(),
            Some(json!({"name": "Медведь"}))
        );
        assert_eq!(index.get("hotel-ru", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn bootstrap_drops_and_creates() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/booking-hotel-en"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/booking-hotel-en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/booking-hotel-en"))
            .and(body_partial_json(json!({
                "mappings": {"properties": {"location": {"type": "geo_point"}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        index.bootstrap(&[Locale::new("en")], true).await.unwrap();
    }

    #[tokio::test]
    async fn bootstrap_keeps_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(0)
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        index
            .bootstrap(&[Locale::new("en"), Locale::new("ru")], false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bootstrap_unacknowledged_create_fails() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": false})))
            .mount(&server)
            .await;

        let index = ElasticIndex::connect(&[server.uri()], "booking").unwrap();
        let err = index
            .bootstrap(&[Locale::new("ru")], false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not acknowledged"));
    }
}
