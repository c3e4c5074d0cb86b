//! Minimal client for the Metropolitan Museum collection API.
//!
//! One GET per object id; no batching, no retry. Calls are instrumented with the object id,
//! status and latency.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::domain::{ArtworkId, ArtworkMetadata};
use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://collectionapi.metmuseum.org/public/collection/v1";

#[derive(Clone)]
pub struct MetClient {
  pub client: reqwest::Client,
  pub base_url: String,
}

/// Subset of the object record we display.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetObject {
  #[serde(default)]
  primary_image_small: String,
  #[serde(default)]
  artist_display_name: String,
  #[serde(default)]
  title: String,
  #[serde(default)]
  object_end_date: i64,
  #[serde(default)]
  medium: String,
  #[serde(default)]
  tags: Option<Vec<MetTag>>,
}

#[derive(Debug, Deserialize)]
struct MetTag {
  term: String,
}

impl MetClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let base_url: String = base_url.into();
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  pub fn object_url(&self, id: ArtworkId) -> String {
    format!("{}/objects/{}", self.base_url, id)
  }

  #[instrument(level = "info", skip(self), fields(%id))]
  pub async fn fetch_artwork(&self, id: ArtworkId) -> Result<ArtworkMetadata, FetchError> {
    let url = self.object_url(id);
    let start = Instant::now();
    let res = self.client.get(&url)
      .header(USER_AGENT, "odd-art-out/0.1")
      .header(ACCEPT, "application/json")
      .send().await
      .map_err(|e| FetchError::Network { id, message: e.to_string() })?;

    let status = res.status();
    if !status.is_success() {
      warn!(target: "met", %id, %status, elapsed = ?start.elapsed(), "Museum API error status");
      return Err(FetchError::Status { id, status: status.as_u16() });
    }

    let obj: MetObject = res.json().await.map_err(|e| {
      if e.is_decode() {
        FetchError::Malformed { id, message: e.to_string() }
      } else {
        FetchError::Network { id, message: e.to_string() }
      }
    })?;
    debug!(target: "met", %id, elapsed = ?start.elapsed(), "Museum object fetched");
    Ok(to_metadata(id, obj))
  }
}

fn to_metadata(id: ArtworkId, obj: MetObject) -> ArtworkMetadata {
  let tags: Vec<String> = obj.tags.unwrap_or_default().into_iter().map(|t| format!(" {}", t.term)).collect();
  let alt_text = format!("Title: {}. Medium: {}. Contains:{}.", obj.title, obj.medium, tags.join(","));
  ArtworkMetadata {
    id,
    image_url: obj.primary_image_small,
    alt_text,
    artist_display_name: obj.artist_display_name,
    title: obj.title,
    year: obj.object_end_date,
  }
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn sample_object() -> serde_json::Value {
    serde_json::json!({
      "objectID": 437127,
      "primaryImageSmall": "https://images.metmuseum.org/small.jpg",
      "artistDisplayName": "Claude Monet",
      "title": "Bridge over a Pond of Water Lilies",
      "objectEndDate": 1899,
      "medium": "Oil on canvas",
      "tags": [{ "term": "Bridges" }, { "term": "Water Lilies" }]
    })
  }

  #[test]
  fn alt_text_lists_tags() {
    let obj: MetObject = serde_json::from_value(sample_object()).unwrap();
    let meta = to_metadata(437127, obj);
    assert_eq!(
      meta.alt_text,
      "Title: Bridge over a Pond of Water Lilies. Medium: Oil on canvas. Contains: Bridges, Water Lilies."
    );
    assert_eq!(meta.year, 1899);
  }

  #[test]
  fn null_tags_are_empty() {
    let obj: MetObject =
      serde_json::from_value(serde_json::json!({ "title": "T", "medium": "M", "tags": null })).unwrap();
    assert_eq!(to_metadata(1, obj).alt_text, "Title: T. Medium: M. Contains:.");
  }

  #[tokio::test]
  async fn fetch_maps_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/objects/437127"))
      .respond_with(ResponseTemplate::new(200).set_body_json(sample_object()))
      .mount(&server)
      .await;

    let client = MetClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let meta = client.fetch_artwork(437127).await.unwrap();
    assert_eq!(meta.artist_display_name, "Claude Monet");
    assert_eq!(meta.image_url, "https://images.metmuseum.org/small.jpg");
  }

  #[tokio::test]
  async fn fetch_reports_status_and_malformed_bodies() {
    let server = MockServer::start().await;
    Mock::given(path("/objects/1"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;
    Mock::given(path("/objects/2"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
      .mount(&server)
      .await;

    let client = MetClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    assert!(matches!(client.fetch_artwork(1).await, Err(FetchError::Status { id: 1, status: 404 })));
    assert!(matches!(client.fetch_artwork(2).await, Err(FetchError::Malformed { id: 2, .. })));
  }
}
