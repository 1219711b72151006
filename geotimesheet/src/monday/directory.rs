//! Site directory implementation over the Monday.com sites board.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::coord::Coordinate;
use crate::site::{DirectoryError, Site, SiteDirectory, SiteId};

use super::client::{id_from_value, numeric_id, MondayClient};
use super::{MondayConfig, MondayError};

const SITES_QUERY: &str = "query ($board: Int!, $column: String!) {\
 boards (ids: [$board]) { items { id column_values (ids: [$column]) {\
 ... on LocationValue { lat lng } } } } }";

/// Site directory backed by the Monday.com sites board.
///
/// Each item on the board is one site; its position comes from the
/// configured location column. Items without a usable location are skipped
/// rather than failing the snapshot, so one half-filled row never blinds
/// the tracker to every other site.
pub struct MondaySiteDirectory {
    client: Arc<MondayClient>,
    config: MondayConfig,
}

impl MondaySiteDirectory {
    /// Create a directory over an existing client.
    pub fn new(client: Arc<MondayClient>, config: MondayConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_inner(&self) -> Result<Vec<Site>, MondayError> {
        let board = numeric_id(&self.config.sites_board)?;
        let data = self
            .client
            .execute(
                SITES_QUERY,
                json!({
                    "board": board,
                    "column": self.config.columns.location,
                }),
            )
            .await?;

        let items = data
            .get("boards")
            .and_then(Value::as_array)
            .and_then(|boards| boards.first())
            .and_then(|b| b.get("items"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                MondayError::MissingData("sites board query returned no items".to_string())
            })?;

        let mut sites = Vec::with_capacity(items.len());
        for item in items {
            match parse_site(item) {
                Some(site) => sites.push(site),
                None => {
                    tracing::debug!(
                        item = %item.get("id").cloned().unwrap_or(serde_json::Value::Null),
                        "Skipping site item without a usable location"
                    );
                }
            }
        }
        Ok(sites)
    }
}

fn parse_site(item: &Value) -> Option<Site> {
    let id = item.get("id").and_then(id_from_value)?;
    let location = item
        .get("column_values")
        .and_then(Value::as_array)
        .and_then(|values| values.first())?;

    let lat = location.get("lat").and_then(Value::as_f64)?;
    let lng = location.get("lng").and_then(Value::as_f64)?;
    let coordinate = Coordinate::new(lat, lng).ok()?;

    Some(Site {
        id: SiteId::new(id),
        location: coordinate,
    })
}

impl SiteDirectory for MondaySiteDirectory {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Site>, DirectoryError>> {
        Box::pin(async move { self.fetch_inner().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monday::MockGraphqlHttp;

    fn directory(http: Arc<MockGraphqlHttp>) -> MondaySiteDirectory {
        let client = Arc::new(MondayClient::new(http));
        MondaySiteDirectory::new(client, MondayConfig::new("token", "100", "200"))
    }

    #[tokio::test]
    async fn test_fetch_parses_sites() {
        let http = Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({
            "data": { "boards": [ { "items": [
                { "id": "1", "column_values": [ { "lat": 53.55, "lng": 9.99 } ] },
                { "id": "2", "column_values": [ { "lat": 52.52, "lng": 13.40 } ] },
            ] } ] }
        })));

        let sites = directory(http.clone()).fetch_all().await.unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, SiteId::new("1"));
        assert!((sites[1].location.latitude() - 52.52).abs() < 1e-9);

        // The configured board id and location column are on the wire
        let requests = http.requests();
        assert_eq!(requests[0]["variables"]["board"], 200);
        assert_eq!(requests[0]["variables"]["column"], "location");
    }

    #[tokio::test]
    async fn test_fetch_skips_items_without_location() {
        let http = Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({
            "data": { "boards": [ { "items": [
                { "id": "1", "column_values": [ { "lat": null, "lng": null } ] },
                { "id": "2", "column_values": [] },
                { "id": "3", "column_values": [ { "lat": 48.13, "lng": 11.57 } ] },
            ] } ] }
        })));

        let sites = directory(http).fetch_all().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, SiteId::new("3"));
    }

    #[tokio::test]
    async fn test_fetch_skips_out_of_range_coordinates() {
        let http = Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({
            "data": { "boards": [ { "items": [
                { "id": "1", "column_values": [ { "lat": 1234.0, "lng": 9.99 } ] },
            ] } ] }
        })));

        let sites = directory(http).fetch_all().await.unwrap();
        assert!(sites.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_propagates_transport_failure() {
        let http = Arc::new(MockGraphqlHttp::new());
        http.push_response(Err(MondayError::Http("connection refused".to_string())));

        let result = directory(http).fetch_all().await;
        assert!(matches!(result, Err(DirectoryError::Transport(_))));
    }
}
