//! Product service client.

use std::time::Duration;

use tracing::instrument;
use url::Url;

use order_service_core::{Money, ProductId};

use super::queries::{ProductById, product_by_id};
use super::{CatalogProduct, CatalogProvider, GraphQLTransport, UpstreamError};

const SERVICE: &str = "product-service";

/// Reads catalog products. Never forwards caller credentials.
#[derive(Debug, Clone)]
pub struct ProductServiceClient {
    transport: GraphQLTransport,
}

impl ProductServiceClient {
    /// Create a client for the product service's GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            transport: GraphQLTransport::new(SERVICE, endpoint, timeout)?,
        })
    }
}

impl CatalogProvider for ProductServiceClient {
    #[instrument(skip(self), fields(service = SERVICE, product_id = %id))]
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<CatalogProduct>, UpstreamError> {
        let variables = product_by_id::Variables {
            id: id.as_str().to_owned(),
        };
        let data = self
            .transport
            .execute::<ProductById>(variables, None)
            .await?;

        data.product_by_id
            .map(|product| convert_product(self.transport.service(), product))
            .transpose()
    }
}

fn convert_product(
    service: &'static str,
    product: product_by_id::ProductByIdProductById,
) -> Result<CatalogProduct, UpstreamError> {
    let price = Money::from_f64(product.price).map_err(|e| UpstreamError::InvalidData {
        service,
        reason: format!("product {} price {}: {e}", product.id, product.price),
    })?;

    Ok(CatalogProduct {
        id: ProductId::new(product.id),
        name: product.name,
        price,
        stock: product.stock,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn catalog_returning(body: serde_json::Value) -> (MockServer, ProductServiceClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "id": "p1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let endpoint = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
        let client = ProductServiceClient::new(endpoint, Duration::from_secs(5)).unwrap();
        (server, client)
    }

    fn product(price: f64, stock: i64) -> product_by_id::ProductByIdProductById {
        product_by_id::ProductByIdProductById {
            id: "p1".to_string(),
            name: "Widget".to_string(),
            price,
            stock,
        }
    }

    #[test]
    fn test_convert_product_exact_price() {
        let converted = convert_product(SERVICE, product(19.99, 4)).unwrap();
        assert_eq!(converted.id, ProductId::new("p1"));
        assert_eq!(converted.price.amount(), Decimal::new(1999, 2));
        assert_eq!(converted.stock, 4);
    }

    #[test]
    fn test_convert_product_rejects_negative_price() {
        let err = convert_product(SERVICE, product(-5.0, 1)).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidData { service: SERVICE, .. }));
    }

    #[tokio::test]
    async fn test_fetch_product_converts_float_price() {
        let (server, client) = catalog_returning(json!({
            "data": { "productById": { "id": "p1", "name": "Widget", "price": 19.99, "stock": 7 } }
        }))
        .await;

        let product = client
            .fetch_product(&ProductId::new("p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.price.amount(), Decimal::new(1999, 2));
        assert_eq!(product.price.to_string(), "19.99");
        assert_eq!(product.stock, 7);

        // Catalog reads never carry the caller's credential
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn test_null_product_is_absent() {
        let (_server, client) = catalog_returning(json!({ "data": { "productById": null } })).await;

        let product = client.fetch_product(&ProductId::new("p1")).await.unwrap();
        assert!(product.is_none());
    }

    #[tokio::test]
    async fn test_negative_upstream_price_is_invalid_data() {
        let (_server, client) = catalog_returning(json!({
            "data": { "productById": { "id": "p1", "name": "Widget", "price": -1.0, "stock": 7 } }
        }))
        .await;

        let err = client.fetch_product(&ProductId::new("p1")).await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidData { service: SERVICE, .. }));
    }
}
