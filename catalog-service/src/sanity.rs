use crate::CatalogSource;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use storefront_types::{Category, Product};

static USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const CATALOG_QUERY: &str = r#"*[_type == $type && hide != true] | order(_createdAt desc){
  _id, _type, title, price, images, slug, brand, condition, size, sold, _createdAt
}"#;

const PRODUCT_QUERY: &str = r#"*[_type == $type && slug.current == $slug][0]{
  _id, _type, title, price, images, slug, brand, condition, size, sold, _createdAt, description
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
}

impl SanityConfig {
    pub fn host(&self) -> String {
        let api = if self.use_cdn { "apicdn" } else { "api" };
        format!("https://{}.{api}.sanity.io", self.project_id)
    }
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

pub struct SanityClient {
    config: SanityConfig,
    client: reqwest::Client,
}

impl SanityClient {
    pub fn new(config: SanityConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Unable to build CMS http client")?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SanityConfig {
        &self.config
    }

    /// Query parameters are sent JSON-encoded as `$name=<json>`.
    pub fn query_url(
        &self,
        query: &str,
        params: &[(&str, Value)],
    ) -> Result<reqwest::Url, anyhow::Error> {
        let version = self.config.api_version.trim_start_matches('v');
        let mut url = reqwest::Url::parse(&format!(
            "{}/v{version}/data/query/{}",
            self.config.host(),
            self.config.dataset
        ))
        .context("Invalid CMS url")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }
        Ok(url)
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, Value)],
    ) -> Result<T, anyhow::Error> {
        let url = self.query_url(query, params)?;
        let mut req = self.client.get(url);
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.context("Unable to query CMS")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("CMS responded with {status}: {body}"));
        }
        let QueryResponse { result } = res
            .json::<QueryResponse<T>>()
            .await
            .context("Unable to decode CMS response")?;
        Ok(result)
    }
}

#[async_trait]
impl CatalogSource for SanityClient {
    async fn fetch_catalog(&self, category: Category) -> Result<Vec<Product>, anyhow::Error> {
        let records: Vec<Value> = self
            .fetch(
                CATALOG_QUERY,
                &[("type", Value::from(category.document_type()))],
            )
            .await
            .with_context(|| format!("Unable to fetch {category} catalog"))?;
        Ok(convert(records).collect())
    }

    async fn fetch_product(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, anyhow::Error> {
        let record: Option<Value> = self
            .fetch(
                PRODUCT_QUERY,
                &[
                    ("type", Value::from(category.document_type())),
                    ("slug", Value::from(slug)),
                ],
            )
            .await
            .with_context(|| format!("Unable to fetch {category} product {slug}"))?;
        Ok(record.and_then(|r| convert(Some(r)).next()))
    }
}

fn record_id(record: &Value) -> Option<String> {
    record.get("_id").and_then(Value::as_str).map(ToString::to_string)
}

/// Drops records that do not decode into a product instead of failing the
/// whole catalog.
pub fn convert(records: impl IntoIterator<Item = Value>) -> impl Iterator<Item = Product> {
    records.into_iter().filter_map(|record| {
        let id = record_id(&record);
        match serde_json::from_value::<Product>(record) {
            Ok(p) => Some(p),
            Err(err) => {
                log::warn!("Unable to convert CMS record with id {id:?} into Product: {err}");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(use_cdn: bool) -> SanityClient {
        SanityClient::new(SanityConfig {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            use_cdn,
            token: None,
        })
        .expect("client")
    }

    #[test]
    fn builds_query_url() {
        let url = client(true)
            .query_url(
                "*[_type == $type]",
                &[("type", Value::from("product")), ("slug", Value::from("jordan-4"))],
            )
            .expect("url");
        assert_eq!(Some("abc123.apicdn.sanity.io"), url.host_str());
        assert_eq!("/v2024-01-01/data/query/production", url.path());
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            vec![
                ("query".to_string(), "*[_type == $type]".to_string()),
                ("$type".to_string(), "\"product\"".to_string()),
                ("$slug".to_string(), "\"jordan-4\"".to_string()),
            ],
            pairs
        );
    }

    #[test]
    fn uses_live_api_without_cdn() {
        let url = client(false).query_url("*", &[]).expect("url");
        assert_eq!(Some("abc123.api.sanity.io"), url.host_str());
    }

    #[test]
    fn skips_malformed_records() {
        let records = vec![
            serde_json::json!({"_id": "ok", "_type": "product", "title": "Jordan 4", "slug": {"current": "jordan-4"}}),
            serde_json::json!({"_id": "broken", "_type": "product"}),
            serde_json::json!({"_id": "unknown", "_type": "sanity.imageAsset", "title": "x"}),
        ];
        let products: Vec<Product> = convert(records).collect();
        assert_eq!(1, products.len());
        assert_eq!("ok", products[0].id);
    }

    #[test]
    fn queries_filter_by_type() {
        assert!(CATALOG_QUERY.contains("_type == $type && hide != true"));
        assert!(CATALOG_QUERY.contains("order(_createdAt desc)"));
        assert!(PRODUCT_QUERY.contains("slug.current == $slug"));
        assert!(PRODUCT_QUERY.contains("description"));
    }
}
