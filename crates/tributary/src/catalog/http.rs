//! HTTP client for the Atlan catalog API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use super::model::{self, BulkRequest, Entity, IndexSearchRequest, IndexSearchResponse, MutationResponse};
use super::{
    AssetRef, BucketSpec, CONNECTION_TYPE, CatalogClient, ConnectionSpec, ObjectSpec, ProcessSpec,
    Provisioned,
};
use crate::config::CatalogConfig;
use crate::error::{
    CatalogError, ClientBuildSnafu, DecodeSnafu, HttpSnafu, InvalidTokenSnafu, StatusSnafu,
};
use tributary_core::emit;
use tributary_core::metrics::events::{CatalogRequest, RequestStatus};
use tributary_core::types::AssetRecord;

const SEARCH_PATH: &str = "/api/meta/search/indexsearch";
const BULK_PATH: &str = "/api/meta/entity/bulk";

/// Catalog client over the Atlan REST API.
pub struct AtlanClient {
    client: Client,
    base_url: String,
    page_size: usize,
}

impl std::fmt::Debug for AtlanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtlanClient<{}>", self.base_url)
    }
}

impl AtlanClient {
    /// Create a client authenticated with `api_token`.
    pub fn new(config: &CatalogConfig, api_token: &str) -> Result<Self, CatalogError> {
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {api_token}")).context(InvalidTokenSnafu)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("tributary/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogError> {
        let start = Instant::now();
        let result = self.send(operation, path, body).await;

        emit!(CatalogRequest {
            operation,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .context(HttpSnafu { operation })?;

        Self::handle_response(operation, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, CatalogError> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context(DecodeSnafu { operation });
        }

        let body = response.text().await.unwrap_or_default();
        StatusSnafu {
            operation,
            status: status.as_u16(),
            body,
        }
        .fail()
    }

    async fn search(
        &self,
        operation: &'static str,
        query: Value,
        from: usize,
        size: usize,
    ) -> Result<IndexSearchResponse, CatalogError> {
        let request = IndexSearchRequest::new(query, from, size);
        self.post(operation, SEARCH_PATH, &request).await
    }

    /// Page through every result of `query`.
    async fn search_all(
        &self,
        operation: &'static str,
        query: Value,
    ) -> Result<Vec<Entity>, CatalogError> {
        let mut entities = Vec::new();
        let mut from = 0;

        loop {
            let page = self
                .search(operation, query.clone(), from, self.page_size)
                .await?;
            let fetched = page.entities.len();
            entities.extend(page.entities);
            from += fetched;

            debug!(operation, fetched = from, total = page.approximate_count, "Search page");

            if fetched < self.page_size || from as u64 >= page.approximate_count {
                break;
            }
        }

        Ok(entities)
    }

    async fn save(
        &self,
        operation: &'static str,
        entity: Entity,
        requested: AssetRef,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let response: MutationResponse = self
            .post(operation, BULK_PATH, &BulkRequest::single(entity))
            .await?;
        Ok(response.outcome(requested))
    }
}

#[async_trait]
impl CatalogClient for AtlanClient {
    async fn ping(&self) -> Result<u64, CatalogError> {
        let response = self.search("ping", model::match_all(), 0, 1).await?;
        info!(base_url = %self.base_url, assets = response.approximate_count, "Catalog reachable");
        Ok(response.approximate_count)
    }

    async fn find_connection(
        &self,
        name: &str,
        connector: &str,
    ) -> Result<Option<String>, CatalogError> {
        let response = self
            .search("find_connection", model::connection_query(name, connector), 0, 1)
            .await?;
        Ok(response
            .entities
            .first()
            .and_then(|entity| entity.qualified_name().map(str::to_string)))
    }

    async fn create_connection(
        &self,
        spec: &ConnectionSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let qualified_name = spec.qualified_name_at(chrono::Utc::now().timestamp());
        let entity = model::connection_entity(spec, &qualified_name);
        let requested = AssetRef::new(CONNECTION_TYPE, qualified_name, &spec.name);
        self.save("create_connection", entity, requested).await
    }

    async fn find_bucket_by_arn(&self, arn: &str) -> Result<Option<AssetRef>, CatalogError> {
        let response = self
            .search("find_bucket", model::bucket_by_arn_query(arn), 0, 1)
            .await?;
        Ok(response.entities.first().and_then(Entity::to_asset_ref))
    }

    async fn create_bucket(
        &self,
        spec: &BucketSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let requested = AssetRef::new(super::BUCKET_TYPE, spec.qualified_name(), &spec.name);
        self.save("create_bucket", model::bucket_entity(spec), requested)
            .await
    }

    async fn list_objects(
        &self,
        bucket_qualified_name: &str,
    ) -> Result<Vec<AssetRef>, CatalogError> {
        let entities = self
            .search_all(
                "list_objects",
                model::objects_in_bucket_query(bucket_qualified_name),
            )
            .await?;
        Ok(entities.iter().filter_map(Entity::to_asset_ref).collect())
    }

    async fn upsert_object(
        &self,
        spec: &ObjectSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        self.save("upsert_object", model::object_entity(spec), spec.asset_ref())
            .await
    }

    async fn search_prefix(&self, prefix: &str) -> Result<Vec<AssetRecord>, CatalogError> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let entities = self
            .search_all("search_prefix", model::qualified_name_prefix_query(&prefix))
            .await?;

        // The index matches prefixes on analyzed text; keep exact matches only.
        Ok(entities
            .iter()
            .filter_map(Entity::to_record)
            .filter(|record| record.qualified_name.starts_with(&prefix))
            .collect())
    }

    async fn create_process(
        &self,
        spec: &ProcessSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        self.save("create_process", model::process_entity(spec), spec.asset_ref())
            .await
    }
}
