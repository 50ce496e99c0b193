//! Data-access executor.
//!
//! Turns [`RequestEnvelope`]s into document-store operations and always
//! answers with a [`ResponseEnvelope`]: unknown methods, bad params and
//! storage failures all come back as structured errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use lettings_core::config::StoreConfig;
use lettings_core::error::LettingsError;
use lettings_core::filters::{PropertyFilter, ResidentFilter};
use lettings_core::protocol::{Method, RequestEnvelope, ResponseEnvelope, RpcError};

use crate::db::Database;
use crate::documents::{Collection, Condition, DocumentStore, Page};
use crate::seed::{self, SeedReport};

/// Anything that can answer data-store requests.
#[async_trait]
pub trait DataExecutor: Send + Sync {
    /// Open the underlying store. Calling it again while connected is a no-op.
    async fn connect(&self) -> Result<(), LettingsError>;

    /// Handle one request. Never fails: errors are carried in the envelope.
    async fn execute(&self, request: &RequestEnvelope) -> ResponseEnvelope;

    /// Release the underlying store.
    async fn disconnect(&self) -> Result<(), LettingsError>;

    async fn is_connected(&self) -> bool;
}

/// [`DataExecutor`] over the SQLite document store.
pub struct DocumentExecutor {
    config: StoreConfig,
    store: RwLock<Option<DocumentStore>>,
}

impl DocumentExecutor {
    /// Create an executor that opens the configured store on first use.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: RwLock::new(None),
        }
    }

    /// Create an executor around an already-open database.
    pub fn with_database(db: Arc<Database>) -> Self {
        Self {
            config: StoreConfig {
                uri: ":memory:".to_string(),
                seed_sample_data: false,
                ..StoreConfig::default()
            },
            store: RwLock::new(Some(DocumentStore::new(db))),
        }
    }

    /// Seed the sample documents, connecting first if needed.
    pub async fn seed_sample_data(&self) -> Result<SeedReport, LettingsError> {
        let store = self.open_store().await?;
        tokio::task::spawn_blocking(move || seed::seed_sample_data(&store))
            .await
            .map_err(|e| LettingsError::Storage(format!("Seeding task failed: {}", e)))?
    }

    async fn open_store(&self) -> Result<DocumentStore, LettingsError> {
        if let Some(store) = self.store.read().await.as_ref() {
            return Ok(store.clone());
        }
        self.connect().await?;
        self.store
            .read()
            .await
            .clone()
            .ok_or(LettingsError::NotConnected)
    }
}

#[async_trait]
impl DataExecutor for DocumentExecutor {
    async fn connect(&self) -> Result<(), LettingsError> {
        let mut guard = self.store.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let config = self.config.clone();
        let store = tokio::task::spawn_blocking(move || -> Result<DocumentStore, LettingsError> {
            let db = Database::open(&config)?;
            let store = DocumentStore::new(Arc::new(db));
            if config.seed_sample_data {
                seed::seed_sample_data(&store)?;
            }
            Ok(store)
        })
        .await
        .map_err(|e| LettingsError::Storage(format!("Connect task failed: {}", e)))??;

        *guard = Some(store);
        info!(name = %self.config.name, "Connected to document store");
        Ok(())
    }

    async fn execute(&self, request: &RequestEnvelope) -> ResponseEnvelope {
        let correlation_id = request.correlation_id.clone();

        let method = match request.method.parse::<Method>() {
            Ok(method) => method,
            Err(e) => {
                warn!(method = %request.method, correlation_id = %correlation_id, "Unknown method");
                return ResponseEnvelope::failure(e, correlation_id);
            }
        };
        debug!(method = %method, correlation_id = %correlation_id, "Processing data-store request");

        let store = match self.open_store().await {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "Document store unavailable");
                return ResponseEnvelope::failure(RpcError::internal(e), correlation_id);
            }
        };

        let params = request.params.clone();
        let result = match tokio::task::spawn_blocking(move || handle(&store, method, params)).await
        {
            Ok(result) => result,
            Err(e) => Err(RpcError::internal(format!("Executor task failed: {}", e))),
        };

        if let Err(e) = &result {
            warn!(method = %method, code = e.code, detail = ?e.detail, "Data-store request failed");
        }
        ResponseEnvelope::from_result(result, correlation_id)
    }

    async fn disconnect(&self) -> Result<(), LettingsError> {
        if self.store.write().await.take().is_some() {
            info!("Disconnected from document store");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.store.read().await.is_some()
    }
}

// =============================================================================
// Method handlers
// =============================================================================

fn default_limit() -> u32 {
    Page::default().limit
}

#[derive(Deserialize)]
struct SearchParams<F> {
    #[serde(flatten)]
    filter: F,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    skip: u32,
}

impl<F> SearchParams<F> {
    fn page(&self) -> Page {
        Page {
            limit: self.limit,
            skip: self.skip,
        }
    }
}

fn handle(store: &DocumentStore, method: Method, params: Map<String, Value>) -> Result<Value, RpcError> {
    match method {
        Method::PropertiesSearch => {
            let params: SearchParams<PropertyFilter> = parse(params)?;
            params
                .filter
                .validate()
                .map_err(|e| RpcError::invalid_params(e.to_string()))?;
            search(store, Collection::Properties, &property_conditions(&params.filter), params.page())
        }
        Method::ResidentsSearch => {
            let params: SearchParams<ResidentFilter> = parse(params)?;
            params
                .filter
                .validate()
                .map_err(|e| RpcError::invalid_params(e.to_string()))?;
            search(store, Collection::Residents, &resident_conditions(&params.filter), params.page())
        }
        Method::PropertiesCreate => create(store, Collection::Properties, params),
        Method::ResidentsCreate => create(store, Collection::Residents, params),
        Method::PropertiesUpdate => update(store, Collection::Properties, params),
        Method::ResidentsUpdate => update(store, Collection::Residents, params),
        Method::PropertiesDelete => delete(store, Collection::Properties, params),
        Method::ResidentsDelete => delete(store, Collection::Residents, params),
    }
}

fn parse<T: serde::de::DeserializeOwned>(params: Map<String, Value>) -> Result<T, RpcError> {
    serde_json::from_value(Value::Object(params)).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn property_conditions(filter: &PropertyFilter) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if let Some(bedrooms) = filter.bedrooms {
        conditions.push(Condition::Int("details.bedrooms", i64::from(bedrooms)));
    }
    if let Some(min) = filter.min_rent {
        conditions.push(Condition::AtLeast("rent.monthlyAmount", min));
    }
    if let Some(max) = filter.max_rent {
        conditions.push(Condition::AtMost("rent.monthlyAmount", max));
    }
    if let Some(property_type) = filter.property_type {
        conditions.push(Condition::Text("type", property_type.as_str().to_string()));
    }
    if let Some(status) = filter.status {
        conditions.push(Condition::Text("availability.status", status.as_str().to_string()));
    }
    if let Some(city) = &filter.city {
        conditions.push(Condition::Contains("address.city", city.trim().to_string()));
    }
    if let Some(pets) = filter.pets_allowed {
        conditions.push(Condition::Bool("details.petsAllowed", pets));
    }
    if let Some(furnished) = filter.furnished {
        conditions.push(Condition::Bool("details.furnished", furnished));
    }
    conditions
}

fn resident_conditions(filter: &ResidentFilter) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if let Some(property_id) = &filter.property_id {
        conditions.push(Condition::Text("currentTenancy.propertyId", property_id.clone()));
    }
    if let Some(status) = filter.status {
        conditions.push(Condition::Text("currentTenancy.status", status.as_str().to_string()));
    }
    if let Some(first) = &filter.first_name {
        conditions.push(Condition::Contains("personalInfo.firstName", first.clone()));
    }
    if let Some(last) = &filter.last_name {
        conditions.push(Condition::Contains("personalInfo.lastName", last.clone()));
    }
    if let Some(email) = &filter.email {
        conditions.push(Condition::Contains("personalInfo.email", email.clone()));
    }
    conditions
}

fn search(
    store: &DocumentStore,
    collection: Collection,
    conditions: &[Condition],
    page: Page,
) -> Result<Value, RpcError> {
    let found = store
        .search(collection, conditions, page)
        .map_err(RpcError::internal)?;
    let count = found.documents.len();
    Ok(json!({
        collection.name(): found.documents,
        "count": count,
        "total": found.total,
    }))
}

fn create(
    store: &DocumentStore,
    collection: Collection,
    params: Map<String, Value>,
) -> Result<Value, RpcError> {
    if let Some(id) = params.get(collection.id_field()) {
        if !(id.is_string() || id.is_null()) {
            return Err(RpcError::invalid_params(format!(
                "{} must be a string",
                collection.id_field()
            )));
        }
    }
    let id = store.insert(collection, params).map_err(RpcError::internal)?;
    Ok(json!({
        collection.id_field(): id,
        "success": true,
    }))
}

fn required_id(collection: Collection, params: &mut Map<String, Value>) -> Result<String, RpcError> {
    match params.remove(collection.id_field()) {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id),
        _ => Err(RpcError::invalid_params(format!(
            "{} is required",
            collection.id_field()
        ))),
    }
}

fn update(
    store: &DocumentStore,
    collection: Collection,
    mut params: Map<String, Value>,
) -> Result<Value, RpcError> {
    let id = required_id(collection, &mut params)?;
    let outcome = store
        .update(collection, &id, &params)
        .map_err(RpcError::internal)?;
    Ok(json!({
        collection.id_field(): id,
        "matchedCount": outcome.matched,
        "modifiedCount": outcome.modified,
        "success": outcome.matched > 0,
    }))
}

fn delete(
    store: &DocumentStore,
    collection: Collection,
    mut params: Map<String, Value>,
) -> Result<Value, RpcError> {
    let id = required_id(collection, &mut params)?;
    let deleted = store.delete(collection, &id).map_err(RpcError::internal)?;
    Ok(json!({
        collection.id_field(): id,
        "deletedCount": deleted,
        "success": deleted > 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettings_core::protocol::codes;

    fn executor() -> DocumentExecutor {
        DocumentExecutor::with_database(Arc::new(Database::in_memory().unwrap()))
    }

    async fn seeded() -> DocumentExecutor {
        let executor = executor();
        executor.seed_sample_data().await.unwrap();
        executor
    }

    fn request(method: &str, params: Value) -> RequestEnvelope {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        RequestEnvelope::new(method, params, "test-1")
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let executor = executor();
        let response = executor.execute(&request("properties.explode", json!({}))).await;
        let err = response.error().unwrap();
        assert_eq!(err.code, codes::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Method not found: properties.explode");
        assert_eq!(response.correlation_id, "test-1");
    }

    #[tokio::test]
    async fn test_property_search_filters_and_shape() {
        let executor = seeded().await;
        let response = executor
            .execute(&request(
                "properties.search",
                json!({"bedrooms": 2, "maxRent": 1800.0, "status": "available"}),
            ))
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["total"], 2);
        let ids: Vec<&str> = result["properties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["propertyId"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"PROP-001"));
        assert!(ids.contains(&"PROP-003"));
    }

    #[tokio::test]
    async fn test_property_search_city_and_flags() {
        let executor = seeded().await;
        let result = executor
            .execute(&request("properties.search", json!({"city": "LONDON"})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["total"], 1);
        assert_eq!(result["properties"][0]["propertyId"], "PROP-002");

        let result = executor
            .execute(&request(
                "properties.search",
                json!({"petsAllowed": true, "furnished": false}),
            ))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["total"], 2);
    }

    #[tokio::test]
    async fn test_search_pagination_defaults_and_window() {
        let executor = seeded().await;
        let result = executor
            .execute(&request("properties.search", json!({"limit": 1, "skip": 1})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["total"], 3);

        let result = executor
            .execute(&request("properties.search", json!({})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["count"], 3);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_every_match() {
        let executor = seeded().await;
        let result = executor
            .execute(&request("properties.search", json!({"limit": 0})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["count"], 3);
        assert_eq!(result["total"], 3);

        let result = executor
            .execute(&request("properties.search", json!({"limit": 0, "skip": 2})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["total"], 3);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let executor = seeded().await;
        let response = executor
            .execute(&request("properties.search", json!({"minRent": 2000, "maxRent": 1000})))
            .await;
        assert_eq!(response.error().unwrap().code, codes::INVALID_PARAMS);

        let response = executor
            .execute(&request("properties.search", json!({"bedrooms": "two"})))
            .await;
        assert_eq!(response.error().unwrap().code, codes::INVALID_PARAMS);

        let response = executor
            .execute(&request("residents.update", json!({"notes": []})))
            .await;
        assert_eq!(response.error().unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resident_search() {
        let executor = seeded().await;
        let result = executor
            .execute(&request(
                "residents.search",
                json!({"propertyId": "PROP-001", "status": "active"}),
            ))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["residents"][0]["residentId"], "RES-001");

        let result = executor
            .execute(&request("residents.search", json!({"firstName": "james", "lastName": "WIL"})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["total"], 1);

        let result = executor
            .execute(&request("residents.search", json!({"propertyId": "PROP-002"})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["total"], 0);
        assert_eq!(result["residents"], json!([]));
    }

    #[tokio::test]
    async fn test_property_crud_round_trip() {
        let executor = executor();

        let created = executor
            .execute(&request(
                "properties.create",
                json!({
                    "address": {"street": "10 Mill Lane", "city": "Leeds"},
                    "type": "house",
                    "rent": {"monthlyAmount": 1200.0, "deposit": 1800.0, "currency": "GBP"},
                    "availability": {"status": "available"}
                }),
            ))
            .await
            .into_result()
            .unwrap();
        assert_eq!(created["success"], true);
        let id = created["propertyId"].as_str().unwrap().to_string();
        assert!(id.starts_with("PROP-"));

        let updated = executor
            .execute(&request(
                "properties.update",
                json!({"propertyId": id, "rent.monthlyAmount": 1250.0}),
            ))
            .await
            .into_result()
            .unwrap();
        assert_eq!(updated["matchedCount"], 1);
        assert_eq!(updated["modifiedCount"], 1);
        assert_eq!(updated["success"], true);

        let found = executor
            .execute(&request("properties.search", json!({"minRent": 1250.0})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(found["total"], 1);
        assert_eq!(found["properties"][0]["rent"]["deposit"], 1800.0);

        let deleted = executor
            .execute(&request("properties.delete", json!({"propertyId": id})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(deleted["deletedCount"], 1);
        assert_eq!(deleted["success"], true);

        let missing = executor
            .execute(&request("properties.update", json!({"propertyId": id, "type": "flat"})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(missing["matchedCount"], 0);
        assert_eq!(missing["success"], false);
    }

    #[tokio::test]
    async fn test_resident_create_honours_caller_id() {
        let executor = executor();
        let created = executor
            .execute(&request(
                "residents.create",
                json!({"residentId": "RES-042", "personalInfo": {"firstName": "Priya"}}),
            ))
            .await
            .into_result()
            .unwrap();
        assert_eq!(created["residentId"], "RES-042");

        let deleted = executor
            .execute(&request("residents.delete", json!({"residentId": "RES-042"})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(deleted["deletedCount"], 1);
    }

    #[tokio::test]
    async fn test_lazy_connect_and_disconnect() {
        let executor = DocumentExecutor::new(StoreConfig {
            uri: ":memory:".to_string(),
            seed_sample_data: true,
            ..StoreConfig::default()
        });
        assert!(!executor.is_connected().await);

        let result = executor
            .execute(&request("properties.search", json!({})))
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["total"], 3);
        assert!(executor.is_connected().await);

        executor.connect().await.unwrap();
        executor.disconnect().await.unwrap();
        assert!(!executor.is_connected().await);
    }
}
