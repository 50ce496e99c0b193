//! Request router.
//!
//! Turns classified intents into request envelopes, hands them to the
//! data-access executor and normalises whatever comes back. Every path ends
//! in a [`ResponseEnvelope`]; nothing propagates past this boundary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use lettings_core::filters::{PropertyFilter, ResidentFilter};
use lettings_core::protocol::{Method, RequestEnvelope, ResponseEnvelope, RpcError};
use lettings_core::types::NewProperty;
use lettings_store::DataExecutor;

use crate::intent::{Intent, IntentDescriptor};

pub struct Router {
    executor: Arc<dyn DataExecutor>,
    counter: AtomicU64,
}

impl Router {
    pub fn new(executor: Arc<dyn DataExecutor>) -> Self {
        Self {
            executor,
            counter: AtomicU64::new(0),
        }
    }

    pub fn executor(&self) -> &Arc<dyn DataExecutor> {
        &self.executor
    }

    /// A fresh `<unix-millis>-<counter>` correlation id.
    pub fn next_correlation_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", Utc::now().timestamp_millis(), n)
    }

    /// Route a classified intent to its data-store method.
    ///
    /// General chat needs no lookup and answers with an empty string result
    /// without touching the executor.
    pub async fn dispatch(
        &self,
        descriptor: &IntentDescriptor,
        correlation_id: Option<String>,
    ) -> ResponseEnvelope {
        let correlation_id = correlation_id.unwrap_or_else(|| self.next_correlation_id());

        let prepared = match &descriptor.intent {
            Intent::GeneralChat => {
                return ResponseEnvelope::success(Value::String(String::new()), correlation_id)
            }
            Intent::SearchProperties(filter) => property_search(filter),
            Intent::SearchResidents(filter) | Intent::FindTenant(filter) => resident_search(filter),
            Intent::CreateProperty(data) => property_create(data),
        };

        match prepared {
            Ok((method, params)) => {
                self.send(RequestEnvelope::new(method.as_str(), params, correlation_id))
                    .await
            }
            Err(e) => {
                warn!(action = ?descriptor.action(), detail = ?e.detail, "Rejected invalid params");
                ResponseEnvelope::failure(e, correlation_id)
            }
        }
    }

    /// Forward a raw envelope to the executor.
    ///
    /// Unknown methods are answered here without calling the executor. A
    /// panicking executor becomes an internal error. The response always
    /// carries the request's correlation id.
    pub async fn send(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let correlation_id = request.correlation_id.clone();

        if let Err(e) = request.method.parse::<Method>() {
            warn!(method = %request.method, correlation_id = %correlation_id, "Unknown method");
            return ResponseEnvelope::failure(e, correlation_id);
        }
        debug!(method = %request.method, correlation_id = %correlation_id, "Dispatching request");

        let executor = Arc::clone(&self.executor);
        let task = tokio::spawn(async move { executor.execute(&request).await });

        let mut response = match task.await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, correlation_id = %correlation_id, "Executor task failed");
                ResponseEnvelope::failure(RpcError::internal(e), correlation_id.clone())
            }
        };
        response.correlation_id = correlation_id;
        response
    }

    // -----------------------------------------------------------------
    // Convenience operations
    // -----------------------------------------------------------------

    pub async fn search_properties(
        &self,
        filter: &PropertyFilter,
        page: Option<(u32, u32)>,
    ) -> ResponseEnvelope {
        self.call(property_search(filter), page).await
    }

    pub async fn create_property(&self, data: &NewProperty) -> ResponseEnvelope {
        self.call(property_create(data), None).await
    }

    /// Apply `$set`-style `changes` (dotted keys allowed) to a property.
    pub async fn update_property(
        &self,
        property_id: &str,
        changes: Map<String, Value>,
    ) -> ResponseEnvelope {
        self.call(Ok(with_id(Method::PropertiesUpdate, "propertyId", property_id, changes)), None)
            .await
    }

    pub async fn delete_property(&self, property_id: &str) -> ResponseEnvelope {
        self.call(Ok(with_id(Method::PropertiesDelete, "propertyId", property_id, Map::new())), None)
            .await
    }

    pub async fn search_residents(
        &self,
        filter: &ResidentFilter,
        page: Option<(u32, u32)>,
    ) -> ResponseEnvelope {
        self.call(resident_search(filter), page).await
    }

    pub async fn create_resident(&self, data: Map<String, Value>) -> ResponseEnvelope {
        self.call(Ok((Method::ResidentsCreate, data)), None).await
    }

    pub async fn update_resident(
        &self,
        resident_id: &str,
        changes: Map<String, Value>,
    ) -> ResponseEnvelope {
        self.call(Ok(with_id(Method::ResidentsUpdate, "residentId", resident_id, changes)), None)
            .await
    }

    pub async fn delete_resident(&self, resident_id: &str) -> ResponseEnvelope {
        self.call(Ok(with_id(Method::ResidentsDelete, "residentId", resident_id, Map::new())), None)
            .await
    }

    async fn call(&self, prepared: Prepared, page: Option<(u32, u32)>) -> ResponseEnvelope {
        let correlation_id = self.next_correlation_id();
        match prepared {
            Ok((method, mut params)) => {
                if let Some((limit, skip)) = page {
                    params.insert("limit".to_string(), Value::from(limit));
                    params.insert("skip".to_string(), Value::from(skip));
                }
                self.send(RequestEnvelope::new(method.as_str(), params, correlation_id))
                    .await
            }
            Err(e) => ResponseEnvelope::failure(e, correlation_id),
        }
    }
}

type Prepared = Result<(Method, Map<String, Value>), RpcError>;

fn property_search(filter: &PropertyFilter) -> Prepared {
    filter
        .validate()
        .map_err(|e| RpcError::invalid_params(e.to_string()))?;
    Ok((Method::PropertiesSearch, to_params(filter)?))
}

fn resident_search(filter: &ResidentFilter) -> Prepared {
    filter
        .validate()
        .map_err(|e| RpcError::invalid_params(e.to_string()))?;
    Ok((Method::ResidentsSearch, to_params(filter)?))
}

fn property_create(data: &NewProperty) -> Prepared {
    if let Some(rent) = &data.rent {
        if rent.monthly_amount < 0.0 || rent.deposit < 0.0 {
            return Err(RpcError::invalid_params("rent must not be negative"));
        }
    }
    Ok((Method::PropertiesCreate, to_params(data)?))
}

fn with_id(
    method: Method,
    id_field: &str,
    id: &str,
    mut params: Map<String, Value>,
) -> (Method, Map<String, Value>) {
    params.insert(id_field.to_string(), Value::String(id.to_string()));
    (method, params)
}

fn to_params<T: Serialize>(value: &T) -> Result<Map<String, Value>, RpcError> {
    match serde_json::to_value(value).map_err(RpcError::internal)? {
        Value::Object(map) => Ok(map),
        other => Err(RpcError::internal(format!("params must be an object, got {}", other))),
    }
}
