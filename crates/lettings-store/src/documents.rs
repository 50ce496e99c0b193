//! JSON document collections on top of SQLite.
//!
//! Each document lives as a JSON text column; queries reach into it with
//! `json_extract`. All methods are synchronous and take the connection mutex,
//! so async callers should run them on a blocking thread.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde_json::{Map, Value};
use tracing::debug;

use lettings_core::error::LettingsError;

use crate::db::Database;

// =============================================================================
// Collections
// =============================================================================

/// The document collections held by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Properties,
    Residents,
}

impl Collection {
    /// Table name, also used as the list key in search results.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Properties => "properties",
            Collection::Residents => "residents",
        }
    }

    /// Document field holding the entity id.
    pub fn id_field(&self) -> &'static str {
        match self {
            Collection::Properties => "propertyId",
            Collection::Residents => "residentId",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            Collection::Properties => "PROP",
            Collection::Residents => "RES",
        }
    }

    /// Generate a fresh entity id for this collection.
    pub fn generate_id(&self) -> String {
        format!("{}-{}", self.id_prefix(), uuid::Uuid::new_v4().simple())
    }
}

// =============================================================================
// Query conditions
// =============================================================================

/// A single predicate on a document field, addressed by dotted path.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Field equals a string.
    Text(&'static str, String),
    /// Field equals an integer.
    Int(&'static str, i64),
    /// Field equals a boolean.
    Bool(&'static str, bool),
    /// Numeric field is `>=` the bound.
    AtLeast(&'static str, f64),
    /// Numeric field is `<=` the bound.
    AtMost(&'static str, f64),
    /// Case-insensitive substring match.
    Contains(&'static str, String),
}

impl Condition {
    fn to_sql(&self) -> (String, SqlValue) {
        match self {
            Condition::Text(path, v) => (format!("{} = ?", extract(path)), SqlValue::Text(v.clone())),
            Condition::Int(path, v) => (format!("{} = ?", extract(path)), SqlValue::Integer(*v)),
            // JSON booleans come back from json_extract as 0/1.
            Condition::Bool(path, v) => (
                format!("{} = ?", extract(path)),
                SqlValue::Integer(i64::from(*v)),
            ),
            Condition::AtLeast(path, v) => (format!("{} >= ?", extract(path)), SqlValue::Real(*v)),
            Condition::AtMost(path, v) => (format!("{} <= ?", extract(path)), SqlValue::Real(*v)),
            Condition::Contains(path, v) => (
                format!("{} LIKE ? ESCAPE '\\'", extract(path)),
                SqlValue::Text(format!("%{}%", escape_like(v))),
            ),
        }
    }
}

fn extract(path: &str) -> String {
    format!("json_extract(doc, '$.{}')", path)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pagination window for a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// Maximum documents returned; 0 means no limit.
    pub limit: u32,
    pub skip: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 10, skip: 0 }
    }
}

/// One page of matching documents plus the unpaginated match count.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPage {
    pub documents: Vec<Value>,
    pub total: u64,
}

/// Result of an update, mirroring document-store semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

// =============================================================================
// DocumentStore
// =============================================================================

/// Collection-level operations on the SQLite document tables.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    db: Arc<Database>,
}

impl DocumentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a document, assigning an id when the caller did not supply one.
    ///
    /// `createdAt` and `updatedAt` are always set by the store. Returns the id.
    pub fn insert(
        &self,
        collection: Collection,
        mut doc: Map<String, Value>,
    ) -> Result<String, LettingsError> {
        let id = match doc.get(collection.id_field()) {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => collection.generate_id(),
            Some(other) => {
                return Err(LettingsError::Serialization(format!(
                    "{} must be a string, got {}",
                    collection.id_field(),
                    other
                )))
            }
        };

        let now = Utc::now();
        let stamp = Value::String(now.to_rfc3339());
        doc.insert(collection.id_field().to_string(), Value::String(id.clone()));
        doc.insert("createdAt".to_string(), stamp.clone());
        doc.insert("updatedAt".to_string(), stamp);

        let body = serde_json::to_string(&doc)?;
        self.db.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, doc, created_at) VALUES (?1, ?2, ?3)",
                    collection.name()
                ),
                params![id, body, now.timestamp_micros()],
            )
            .map_err(|e| LettingsError::Storage(format!("Failed to insert document: {}", e)))?;
            Ok(())
        })?;

        debug!(collection = collection.name(), id = %id, "Document inserted");
        Ok(id)
    }

    /// Fetch a single document by id.
    pub fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Value>, LettingsError> {
        let body: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT doc FROM {} WHERE id = ?1", collection.name()),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LettingsError::Storage(format!("Failed to get document: {}", e)))
        })?;

        body.map(|b| serde_json::from_str(&b).map_err(LettingsError::from))
            .transpose()
    }

    /// Search a collection, newest first.
    pub fn search(
        &self,
        collection: Collection,
        conditions: &[Condition],
        page: Page,
    ) -> Result<SearchPage, LettingsError> {
        let mut clauses = Vec::with_capacity(conditions.len());
        let mut values = Vec::with_capacity(conditions.len() + 2);
        for condition in conditions {
            let (clause, value) = condition.to_sql();
            clauses.push(clause);
            values.push(value);
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.db.with_conn(|conn| {
            let total: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {}{}", collection.name(), where_sql),
                    params_from_iter(values.iter()),
                    |row| row.get(0),
                )
                .map_err(|e| LettingsError::Storage(format!("Failed to count documents: {}", e)))?;

            let mut paged = values.clone();
            // SQLite treats a negative LIMIT as unbounded.
            let limit = if page.limit == 0 { -1 } else { i64::from(page.limit) };
            paged.push(SqlValue::Integer(limit));
            paged.push(SqlValue::Integer(i64::from(page.skip)));

            let sql = format!(
                "SELECT doc FROM {}{} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                collection.name(),
                where_sql
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| LettingsError::Storage(format!("Failed to prepare search: {}", e)))?;
            let rows = stmt
                .query_map(params_from_iter(paged.iter()), |row| row.get::<_, String>(0))
                .map_err(|e| LettingsError::Storage(format!("Failed to search documents: {}", e)))?;

            let mut documents = Vec::new();
            for row in rows {
                let body =
                    row.map_err(|e| LettingsError::Storage(format!("Row error: {}", e)))?;
                documents.push(serde_json::from_str(&body)?);
            }

            Ok(SearchPage {
                documents,
                total: total as u64,
            })
        })
    }

    /// Apply `$set`-style changes to a document.
    ///
    /// Keys may be dotted paths (`rent.monthlyAmount`) addressing nested
    /// fields; missing intermediate objects are created. The id field and
    /// the timestamps cannot be overwritten. `modified` is 0 when every
    /// change already matched the stored value.
    pub fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: &Map<String, Value>,
    ) -> Result<UpdateOutcome, LettingsError> {
        let Some(mut doc) = self.find_by_id(collection, id)? else {
            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
            });
        };

        let before = doc.clone();
        for (path, value) in changes {
            if is_protected(collection, path) {
                continue;
            }
            set_path(&mut doc, path, value.clone());
        }
        if doc == before {
            return Ok(UpdateOutcome {
                matched: 1,
                modified: 0,
            });
        }

        if let Value::Object(map) = &mut doc {
            map.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        let body = serde_json::to_string(&doc)?;
        let modified = self.db.with_conn(|conn| {
            conn.execute(
                &format!("UPDATE {} SET doc = ?1 WHERE id = ?2", collection.name()),
                params![body, id],
            )
            .map_err(|e| LettingsError::Storage(format!("Failed to update document: {}", e)))
        })?;

        debug!(collection = collection.name(), id, "Document updated");
        Ok(UpdateOutcome {
            matched: 1,
            modified: modified as u64,
        })
    }

    /// Delete a document by id. Returns the number of documents removed.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<u64, LettingsError> {
        let deleted = self.db.with_conn(|conn| {
            conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", collection.name()),
                params![id],
            )
            .map_err(|e| LettingsError::Storage(format!("Failed to delete document: {}", e)))
        })?;
        Ok(deleted as u64)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: Collection) -> Result<u64, LettingsError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {}", collection.name()),
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| LettingsError::Storage(format!("Failed to count documents: {}", e)))?;
            Ok(n as u64)
        })
    }
}

fn is_protected(collection: Collection, path: &str) -> bool {
    path == collection.id_field() || path == "createdAt" || path == "updatedAt"
}

/// Set `value` at a dotted path, creating objects along the way.
///
/// A non-object found mid-path is replaced by an object.
fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> DocumentStore {
        DocumentStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn property(city: &str, bedrooms: u32, rent: f64) -> Map<String, Value> {
        object(json!({
            "address": {"street": "1 Test Road", "city": city},
            "type": "flat",
            "details": {"bedrooms": bedrooms, "furnished": false, "petsAllowed": true},
            "rent": {"monthlyAmount": rent, "currency": "GBP"},
            "availability": {"status": "available"}
        }))
    }

    #[test]
    fn test_insert_generates_prefixed_id() {
        let store = store();
        let id = store
            .insert(Collection::Properties, property("Leeds", 2, 900.0))
            .unwrap();
        assert!(id.starts_with("PROP-"));

        let doc = store.find_by_id(Collection::Properties, &id).unwrap().unwrap();
        assert_eq!(doc["propertyId"], id.as_str());
        assert!(doc["createdAt"].is_string());
        assert_eq!(doc["createdAt"], doc["updatedAt"]);
    }

    #[test]
    fn test_insert_honours_caller_id() {
        let store = store();
        let mut doc = property("Leeds", 2, 900.0);
        doc.insert("propertyId".into(), json!("PROP-777"));
        let id = store.insert(Collection::Properties, doc).unwrap();
        assert_eq!(id, "PROP-777");

        let mut dup = property("York", 1, 700.0);
        dup.insert("propertyId".into(), json!("PROP-777"));
        assert!(store.insert(Collection::Properties, dup).is_err());
    }

    #[test]
    fn test_insert_rejects_non_string_id() {
        let store = store();
        let doc = object(json!({"residentId": 12}));
        let err = store.insert(Collection::Residents, doc).unwrap_err();
        assert!(matches!(err, LettingsError::Serialization(_)));
    }

    #[test]
    fn test_search_conditions() {
        let store = store();
        store.insert(Collection::Properties, property("Manchester", 2, 1800.0)).unwrap();
        store.insert(Collection::Properties, property("London", 2, 1950.0)).unwrap();
        store.insert(Collection::Properties, property("Edinburgh", 3, 1650.0)).unwrap();

        let page = store
            .search(
                Collection::Properties,
                &[
                    Condition::Int("details.bedrooms", 2),
                    Condition::AtMost("rent.monthlyAmount", 1800.0),
                ],
                Page::default(),
            )
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.documents[0]["address"]["city"], "Manchester");

        let page = store
            .search(
                Collection::Properties,
                &[Condition::AtLeast("rent.monthlyAmount", 1800.0)],
                Page::default(),
            )
            .unwrap();
        assert_eq!(page.total, 2);

        let page = store
            .search(
                Collection::Properties,
                &[
                    Condition::Text("availability.status", "available".into()),
                    Condition::Bool("details.petsAllowed", true),
                    Condition::Bool("details.furnished", false),
                ],
                Page::default(),
            )
            .unwrap();
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_contains_is_case_insensitive_and_escaped() {
        let store = store();
        store.insert(Collection::Properties, property("Manchester", 2, 1800.0)).unwrap();

        let hit = |needle: &str| {
            store
                .search(
                    Collection::Properties,
                    &[Condition::Contains("address.city", needle.to_string())],
                    Page::default(),
                )
                .unwrap()
                .total
        };
        assert_eq!(hit("manchester"), 1);
        assert_eq!(hit("CHEST"), 1);
        assert_eq!(hit("%"), 0);
        assert_eq!(hit("Man_hester"), 0);
    }

    #[test]
    fn test_search_paginates_newest_first() {
        let store = store();
        for i in 0..5 {
            let mut doc = property("Bristol", 1, 1000.0 + f64::from(i));
            doc.insert("propertyId".into(), json!(format!("PROP-{}", i)));
            store.insert(Collection::Properties, doc).unwrap();
        }

        let first = store
            .search(Collection::Properties, &[], Page { limit: 2, skip: 0 })
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.documents.len(), 2);
        assert_eq!(first.documents[0]["propertyId"], "PROP-4");
        assert_eq!(first.documents[1]["propertyId"], "PROP-3");

        let last = store
            .search(Collection::Properties, &[], Page { limit: 2, skip: 4 })
            .unwrap();
        assert_eq!(last.total, 5);
        assert_eq!(last.documents.len(), 1);
        assert_eq!(last.documents[0]["propertyId"], "PROP-0");

        let unbounded = store
            .search(Collection::Properties, &[], Page { limit: 0, skip: 1 })
            .unwrap();
        assert_eq!(unbounded.documents.len(), 4);
        assert_eq!(unbounded.documents[0]["propertyId"], "PROP-3");
    }

    #[test]
    fn test_update_with_dotted_paths() {
        let store = store();
        let id = store
            .insert(Collection::Properties, property("Leeds", 2, 900.0))
            .unwrap();

        let changes = object(json!({
            "rent.monthlyAmount": 950.0,
            "availability.status": "let",
            "details.parking": "allocated space",
            "propertyId": "PROP-hijack"
        }));
        let outcome = store.update(Collection::Properties, &id, &changes).unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let doc = store.find_by_id(Collection::Properties, &id).unwrap().unwrap();
        assert_eq!(doc["rent"]["monthlyAmount"], 950.0);
        assert_eq!(doc["rent"]["currency"], "GBP");
        assert_eq!(doc["availability"]["status"], "let");
        assert_eq!(doc["details"]["parking"], "allocated space");
        assert_eq!(doc["propertyId"], id.as_str());
    }

    #[test]
    fn test_update_without_change_is_not_modified() {
        let store = store();
        let id = store
            .insert(Collection::Properties, property("Leeds", 2, 900.0))
            .unwrap();
        let changes = object(json!({"address.city": "Leeds"}));
        let outcome = store.update(Collection::Properties, &id, &changes).unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[test]
    fn test_update_missing_document() {
        let store = store();
        let outcome = store
            .update(Collection::Residents, "RES-none", &object(json!({"notes": []})))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 0, modified: 0 });
    }

    #[test]
    fn test_delete_and_count() {
        let store = store();
        let id = store
            .insert(Collection::Residents, object(json!({"personalInfo": {"firstName": "Ann"}})))
            .unwrap();
        assert!(id.starts_with("RES-"));
        assert_eq!(store.count(Collection::Residents).unwrap(), 1);
        assert_eq!(store.delete(Collection::Residents, &id).unwrap(), 1);
        assert_eq!(store.delete(Collection::Residents, &id).unwrap(), 0);
        assert_eq!(store.count(Collection::Residents).unwrap(), 0);
    }

    #[test]
    fn test_set_path_replaces_scalars_mid_path() {
        let mut doc = json!({"rent": 5});
        set_path(&mut doc, "rent.deposit", json!(10));
        assert_eq!(doc, json!({"rent": {"deposit": 10}}));
    }
}
