//! In-memory resource storage for the development backend.
//!
//! Each resource (`vehicles`, `reservations`, ...) is a map from a numeric id
//! to a JSON object. Ids are assigned per resource, starting at 1, and never
//! reused. Creates may carry an idempotency key; a repeated key returns the
//! record the first create made while it still exists.

use rentsync_core::EntityType;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collection {
    next_id: u64,
    records: BTreeMap<u64, Map<String, Value>>,
    keys: HashMap<String, u64>,
}

/// Thread-safe store shared by every request handler.
#[derive(Debug, Default)]
pub struct ResourceStore {
    collections: RwLock<HashMap<EntityType, Collection>>,
}

/// Renders a stored object with its id merged in.
fn with_id(id: u64, fields: &Map<String, Value>) -> Value {
    let mut object = Map::with_capacity(fields.len() + 1);
    object.insert("id".to_string(), Value::from(id));
    for (key, value) in fields {
        object.insert(key.clone(), value.clone());
    }
    Value::Object(object)
}

fn strip_id(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.remove("id");
    fields
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self, resource: EntityType) -> Vec<Value> {
        let collections = self.collections.read().await;
        collections
            .get(&resource)
            .map(|c| c.records.iter().map(|(id, f)| with_id(*id, f)).collect())
            .unwrap_or_default()
    }

    pub async fn get(&self, resource: EntityType, id: u64) -> Option<Value> {
        let collections = self.collections.read().await;
        collections
            .get(&resource)
            .and_then(|c| c.records.get(&id))
            .map(|f| with_id(id, f))
    }

    /// Stores a new object and returns it with its assigned id, plus whether
    /// it is new. A known `key` returns the existing record instead.
    pub async fn create(
        &self,
        resource: EntityType,
        fields: Map<String, Value>,
        key: Option<&str>,
    ) -> (Value, bool) {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(resource).or_default();

        if let Some(key) = key {
            let existing = collection
                .keys
                .get(key)
                .and_then(|id| collection.records.get(id).map(|f| with_id(*id, f)));
            if let Some(existing) = existing {
                return (existing, false);
            }
        }

        collection.next_id += 1;
        let id = collection.next_id;

        let fields = strip_id(fields);
        let created = with_id(id, &fields);
        collection.records.insert(id, fields);
        if let Some(key) = key {
            collection.keys.insert(key.to_string(), id);
        }
        (created, true)
    }

    /// Replaces an existing object. Returns `None` if the id is unknown.
    pub async fn update(
        &self,
        resource: EntityType,
        id: u64,
        fields: Map<String, Value>,
    ) -> Option<Value> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(&resource)
            .and_then(|c| c.records.get_mut(&id))?;
        *record = strip_id(fields);
        Some(with_id(id, record))
    }

    /// Returns false if the id is unknown.
    pub async fn delete(&self, resource: EntityType, id: u64) -> bool {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(&resource)
            .and_then(|c| c.records.remove(&id))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_ids_are_per_resource_and_not_reused() {
        let store = ResourceStore::new();

        let (a, _) = store
            .create(EntityType::Users, fields(json!({"name": "Ana"})), None)
            .await;
        let (b, _) = store
            .create(EntityType::Users, fields(json!({"name": "Bo"})), None)
            .await;
        let (v, _) = store
            .create(EntityType::Vehicles, fields(json!({"make": "Kia"})), None)
            .await;
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
        assert_eq!(v["id"], 1);

        assert!(store.delete(EntityType::Users, 2).await);
        let (c, _) = store
            .create(EntityType::Users, fields(json!({"name": "Cy"})), None)
            .await;
        assert_eq!(c["id"], 3);
    }

    #[tokio::test]
    async fn test_client_supplied_id_is_ignored() {
        let store = ResourceStore::new();
        let (created, _) = store
            .create(
                EntityType::Locations,
                fields(json!({"id": 99, "name": "Depot"})),
                None,
            )
            .await;
        assert_eq!(created, json!({"id": 1, "name": "Depot"}));
    }

    #[tokio::test]
    async fn test_repeated_key_returns_existing_record() {
        let store = ResourceStore::new();
        let (first, new) = store
            .create(EntityType::Vehicles, fields(json!({"make": "Kia"})), Some("k1"))
            .await;
        assert!(new);

        let (again, new) = store
            .create(EntityType::Vehicles, fields(json!({"make": "Kia"})), Some("k1"))
            .await;
        assert!(!new);
        assert_eq!(again, first);
        assert_eq!(store.list(EntityType::Vehicles).await.len(), 1);

        // Keys are per resource
        let (_, new) = store
            .create(EntityType::Users, fields(json!({"name": "Ana"})), Some("k1"))
            .await;
        assert!(new);

        // Once the record is gone the key creates afresh
        assert!(store.delete(EntityType::Vehicles, 1).await);
        let (recreated, new) = store
            .create(EntityType::Vehicles, fields(json!({"make": "Kia"})), Some("k1"))
            .await;
        assert!(new);
        assert_eq!(recreated["id"], 2);
    }

    #[tokio::test]
    async fn test_update_unknown_returns_none() {
        let store = ResourceStore::new();
        assert!(store
            .update(EntityType::Messages, 5, fields(json!({"body": "hi"})))
            .await
            .is_none());
        assert!(!store.delete(EntityType::Messages, 5).await);
    }
}
