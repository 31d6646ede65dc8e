//! A small in-memory "items" manager demonstrating handlers, path
//! parameters, session-backed identity, and pub/sub event emission.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskwire_broker::{LocalBroker, PubSubTransport};
use taskwire_core::body::Body;
use taskwire_core::context::TaskContext;
use taskwire_core::error::TaskError;
use taskwire_core::handler::Handler;
use taskwire_core::manager::Manager;
use taskwire_core::registry::TaskRegistry;
use taskwire_core::result::{TaskResult, TaskStatus};
use taskwire_core::task::{Task, TaskMetadata};
use taskwire_core::task_id::{Method, TaskId};
use taskwire_security::middleware::require_roles;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub done: bool,
}

#[derive(Default)]
pub struct ItemStore {
    items: DashMap<u64, Item>,
    next_id: std::sync::atomic::AtomicU64,
}

impl ItemStore {
    fn insert(&self, name: String) -> Item {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let item = Item { id, name, done: false };
        self.items.insert(id, item.clone());
        item
    }
}

struct ListItems {
    store: Arc<ItemStore>,
}

#[async_trait]
impl Handler for ListItems {
    async fn handle(&self, _ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let items: Vec<Item> = self.store.items.iter().map(|e| e.value().clone()).collect();
        Ok(TaskResult::ok(Body::Json(serde_json::json!(items))))
    }
}

struct GetItem {
    store: Arc<ItemStore>,
}

#[async_trait]
impl Handler for GetItem {
    async fn handle(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let id = ctx
            .task
            .path_params
            .get("id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| TaskError::ParamsInvalid("id".into()))?;
        let item = self.store.items.get(&id).ok_or_else(|| TaskError::NotFound(format!("item {id}")))?;
        Ok(TaskResult::ok(Body::Json(serde_json::json!(item.value().clone()))))
    }
}

struct CreateItem {
    store: Arc<ItemStore>,
    broker: Arc<LocalBroker>,
}

#[async_trait]
impl Handler for CreateItem {
    async fn handle(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        require_roles(ctx, &["editor", "admin"]).await?;
        let name = ctx
            .task
            .resolve_param("name")
            .await?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| TaskError::ParamRequired("name".into()))?;
        let item = self.store.insert(name);

        let event = Task::new(
            TaskId::simple(Method::Post, "/items"),
            TaskMetadata::with_generated_trace_id(),
        );
        self.broker.publish("item.created", event).await?;

        Ok(TaskResult::json(TaskStatus::Created, serde_json::json!(item)))
    }
}

struct DeleteItem {
    store: Arc<ItemStore>,
}

#[async_trait]
impl Handler for DeleteItem {
    async fn handle(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        require_roles(ctx, &["admin"]).await?;
        let id = ctx
            .task
            .path_params
            .get("id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| TaskError::ParamsInvalid("id".into()))?;
        self.store.items.remove(&id).ok_or_else(|| TaskError::NotFound(format!("item {id}")))?;
        Ok(TaskResult::no_content())
    }
}

pub struct ItemsManager {
    store: Arc<ItemStore>,
    broker: Arc<LocalBroker>,
}

impl ItemsManager {
    pub fn new(store: Arc<ItemStore>, broker: Arc<LocalBroker>) -> Self {
        Self { store, broker }
    }
}

impl Manager for ItemsManager {
    fn name(&self) -> &'static str {
        "items"
    }

    fn prefix(&self) -> TaskId {
        TaskId::simple(Method::Any, "/items")
    }

    fn routes(&self) -> TaskRegistry {
        let id_types: std::collections::HashMap<String, Arc<dyn taskwire_core::convert::Converter>> =
            std::collections::HashMap::from([("id".to_string(), Arc::new(taskwire_core::convert::IntConverter) as Arc<dyn taskwire_core::convert::Converter>)]);

        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/"), Arc::new(ListItems { store: self.store.clone() }));
        registry.add_handler(
            TaskId::new(Method::Get, "/{id}", '/', &id_types),
            Arc::new(GetItem { store: self.store.clone() }),
        );
        registry.add_handler(
            TaskId::simple(Method::Post, "/"),
            Arc::new(CreateItem { store: self.store.clone(), broker: self.broker.clone() }),
        );
        registry.add_handler(
            TaskId::new(Method::Delete, "/{id}", '/', &id_types),
            Arc::new(DeleteItem { store: self.store.clone() }),
        );
        registry
    }
}
