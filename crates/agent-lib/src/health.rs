//! Health tracking for the watcher
//!
//! Each watcher component (engine, store, sink) reports its own state.
//! The overall status is the worst component status. Readiness also
//! requires that startup finished and that the store is not unhealthy,
//! since no pass can make progress without it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Watcher components that report health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Source polling and classification
    Engine,
    /// Durable sample store
    Store,
    /// Alert delivery
    Sink,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Engine, Component::Store, Component::Sink];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Engine => "engine",
            Component::Store => "store",
            Component::Sink => "sink",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still polling, but the last attempt hit a problem
    Degraded,
    Unhealthy,
}

/// Latest reported state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components; healthy when none are registered
    pub fn compute_status(components: &BTreeMap<Component, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    started: bool,
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, component: Component) {
        self.update(component, ComponentHealth::healthy()).await;
    }

    /// Register every watcher component as healthy
    pub async fn register_all(&self) {
        for component in Component::ALL {
            self.register(component).await;
        }
    }

    pub async fn update(&self, component: Component, health: ComponentHealth) {
        self.state.write().await.components.insert(component, health);
    }

    pub async fn set_healthy(&self, component: Component) {
        self.update(component, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.update(component, ComponentHealth::degraded(message))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.update(component, ComponentHealth::unhealthy(message))
            .await;
    }

    pub async fn component(&self, component: Component) -> Option<ComponentHealth> {
        self.state.read().await.components.get(&component).cloned()
    }

    /// Mark startup as finished (or the watcher as draining when `false`)
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.started = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        HealthResponse {
            status: HealthResponse::compute_status(&components),
            components,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if !state.started {
            Some("Watcher not yet initialized".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(_, h)| h.status == ComponentStatus::Unhealthy)
                .map(|(component, h)| match &h.message {
                    Some(message) => format!("{} unhealthy: {}", component, message),
                    None => format!("{} unhealthy", component),
                })
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let health = registry.health().await;
        assert_eq!(health.components.len(), 3);
        assert!(health
            .components
            .values()
            .all(|c| c.status == ComponentStatus::Healthy));
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        registry
            .set_degraded(Component::Sink, "1 alert deliveries failed")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(Component::Store, "state file unwritable")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.set_healthy(Component::Store).await;
        registry.set_healthy(Component::Sink).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_component_lookup() {
        let registry = HealthRegistry::new();
        registry.register(Component::Sink).await;
        registry
            .set_degraded(Component::Sink, "1 alert deliveries failed")
            .await;

        let sink = registry.component(Component::Sink).await.unwrap();
        assert_eq!(sink.status, ComponentStatus::Degraded);
        assert_eq!(sink.message.as_deref(), Some("1 alert deliveries failed"));
        assert!(registry.component(Component::Engine).await.is_none());
    }

    #[tokio::test]
    async fn test_not_ready_before_startup() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Watcher not yet initialized")
        );
    }

    #[tokio::test]
    async fn test_degraded_engine_stays_ready() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_ready(true).await;
        registry
            .set_degraded(Component::Engine, "adapter 'silo' failed")
            .await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_unhealthy_store_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_ready(true).await;
        registry.set_unhealthy(Component::Store, "disk full").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("store unhealthy: disk full"));
    }

    #[test]
    fn test_components_serialize_by_name() {
        let mut components = BTreeMap::new();
        components.insert(Component::Store, ComponentHealth::healthy());
        let response = HealthResponse {
            status: HealthResponse::compute_status(&components),
            components,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["store"]["status"], "healthy");
    }
}
