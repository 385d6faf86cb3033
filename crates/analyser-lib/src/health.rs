//! Health tracking for the analyser service
//!
//! Backs the liveness and readiness probe endpoints with per-component
//! status and a single ready flag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// The components whose health is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Component {
    Engine,
    EventLoop,
    Ingest,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Engine => "engine",
            Component::EventLoop => "event_loop",
            Component::Ingest => "ingest",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Whether the component is at least partially operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// One component's current health, with the time it last changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub since_timestamp: i64,
}

impl ComponentHealth {
    fn now(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            since_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::now(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::now(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::now(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Aggregate health: the worst component status wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthInner {
    components: BTreeMap<Component, ComponentHealth>,
    ready: bool,
}

/// Shared health registry handed to every component and probe handler.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    inner: Arc<RwLock<HealthInner>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, initially healthy.
    pub fn register(&self, component: Component) {
        self.mark(component, ComponentHealth::healthy());
    }

    pub fn mark(&self, component: Component, health: ComponentHealth) {
        let mut inner = self.inner.write().unwrap();
        inner.components.insert(component, health);
    }

    pub fn set_healthy(&self, component: Component) {
        self.mark(component, ComponentHealth::healthy());
    }

    pub fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.mark(component, ComponentHealth::degraded(message));
    }

    pub fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.mark(component, ComponentHealth::unhealthy(message));
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.write().unwrap().ready = ready;
    }

    pub fn health(&self) -> HealthResponse {
        let inner = self.inner.read().unwrap();
        let mut status = ComponentStatus::Healthy;
        let mut components = BTreeMap::new();
        for (component, health) in &inner.components {
            status = match (status, health.status) {
                (_, ComponentStatus::Unhealthy) | (ComponentStatus::Unhealthy, _) => {
                    ComponentStatus::Unhealthy
                }
                (_, ComponentStatus::Degraded) | (ComponentStatus::Degraded, _) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            };
            components.insert(component.as_str().to_string(), health.clone());
        }
        HealthResponse { status, components }
    }

    pub fn readiness(&self) -> ReadinessResponse {
        let ready = self.inner.read().unwrap().ready;
        if !ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Analyser not yet initialized".to_string()),
            };
        }
        if self.health().status == ComponentStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            };
        }
        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();
        assert_eq!(registry.health().status, ComponentStatus::Healthy);
        assert!(registry.health().components.is_empty());
        assert!(!registry.readiness().ready);
    }

    #[test]
    fn test_registered_component_starts_healthy() {
        let registry = HealthRegistry::new();
        registry.register(Component::Engine);

        let health = registry.health();
        assert_eq!(health.components["engine"].status, ComponentStatus::Healthy);
    }

    #[test]
    fn test_one_degraded_component_degrades_the_aggregate() {
        let registry = HealthRegistry::new();
        registry.register(Component::Engine);
        registry.register(Component::EventLoop);
        registry.set_degraded(Component::EventLoop, "Inbox backlog growing");

        let health = registry.health();
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.status.is_operational());
    }

    #[test]
    fn test_unhealthy_outranks_degraded() {
        let registry = HealthRegistry::new();
        registry.register(Component::Engine);
        registry.register(Component::EventLoop);
        registry.set_degraded(Component::EventLoop, "Inbox backlog growing");
        registry.set_unhealthy(Component::Engine, "Usage inference failed");

        assert_eq!(registry.health().status, ComponentStatus::Unhealthy);
    }

    #[test]
    fn test_ready_flag_gates_readiness() {
        let registry = HealthRegistry::new();
        assert!(!registry.readiness().ready);

        registry.set_ready(true);
        assert!(registry.readiness().ready);
        assert!(registry.readiness().reason.is_none());
    }

    #[test]
    fn test_unhealthy_component_blocks_readiness() {
        let registry = HealthRegistry::new();
        registry.register(Component::Engine);
        registry.set_ready(true);
        registry.set_unhealthy(Component::Engine, "Usage inference failed");

        let readiness = registry.readiness();
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[test]
    fn test_recovery_restores_health() {
        let registry = HealthRegistry::new();
        registry.register(Component::Engine);
        registry.set_unhealthy(Component::Engine, "Usage inference failed");
        registry.set_healthy(Component::Engine);

        assert_eq!(registry.health().status, ComponentStatus::Healthy);
    }
}
