//! Read-only view of catalog state polled by the usage reporter.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

/// Namespace used for services registered without one.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Node the instance is registered on.
    pub node: String,
    /// Instance ID, unique per node.
    pub id: String,
    /// Logical service name; several instances may share it.
    pub service: String,
    pub port: u16,
    /// `None` when the deployment has no multi-tenancy.
    pub namespace: Option<String>,
}

impl ServiceEntry {
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown node {0:?}")]
    UnknownNode(String),

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot queries the reporter relies on.
pub trait StateSnapshot: Send + Sync + 'static {
    fn nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Every registered service instance, across all namespaces.
    fn services(&self) -> Result<Vec<ServiceEntry>, StoreError>;
}

#[derive(Debug, Default)]
struct Catalog {
    nodes: BTreeMap<String, Node>,
    services: BTreeMap<(String, String), ServiceEntry>,
}

/// In-memory catalog keyed by node name and by (node, service id).
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub fn ensure_node(&self, node: Node) {
        let mut catalog = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        catalog.nodes.insert(node.name.clone(), node);
    }

    /// Insert or replace a service instance on an existing node.
    pub fn ensure_service(&self, service: ServiceEntry) -> Result<(), StoreError> {
        let mut catalog = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !catalog.nodes.contains_key(&service.node) {
            return Err(StoreError::UnknownNode(service.node));
        }
        catalog
            .services
            .insert((service.node.clone(), service.id.clone()), service);
        Ok(())
    }
}

impl StateSnapshot for MemoryStore {
    fn nodes(&self) -> Result<Vec<Node>, StoreError> {
        let catalog = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(catalog.nodes.values().cloned().collect())
    }

    fn services(&self) -> Result<Vec<ServiceEntry>, StoreError> {
        let catalog = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(catalog.services.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> Node {
        Node {
            name: name.into(),
            address: "127.0.0.1".into(),
        }
    }

    fn service(node: &str, id: &str) -> ServiceEntry {
        ServiceEntry {
            node: node.into(),
            id: id.into(),
            service: id.into(),
            port: 5000,
            namespace: None,
        }
    }

    #[test]
    fn service_requires_known_node() {
        let store = MemoryStore::new();
        assert_eq!(
            store.ensure_service(service("ghost", "db")),
            Err(StoreError::UnknownNode("ghost".into()))
        );
        assert!(store.services().unwrap().is_empty());
    }

    #[test]
    fn ensure_replaces_by_key() {
        let store = MemoryStore::new();
        store.ensure_node(node("foo"));
        store.ensure_node(Node {
            name: "foo".into(),
            address: "10.0.0.9".into(),
        });
        assert_eq!(store.nodes().unwrap().len(), 1);
        assert_eq!(store.nodes().unwrap()[0].address, "10.0.0.9");

        store.ensure_service(service("foo", "db")).unwrap();
        let mut moved = service("foo", "db");
        moved.port = 6000;
        store.ensure_service(moved).unwrap();
        let services = store.services().unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].port, 6000);
    }

    #[test]
    fn missing_namespace_reads_as_default() {
        let mut svc = service("foo", "db");
        assert_eq!(svc.namespace_or_default(), DEFAULT_NAMESPACE);
        svc.namespace = Some("team-a".into());
        assert_eq!(svc.namespace_or_default(), "team-a");
    }
}
