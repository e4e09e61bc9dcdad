//! Waits-for graph construction and checks.
//!
//! # Responsibilities
//! - Collect service declarations and their dependency edges
//! - Reject duplicate names, dangling edges and cycles
//! - Produce a deterministic start order for the orchestrator
//!
//! # Design Decisions
//! - Nodes are keyed by name in ordered maps, so declaration order never
//!   changes the result
//! - `build` borrows the builder; building twice yields equal graphs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::topology::descriptor::{ServiceDescriptor, ServiceHandle};

/// Errors raised while assembling the topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("service `{0}` is declared more than once")]
    DuplicateService(String),

    #[error("service `{from}` waits for undeclared service `{to}`")]
    DanglingDependency { from: String, to: String },

    #[error("service handle {0} does not belong to this topology")]
    UnknownHandle(usize),

    /// Members are listed in traversal order.
    #[error("dependency cycle detected: {}", format_cycle(.members))]
    CycleDetected { members: Vec<String> },
}

fn format_cycle(members: &[String]) -> String {
    let mut out = members.join(" -> ");
    if let Some(first) = members.first() {
        out.push_str(" -> ");
        out.push_str(first);
    }
    out
}

static NEXT_BUILDER_ID: AtomicU64 = AtomicU64::new(0);

/// Builder for a [`TopologyGraph`].
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    id: u64,
    services: Vec<ServiceDescriptor>,
    index: HashMap<String, usize>,
    edges: Vec<(ServiceHandle, ServiceHandle)>,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self {
            id: NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed),
            services: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        }
    }
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_at(&self, index: usize) -> ServiceHandle {
        ServiceHandle {
            builder: self.id,
            index,
        }
    }

    /// Declare a service. Names listed in its `depends_on` are resolved at
    /// [`build`](Self::build) time.
    pub fn add_service(
        &mut self,
        descriptor: ServiceDescriptor,
    ) -> Result<ServiceHandle, TopologyError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(TopologyError::DuplicateService(descriptor.name));
        }
        let handle = self.handle_at(self.services.len());
        self.index.insert(descriptor.name.clone(), handle.index);
        self.services.push(descriptor);
        Ok(handle)
    }

    /// Declare that `from` waits for `to`.
    pub fn add_dependency(&mut self, from: ServiceHandle, to: ServiceHandle) {
        self.edges.push((from, to));
    }

    /// Look up a declared service by name.
    pub fn handle(&self, name: &str) -> Option<ServiceHandle> {
        self.index.get(name).map(|&index| self.handle_at(index))
    }

    /// Mutable access to a declared service.
    pub fn service_mut(&mut self, handle: ServiceHandle) -> Option<&mut ServiceDescriptor> {
        if handle.builder != self.id {
            return None;
        }
        self.services.get_mut(handle.index)
    }

    fn name_of(&self, handle: ServiceHandle) -> Result<&str, TopologyError> {
        self.services
            .get(handle.index)
            .filter(|_| handle.builder == self.id)
            .map(|s| s.name.as_str())
            .ok_or(TopologyError::UnknownHandle(handle.index))
    }

    /// Validate and freeze the graph.
    pub fn build(&self) -> Result<TopologyGraph, TopologyError> {
        let mut edges: BTreeMap<String, BTreeSet<String>> = self
            .services
            .iter()
            .map(|s| (s.name.clone(), BTreeSet::new()))
            .collect();

        for service in &self.services {
            for target in &service.depends_on {
                if !self.index.contains_key(target) {
                    return Err(TopologyError::DanglingDependency {
                        from: service.name.clone(),
                        to: target.clone(),
                    });
                }
                if let Some(deps) = edges.get_mut(&service.name) {
                    deps.insert(target.clone());
                }
            }
        }

        for (from, to) in &self.edges {
            let from = self.name_of(*from)?;
            let to = self.name_of(*to)?.to_string();
            if let Some(deps) = edges.get_mut(from) {
                deps.insert(to);
            }
        }

        if let Some(members) = find_cycle(&edges) {
            tracing::warn!(cycle = %format_cycle(&members), "Topology contains a cycle");
            return Err(TopologyError::CycleDetected { members });
        }

        let services = self
            .services
            .iter()
            .map(|s| {
                let mut service = s.clone();
                service.depends_on = edges
                    .get(&s.name)
                    .map(|deps| deps.iter().cloned().collect())
                    .unwrap_or_default();
                (s.name.clone(), service)
            })
            .collect();

        Ok(TopologyGraph { services })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search in name order; returns the first cycle found.
fn find_cycle(edges: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    fn visit<'a>(
        node: &'a str,
        edges: &'a BTreeMap<String, BTreeSet<String>>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                return Some(path[start..].iter().map(|n| n.to_string()).collect());
            }
            None => {}
        }

        marks.insert(node, Mark::Visiting);
        path.push(node);
        if let Some(deps) = edges.get(node) {
            for dep in deps {
                if let Some(cycle) = visit(dep, edges, marks, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    for node in edges.keys() {
        if let Some(cycle) = visit(node, edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

/// Acyclic set of services and their waits-for edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyGraph {
    services: BTreeMap<String, ServiceDescriptor>,
}

impl TopologyGraph {
    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Services `name` waits for, sorted.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.services
            .get(name)
            .map(|s| s.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// All `(from, to)` waits-for edges, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services.values().flat_map(|s| {
            s.depends_on
                .iter()
                .map(move |dep| (s.name.as_str(), dep.as_str()))
        })
    }

    /// Dependencies first; ties broken by name.
    pub fn start_order(&self) -> Vec<&str> {
        let mut pending: BTreeMap<&str, usize> = self
            .services
            .values()
            .map(|s| (s.name.as_str(), s.depends_on.len()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, to) in self.edges() {
            dependents.entry(to).or_default().push(from);
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.services.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, format!("{}:latest", name))
    }

    fn stack() -> TopologyBuilder {
        let mut builder = TopologyBuilder::new();
        builder.add_service(svc("postgres")).unwrap();
        builder.add_service(svc("ollama")).unwrap();
        builder
            .add_service(svc("litellm").waits_for("postgres").waits_for("ollama"))
            .unwrap();
        builder
            .add_service(svc("openwebui").waits_for("postgres").waits_for("litellm"))
            .unwrap();
        builder.add_service(svc("n8n").waits_for("postgres")).unwrap();
        builder
    }

    #[test]
    fn test_build_and_start_order() {
        let graph = stack().build().unwrap();

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.dependencies_of("litellm"), ["ollama", "postgres"]);
        assert_eq!(
            graph.start_order(),
            vec!["ollama", "postgres", "litellm", "n8n", "openwebui"]
        );
    }

    #[test]
    fn test_two_node_cycle() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_service(svc("A")).unwrap();
        let b = builder.add_service(svc("B")).unwrap();
        builder.add_dependency(a, b);
        builder.add_dependency(b, a);

        match builder.build() {
            Err(TopologyError::CycleDetected { members }) => {
                let set: BTreeSet<_> = members.iter().map(String::as_str).collect();
                assert_eq!(set, BTreeSet::from(["A", "B"]));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_reports_only_members() {
        let mut builder = TopologyBuilder::new();
        builder.add_service(svc("entry").waits_for("x")).unwrap();
        builder.add_service(svc("x").waits_for("y")).unwrap();
        builder.add_service(svc("y").waits_for("z")).unwrap();
        builder.add_service(svc("z").waits_for("x")).unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            TopologyError::CycleDetected {
                members: vec!["x".into(), "y".into(), "z".into()]
            }
        );
        assert_eq!(err.to_string(), "dependency cycle detected: x -> y -> z -> x");
    }

    #[test]
    fn test_self_edge_is_cycle() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_service(svc("a")).unwrap();
        builder.add_dependency(a, a);
        assert!(matches!(
            builder.build(),
            Err(TopologyError::CycleDetected { members }) if members == vec!["a".to_string()]
        ));
    }

    #[test]
    fn test_duplicate_service() {
        let mut builder = TopologyBuilder::new();
        builder.add_service(svc("db")).unwrap();
        assert_eq!(
            builder.add_service(svc("db")),
            Err(TopologyError::DuplicateService("db".into()))
        );
    }

    #[test]
    fn test_dangling_dependency() {
        let mut builder = TopologyBuilder::new();
        builder.add_service(svc("ui").waits_for("missing")).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            TopologyError::DanglingDependency {
                from: "ui".into(),
                to: "missing".into()
            }
        );
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut other = TopologyBuilder::new();
        other.add_service(svc("a")).unwrap();
        let foreign = other.add_service(svc("b")).unwrap();

        let mut builder = TopologyBuilder::new();
        let a = builder.add_service(svc("a")).unwrap();
        builder.add_dependency(a, foreign);
        assert_eq!(builder.build().unwrap_err(), TopologyError::UnknownHandle(1));
    }

    #[test]
    fn test_foreign_handle_in_range_rejected() {
        let mut other = TopologyBuilder::new();
        let foreign = other.add_service(svc("x")).unwrap();

        let mut builder = TopologyBuilder::new();
        let a = builder.add_service(svc("a")).unwrap();
        builder.add_service(svc("b")).unwrap();
        assert!(builder.service_mut(foreign).is_none());

        builder.add_dependency(a, foreign);
        assert_eq!(builder.build().unwrap_err(), TopologyError::UnknownHandle(0));
    }

    #[test]
    fn test_cloned_builder_accepts_earlier_handles() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_service(svc("a")).unwrap();
        let b = builder.add_service(svc("b")).unwrap();

        let mut copy = builder.clone();
        copy.add_dependency(b, a);
        assert_eq!(copy.build().unwrap().start_order(), vec!["a", "b"]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = stack();
        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_declaration_order_irrelevant() {
        let mut reversed = TopologyBuilder::new();
        reversed.add_service(svc("n8n").waits_for("postgres")).unwrap();
        reversed
            .add_service(svc("openwebui").waits_for("litellm").waits_for("postgres"))
            .unwrap();
        reversed
            .add_service(svc("litellm").waits_for("ollama").waits_for("postgres"))
            .unwrap();
        reversed.add_service(svc("ollama")).unwrap();
        reversed.add_service(svc("postgres")).unwrap();

        assert_eq!(reversed.build().unwrap(), stack().build().unwrap());
    }

    #[test]
    fn test_handle_edges_merge_with_declared() {
        let mut builder = stack();
        let ui = builder.handle("openwebui").unwrap();
        let n8n = builder.handle("n8n").unwrap();
        builder.add_dependency(ui, n8n);

        let graph = builder.build().unwrap();
        assert_eq!(graph.dependencies_of("openwebui"), ["litellm", "n8n", "postgres"]);
        assert_eq!(graph.edges().count(), 6);
    }

    #[test]
    fn test_graph_serializes() {
        let graph = stack().build().unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["services"]["n8n"]["depends_on"][0], "postgres");
    }
}
