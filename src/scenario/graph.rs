//! Scenario dependency forest.
//!
//! Provides:
//! - Validation (unique keys, known parents, no cycles)
//! - Generation order via Kahn's algorithm, stable in declaration order
//! - Ancestor chains and descendant sets for partial generation

use super::{Domain, Scenario};
use crate::error::{FixtureError, Result};
use ahash::AHashMap;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::VecDeque;

/// Summary of one scenario's place in the forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ScenarioInfo {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Number of ancestors
    pub depth: usize,
    pub children: Vec<String>,
}

/// A validated set of scenarios, ordered parents before children
pub struct ScenarioSet<D: Domain> {
    scenarios: Vec<Box<dyn Scenario<D>>>,
    /// Index of each scenario's parent
    parents: Vec<Option<usize>>,
    /// For each scenario, its children in declaration order
    children: Vec<Vec<usize>>,
    /// Generation order (indices into `scenarios`)
    order: Vec<usize>,
}

impl<D: Domain> ScenarioSet<D> {
    pub fn new(scenarios: Vec<Box<dyn Scenario<D>>>) -> Result<Self> {
        let mut index: AHashMap<&str, usize> = AHashMap::new();
        for (i, s) in scenarios.iter().enumerate() {
            if s.key().is_empty() {
                return Err(FixtureError::ScenarioGraph(
                    "scenario keys must not be empty".to_string(),
                ));
            }
            if index.insert(s.key(), i).is_some() {
                return Err(FixtureError::ScenarioGraph(format!(
                    "scenario '{}' is declared more than once",
                    s.key()
                )));
            }
        }

        let n = scenarios.len();
        let mut parents = vec![None; n];
        let mut children = vec![Vec::new(); n];
        for (i, s) in scenarios.iter().enumerate() {
            if let Some(parent) = s.parent() {
                let p = *index.get(parent).ok_or_else(|| {
                    FixtureError::ScenarioGraph(format!(
                        "scenario '{}' has unknown parent '{}'",
                        s.key(),
                        parent
                    ))
                })?;
                parents[i] = Some(p);
                children[p].push(i);
            }
        }

        let order = topo_order(&parents, &children);
        if order.len() < n {
            let mut cyclic: Vec<&str> = (0..n)
                .filter(|i| !order.contains(i))
                .map(|i| scenarios[i].key())
                .collect();
            cyclic.sort_unstable();
            return Err(FixtureError::ScenarioGraph(format!(
                "circular parent references between: {}",
                cyclic.join(", ")
            )));
        }

        Ok(Self {
            scenarios,
            parents,
            children,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.scenarios.iter().position(|s| s.key() == key)
    }

    fn require(&self, key: &str) -> Result<usize> {
        self.position(key)
            .ok_or_else(|| FixtureError::ScenarioGraph(format!("unknown scenario '{}'", key)))
    }

    pub fn get(&self, key: &str) -> Option<&dyn Scenario<D>> {
        self.position(key).map(|i| self.scenarios[i].as_ref())
    }

    /// Scenarios in generation order (parents before children)
    pub fn ordered(&self) -> impl Iterator<Item = &dyn Scenario<D>> {
        self.order.iter().map(move |&i| self.scenarios[i].as_ref())
    }

    /// Keys in generation order
    pub fn keys(&self) -> Vec<&str> {
        self.ordered().map(|s| s.key()).collect()
    }

    /// One entry per scenario, in generation order
    pub fn describe(&self) -> Vec<ScenarioInfo> {
        self.order
            .iter()
            .map(|&i| {
                let mut depth = 0;
                let mut current = self.parents[i];
                while let Some(p) = current {
                    depth += 1;
                    current = self.parents[p];
                }
                ScenarioInfo {
                    key: self.scenarios[i].key().to_string(),
                    parent: self.scenarios[i].parent().map(String::from),
                    depth,
                    children: self.children[i]
                        .iter()
                        .map(|&c| self.scenarios[c].key().to_string())
                        .collect(),
                }
            })
            .collect()
    }

    /// Ancestors of `key`, root first, followed by `key` itself
    pub fn chain(&self, key: &str) -> Result<Vec<&str>> {
        let mut chain = Vec::new();
        let mut current = Some(self.require(key)?);
        while let Some(i) = current {
            chain.push(self.scenarios[i].key());
            current = self.parents[i];
        }
        chain.reverse();
        Ok(chain)
    }

    /// Every scenario that has `key` as a direct or transitive ancestor
    pub fn descendants(&self, key: &str) -> Result<Vec<&str>> {
        let start = self.require(key)?;
        let mut found = Vec::new();
        let mut queue: VecDeque<usize> = self.children[start].iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            found.push(self.scenarios[i].key());
            queue.extend(self.children[i].iter().copied());
        }
        Ok(found)
    }

    /// The listed scenarios plus their ancestors, in generation order
    pub fn select(&self, keys: &[String]) -> Result<Vec<&dyn Scenario<D>>> {
        let mut wanted = vec![false; self.len()];
        for key in keys {
            let mut current = Some(self.require(key)?);
            while let Some(i) = current {
                wanted[i] = true;
                current = self.parents[i];
            }
        }
        Ok(self
            .order
            .iter()
            .filter(|&&i| wanted[i])
            .map(|&i| self.scenarios[i].as_ref())
            .collect())
    }
}

/// Kahn's algorithm over a forest. Nodes caught in a cycle never reach
/// in-degree zero and are left out of the result.
fn topo_order(parents: &[Option<usize>], children: &[Vec<usize>]) -> Vec<usize> {
    let mut queue: VecDeque<usize> = parents
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_none())
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(parents.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        // Each node has at most one parent, so every child is ready now.
        queue.extend(children[i].iter().copied());
    }
    order
}
