//! Directed, weighted transmission network between hosts.
//!
//! Hosts are identified by non-negative integers and exist implicitly through the edges that
//! reference them. An undirected relation is two independent directed edges; nothing in the
//! network keeps them symmetric.

use itertools::Itertools;
use std::collections::BTreeMap;
use std::io::Write;

use crate::errors::{ContagionError, Result};

pub type HostId = usize;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostNetwork {
    edges: BTreeMap<HostId, BTreeMap<HostId, f64>>,
}

impl HostNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the edge `from -> to`, replacing the weight of an existing edge.
    pub fn add_weighted_connection(
        &mut self,
        from: HostId,
        to: HostId,
        weight: f64,
    ) -> Result<()> {
        if !weight.is_finite() || weight < 0. {
            return Err(ContagionError::ValidationError(format!(
                "Invalid weight {weight} for connection ({from},{to}), must be finite and non-negative"
            )));
        }
        self.edges.entry(from).or_default().insert(to, weight);
        Ok(())
    }

    /// Insert an unweighted edge, which carries weight 1.
    pub fn add_connection(&mut self, from: HostId, to: HostId) -> Result<()> {
        self.add_weighted_connection(from, to, 1.)
    }

    /// Insert both `a -> b` and `b -> a` with the same weight.
    pub fn add_weighted_bi_connection(
        &mut self,
        a: HostId,
        b: HostId,
        weight: f64,
    ) -> Result<()> {
        if a == b {
            return Err(ContagionError::ValidationError(format!(
                "Cannot connect host {a} to itself in both directions"
            )));
        }
        self.add_weighted_connection(a, b, weight)?;
        self.add_weighted_connection(b, a, weight)
    }

    /// Remove the edge `from -> to`. Returns the removed weight.
    pub fn remove_connection(&mut self, from: HostId, to: HostId) -> Option<f64> {
        let targets = self.edges.get_mut(&from)?;
        let weight = targets.remove(&to);
        if targets.is_empty() {
            self.edges.remove(&from);
        }
        weight
    }

    /// Remove both `a -> b` and `b -> a`. Returns whether either edge existed.
    pub fn remove_bi_connection(&mut self, a: HostId, b: HostId) -> bool {
        let forward = self.remove_connection(a, b).is_some();
        let backward = self.remove_connection(b, a).is_some();
        forward || backward
    }

    pub fn bi_connection_exists(&self, a: HostId, b: HostId) -> bool {
        self.connection_exists(a, b) && self.connection_exists(b, a)
    }

    pub fn connection_exists(&self, from: HostId, to: HostId) -> bool {
        self.weight(from, to).is_some()
    }

    pub fn weight(&self, from: HostId, to: HostId) -> Option<f64> {
        self.edges.get(&from)?.get(&to).copied()
    }

    /// Outgoing edges of `host` as `(destination, weight)` pairs, ordered by destination.
    ///
    /// Hosts without outgoing edges, including hosts that never appeared in the network, have no
    /// neighbors.
    pub fn neighbors(&self, host: HostId) -> Vec<(HostId, f64)> {
        self.edges
            .get(&host)
            .map(|targets| targets.iter().map(|(&to, &weight)| (to, weight)).collect())
            .unwrap_or_default()
    }

    pub fn neighbor_ids(&self, host: HostId) -> Vec<HostId> {
        self.edges
            .get(&host)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of distinct hosts that take part in at least one edge.
    pub fn connected_pop_size(&self) -> usize {
        self.edges
            .iter()
            .flat_map(|(&from, targets)| std::iter::once(from).chain(targets.keys().copied()))
            .unique()
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Write one `from to weight` line per edge.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        for (from, targets) in &self.edges {
            for (to, weight) in targets {
                writeln!(writer, "{from}\t{to}\t{weight}")?;
            }
        }
        Ok(())
    }
}
