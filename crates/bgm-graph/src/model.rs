//! Arena-backed model graph with transactional dirty propagation.

use std::collections::{BTreeMap, BTreeSet};

use bgm_core::errors::ErrorInfo;
use bgm_core::{BgmError, NodeId};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::interfaces::{sanitize_ln, Distribution, NodeFunction};
use crate::value::Value;

/// Kind tag of a node, exposed for callers that dispatch on node roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKindTag {
    /// Fixed value, no distribution.
    Constant,
    /// Value drawn from a distribution; carries a log probability.
    Stochastic,
    /// Value computed from parents by a pure function.
    Deterministic,
}

/// Aggregate log-probability breakdown over the stochastic nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilitySummary {
    /// Sum over all stochastic nodes (clamped nodes excluded in under-prior
    /// mode).
    pub posterior: f64,
    /// Sum over clamped (observed) stochastic nodes.
    pub likelihood: f64,
    /// Sum over unclamped stochastic nodes.
    pub prior: f64,
}

enum NodeKind {
    Constant {
        value: Value,
    },
    Stochastic {
        distribution: Box<dyn Distribution>,
        current: Value,
        stored: Value,
        ln_probability: f64,
        stored_ln_probability: f64,
        clamped: bool,
    },
    Deterministic {
        function: Box<dyn NodeFunction>,
        current: Value,
        stored: Value,
    },
}

struct NodeRecord {
    name: String,
    parents: Vec<NodeId>,
    children: BTreeSet<NodeId>,
    dirty: bool,
    touched: bool,
    kind: NodeKind,
}

impl NodeRecord {
    fn tag(&self) -> NodeKindTag {
        match self.kind {
            NodeKind::Constant { .. } => NodeKindTag::Constant,
            NodeKind::Stochastic { .. } => NodeKindTag::Stochastic,
            NodeKind::Deterministic { .. } => NodeKindTag::Deterministic,
        }
    }

    fn value(&self) -> &Value {
        match &self.kind {
            NodeKind::Constant { value } => value,
            NodeKind::Stochastic { current, .. } => current,
            NodeKind::Deterministic { current, .. } => current,
        }
    }

    fn stored_value(&self) -> &Value {
        match &self.kind {
            NodeKind::Constant { value } => value,
            NodeKind::Stochastic { stored, .. } => stored,
            NodeKind::Deterministic { stored, .. } => stored,
        }
    }
}

/// The set of computational nodes reachable from a model's roots.
///
/// Nodes live in an arena indexed by [`NodeId`]; parent edges are the ordered
/// read dependencies, child edges a back-reference used only for propagation.
/// The two edge sets are kept mutually consistent by construction, and the
/// graph is a DAG because parents must exist before their children (the one
/// edit that could break this, [`ModelGraph::swap_parent`], performs an
/// explicit reachability check).
#[derive(Default)]
pub struct ModelGraph {
    nodes: Vec<NodeRecord>,
}

impl ModelGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all node identifiers in creation order.
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId::from_raw(i as u64))
    }

    /// True when `id` refers to a node of this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        (id.as_raw() as usize) < self.nodes.len()
    }

    fn index(&self, id: NodeId) -> Result<usize, BgmError> {
        let idx = id.as_raw() as usize;
        if idx < self.nodes.len() {
            Ok(idx)
        } else {
            Err(BgmError::Construction(
                ErrorInfo::new("unknown-node", "node identifier not present in graph")
                    .with_context("node", id.to_string()),
            ))
        }
    }

    fn register(&mut self, record: NodeRecord) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u64);
        for parent in record.parents.clone() {
            let parent_idx = parent.as_raw() as usize;
            self.nodes[parent_idx].children.insert(id);
        }
        self.nodes.push(record);
        id
    }

    fn check_parents(&self, parents: &[NodeId]) -> Result<(), BgmError> {
        for parent in parents {
            self.index(*parent)?;
        }
        Ok(())
    }

    fn parent_values(&self, idx: usize) -> Vec<Value> {
        self.nodes[idx]
            .parents
            .iter()
            .map(|parent| self.nodes[parent.as_raw() as usize].value().clone())
            .collect()
    }

    /// Adds a constant node with a fixed value.
    pub fn add_constant(&mut self, name: impl Into<String>, value: Value) -> NodeId {
        self.register(NodeRecord {
            name: name.into(),
            parents: Vec::new(),
            children: BTreeSet::new(),
            dirty: false,
            touched: false,
            kind: NodeKind::Constant { value },
        })
    }

    /// Adds a stochastic node with the given distribution, parameter parents,
    /// and initial value.
    ///
    /// Parameter arity and kinds are validated here so that mismatches are
    /// construction-time failures rather than silent `-inf` densities mid-run.
    pub fn add_stochastic(
        &mut self,
        name: impl Into<String>,
        distribution: Box<dyn Distribution>,
        parents: &[NodeId],
        initial: Value,
    ) -> Result<NodeId, BgmError> {
        let name = name.into();
        self.check_parents(parents)?;
        if parents.len() != distribution.arity() {
            return Err(BgmError::Construction(
                ErrorInfo::new("parameter-arity", "wrong number of distribution parameters")
                    .with_context("node", name)
                    .with_context("distribution", distribution.name())
                    .with_context("expected", distribution.arity().to_string())
                    .with_context("actual", parents.len().to_string()),
            ));
        }
        let params: Vec<Value> = parents
            .iter()
            .map(|parent| self.nodes[parent.as_raw() as usize].value().clone())
            .collect();
        distribution.validate_parameters(&params)?;
        let ln = sanitize_ln(distribution.ln_density(&initial, &params));
        Ok(self.register(NodeRecord {
            name,
            parents: parents.to_vec(),
            children: BTreeSet::new(),
            dirty: false,
            touched: false,
            kind: NodeKind::Stochastic {
                distribution,
                current: initial.clone(),
                stored: initial,
                ln_probability: ln,
                stored_ln_probability: ln,
                clamped: false,
            },
        }))
    }

    /// Adds a deterministic node computing `function` over its parents.
    ///
    /// The function is evaluated once here, which both validates the argument
    /// kinds and initializes the cached value.
    pub fn add_deterministic(
        &mut self,
        name: impl Into<String>,
        function: Box<dyn NodeFunction>,
        parents: &[NodeId],
    ) -> Result<NodeId, BgmError> {
        let name = name.into();
        self.check_parents(parents)?;
        if let Some(arity) = function.arity() {
            if parents.len() != arity {
                return Err(BgmError::Construction(
                    ErrorInfo::new("argument-arity", "wrong number of function arguments")
                        .with_context("node", name)
                        .with_context("function", function.name())
                        .with_context("expected", arity.to_string())
                        .with_context("actual", parents.len().to_string()),
                ));
            }
        } else if parents.is_empty() {
            return Err(BgmError::Construction(
                ErrorInfo::new("argument-arity", "variadic function needs at least one argument")
                    .with_context("node", name)
                    .with_context("function", function.name()),
            ));
        }
        let params: Vec<Value> = parents
            .iter()
            .map(|parent| self.nodes[parent.as_raw() as usize].value().clone())
            .collect();
        let initial = function.evaluate(&params)?;
        Ok(self.register(NodeRecord {
            name,
            parents: parents.to_vec(),
            children: BTreeSet::new(),
            dirty: false,
            touched: false,
            kind: NodeKind::Deterministic {
                function,
                current: initial.clone(),
                stored: initial,
            },
        }))
    }

    /// Returns the node's display name.
    pub fn name(&self, id: NodeId) -> Result<&str, BgmError> {
        Ok(&self.nodes[self.index(id)?].name)
    }

    /// Finds a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|record| record.name == name)
            .map(|idx| NodeId::from_raw(idx as u64))
    }

    /// Returns the node's kind tag.
    pub fn kind(&self, id: NodeId) -> Result<NodeKindTag, BgmError> {
        Ok(self.nodes[self.index(id)?].tag())
    }

    /// Returns the cached value of a node. Never triggers recomputation; the
    /// sampling loop reads values in O(1) and recomputation is driven
    /// explicitly by touch propagation.
    pub fn value(&self, id: NodeId) -> Result<&Value, BgmError> {
        Ok(self.nodes[self.index(id)?].value())
    }

    /// Returns the pre-proposal baseline value of a node.
    pub fn stored_value(&self, id: NodeId) -> Result<&Value, BgmError> {
        Ok(self.nodes[self.index(id)?].stored_value())
    }

    /// Returns the ordered parent identifiers of a node.
    pub fn parents(&self, id: NodeId) -> Result<&[NodeId], BgmError> {
        Ok(&self.nodes[self.index(id)?].parents)
    }

    /// Returns the child identifiers of a node in ascending order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, BgmError> {
        Ok(self.nodes[self.index(id)?].children.iter().copied().collect())
    }

    /// True while the node awaits re-evaluation in a pending transaction.
    pub fn is_dirty(&self, id: NodeId) -> Result<bool, BgmError> {
        Ok(self.nodes[self.index(id)?].dirty)
    }

    /// True when the node was directly mutated by the pending transaction.
    pub fn is_touched(&self, id: NodeId) -> Result<bool, BgmError> {
        Ok(self.nodes[self.index(id)?].touched)
    }

    /// True for stochastic nodes whose value is fixed to observed data.
    pub fn is_clamped(&self, id: NodeId) -> Result<bool, BgmError> {
        Ok(matches!(
            self.nodes[self.index(id)?].kind,
            NodeKind::Stochastic { clamped: true, .. }
        ))
    }

    /// Identifiers of all stochastic nodes in creation order.
    pub fn stochastic_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, record)| matches!(record.kind, NodeKind::Stochastic { .. }))
            .map(|(idx, _)| NodeId::from_raw(idx as u64))
            .collect()
    }

    /// Marks a node as directly mutated and propagates dirtiness to its
    /// descendants.
    ///
    /// Propagation stops at nodes that are already dirty, which bounds the
    /// traversal to the affected subgraph rather than the whole graph. This is
    /// the key performance invariant of the proposal loop.
    pub fn touch(&mut self, id: NodeId) -> Result<(), BgmError> {
        let idx = self.index(id)?;
        let record = &mut self.nodes[idx];
        record.touched = true;
        if record.dirty {
            return Ok(());
        }
        record.dirty = true;
        let children: Vec<NodeId> = record.children.iter().copied().collect();
        for child in children {
            self.propagate_dirty(child);
        }
        Ok(())
    }

    fn propagate_dirty(&mut self, id: NodeId) {
        let idx = id.as_raw() as usize;
        let record = &mut self.nodes[idx];
        if record.dirty {
            return;
        }
        record.dirty = true;
        let children: Vec<NodeId> = record.children.iter().copied().collect();
        for child in children {
            self.propagate_dirty(child);
        }
    }

    /// Returns the transitive child closure of a node (the node itself
    /// excluded) in ascending identifier order.
    pub fn affected_nodes(&self, id: NodeId) -> Result<Vec<NodeId>, BgmError> {
        self.index(id)?;
        let mut affected = BTreeSet::new();
        self.collect_descendants(id, &mut affected);
        affected.remove(&id);
        Ok(affected.into_iter().collect())
    }

    fn collect_descendants(&self, id: NodeId, out: &mut BTreeSet<NodeId>) {
        if !out.insert(id) {
            return;
        }
        for child in &self.nodes[id.as_raw() as usize].children {
            self.collect_descendants(*child, out);
        }
    }

    /// Returns the union of the roots and their descendants in topological
    /// order (every node after all of its in-closure parents).
    pub fn affected_closure(&self, roots: &[NodeId]) -> Result<Vec<NodeId>, BgmError> {
        let mut members = BTreeSet::new();
        for root in roots {
            self.index(*root)?;
            self.collect_descendants(*root, &mut members);
        }
        self.topological(&members)
    }

    fn topological(&self, members: &BTreeSet<NodeId>) -> Result<Vec<NodeId>, BgmError> {
        let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for id in members {
            let record = &self.nodes[id.as_raw() as usize];
            let degree = record
                .parents
                .iter()
                .filter(|parent| members.contains(parent))
                .count();
            in_degree.insert(*id, degree);
        }
        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(members.len());
        while let Some(next) = ready.iter().next().copied() {
            ready.remove(&next);
            order.push(next);
            for child in &self.nodes[next.as_raw() as usize].children {
                if !members.contains(child) {
                    continue;
                }
                let occurrences = self.nodes[child.as_raw() as usize]
                    .parents
                    .iter()
                    .filter(|parent| **parent == next)
                    .count();
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree = degree.saturating_sub(occurrences);
                    if *degree == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }
        if order.len() != members.len() {
            return Err(BgmError::Construction(ErrorInfo::new(
                "cycle-detected",
                "model graph contains a dependency cycle",
            )));
        }
        Ok(order)
    }

    /// Recomputes the cached values and log probabilities of dirty nodes in
    /// the given topological order.
    fn refresh_nodes(&mut self, order: &[NodeId]) -> Result<(), BgmError> {
        for id in order {
            let idx = id.as_raw() as usize;
            if !self.nodes[idx].dirty {
                continue;
            }
            let params = self.parent_values(idx);
            let record = &mut self.nodes[idx];
            match &mut record.kind {
                NodeKind::Constant { .. } => {}
                NodeKind::Deterministic { function, current, .. } => {
                    *current = function.evaluate(&params)?;
                }
                NodeKind::Stochastic {
                    distribution,
                    current,
                    ln_probability,
                    ..
                } => {
                    *ln_probability = sanitize_ln(distribution.ln_density(current, &params));
                }
            }
        }
        Ok(())
    }

    fn refresh_everything(&mut self) -> Result<(), BgmError> {
        let members: BTreeSet<NodeId> = self.node_ids().collect();
        let order = self.topological(&members)?;
        self.refresh_nodes(&order)
    }

    /// Log probability of a stochastic node, recomputing first if a
    /// transaction left it dirty. Constant and deterministic nodes report 0.
    pub fn ln_probability(&mut self, id: NodeId) -> Result<f64, BgmError> {
        let idx = self.index(id)?;
        if self.nodes[idx].dirty {
            self.refresh_everything()?;
        }
        Ok(match &self.nodes[idx].kind {
            NodeKind::Stochastic { ln_probability, .. } => *ln_probability,
            _ => 0.0,
        })
    }

    /// Per-node log-probability ratio against the stored baseline: zero for a
    /// clean node, `current - stored` otherwise.
    pub fn ln_probability_ratio_node(&mut self, id: NodeId) -> Result<f64, BgmError> {
        let idx = self.index(id)?;
        if !self.nodes[idx].dirty {
            return Ok(0.0);
        }
        self.refresh_everything()?;
        Ok(match &self.nodes[idx].kind {
            NodeKind::Stochastic {
                ln_probability,
                stored_ln_probability,
                ..
            } => {
                if *ln_probability == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    ln_probability - stored_ln_probability
                }
            }
            _ => 0.0,
        })
    }

    /// Log-probability ratio of the pending transaction over the affected
    /// closure of the touched roots.
    ///
    /// Any touched node whose density evaluates to `-inf` short-circuits the
    /// whole ratio to `-inf`; the caller rejects without further computation.
    /// With `under_prior` set, clamped nodes are excluded from the sum so the
    /// chain samples from the prior.
    pub fn ln_probability_ratio(
        &mut self,
        roots: &[NodeId],
        under_prior: bool,
    ) -> Result<f64, BgmError> {
        let closure = self.affected_closure(roots)?;
        self.refresh_nodes(&closure)?;
        let mut total = 0.0;
        for id in &closure {
            let idx = id.as_raw() as usize;
            if let NodeKind::Stochastic {
                ln_probability,
                stored_ln_probability,
                clamped,
                ..
            } = &self.nodes[idx].kind
            {
                if under_prior && *clamped {
                    continue;
                }
                if *ln_probability == f64::NEG_INFINITY {
                    return Ok(f64::NEG_INFINITY);
                }
                total += ln_probability - stored_ln_probability;
            }
        }
        Ok(total)
    }

    /// Commits the pending transaction rooted at the given nodes: stored
    /// baselines take the current values and all flags clear.
    pub fn keep_all(&mut self, roots: &[NodeId]) -> Result<(), BgmError> {
        let closure = self.affected_closure(roots)?;
        // values must be fresh before they become the new baseline
        self.refresh_nodes(&closure)?;
        for id in &closure {
            let record = &mut self.nodes[id.as_raw() as usize];
            match &mut record.kind {
                NodeKind::Constant { .. } => {}
                NodeKind::Deterministic { current, stored, .. } => {
                    *stored = current.clone();
                }
                NodeKind::Stochastic {
                    current,
                    stored,
                    ln_probability,
                    stored_ln_probability,
                    ..
                } => {
                    *stored = current.clone();
                    *stored_ln_probability = *ln_probability;
                }
            }
            record.dirty = false;
            record.touched = false;
        }
        Ok(())
    }

    /// Rolls back the pending transaction rooted at the given nodes: current
    /// values return to the stored baselines and all flags clear.
    pub fn restore_all(&mut self, roots: &[NodeId]) -> Result<(), BgmError> {
        let closure = self.affected_closure(roots)?;
        for id in &closure {
            let record = &mut self.nodes[id.as_raw() as usize];
            match &mut record.kind {
                NodeKind::Constant { .. } => {}
                NodeKind::Deterministic { current, stored, .. } => {
                    *current = stored.clone();
                }
                NodeKind::Stochastic {
                    current,
                    stored,
                    ln_probability,
                    stored_ln_probability,
                    ..
                } => {
                    *current = stored.clone();
                    *ln_probability = *stored_ln_probability;
                }
            }
            record.dirty = false;
            record.touched = false;
        }
        Ok(())
    }

    /// Commits a single node and its affected descendants.
    pub fn keep(&mut self, id: NodeId) -> Result<(), BgmError> {
        self.keep_all(&[id])
    }

    /// Rolls back a single node and its affected descendants.
    pub fn restore(&mut self, id: NodeId) -> Result<(), BgmError> {
        self.restore_all(&[id])
    }

    /// Writes a candidate value into a stochastic node without touching it;
    /// the proposal triggers propagation itself once all mutations are done.
    pub fn set_stochastic_value(&mut self, id: NodeId, value: Value) -> Result<(), BgmError> {
        let idx = self.index(id)?;
        let name = self.nodes[idx].name.clone();
        match &mut self.nodes[idx].kind {
            NodeKind::Stochastic { clamped: true, .. } => Err(BgmError::Construction(
                ErrorInfo::new("clamped-node", "cannot propose a value for observed data")
                    .with_context("node", name),
            )),
            NodeKind::Stochastic { current, .. } => {
                if current.kind() != value.kind() {
                    return Err(BgmError::Construction(
                        ErrorInfo::new("value-kind", "candidate value kind does not match node")
                            .with_context("node", name),
                    ));
                }
                *current = value;
                Ok(())
            }
            _ => Err(BgmError::Construction(
                ErrorInfo::new("not-stochastic", "only stochastic nodes take proposed values")
                    .with_context("node", name),
            )),
        }
    }

    /// Clamps a stochastic node to an observed value. The node contributes to
    /// the likelihood rather than the prior from here on.
    pub fn clamp(&mut self, id: NodeId, value: Value) -> Result<(), BgmError> {
        let idx = self.index(id)?;
        let name = self.nodes[idx].name.clone();
        match &mut self.nodes[idx].kind {
            NodeKind::Stochastic {
                current,
                stored,
                clamped,
                ..
            } => {
                if current.kind() != value.kind() {
                    return Err(BgmError::Construction(
                        ErrorInfo::new("value-kind", "observed value kind does not match node")
                            .with_context("node", name),
                    ));
                }
                *current = value.clone();
                *stored = value;
                *clamped = true;
            }
            _ => {
                return Err(BgmError::Construction(
                    ErrorInfo::new("not-stochastic", "only stochastic nodes can be clamped")
                        .with_context("node", name),
                ))
            }
        }
        self.rebase(id)
    }

    /// Releases a clamped node back into the sampled parameter set.
    pub fn unclamp(&mut self, id: NodeId) -> Result<(), BgmError> {
        let idx = self.index(id)?;
        match &mut self.nodes[idx].kind {
            NodeKind::Stochastic { clamped, .. } => {
                *clamped = false;
                Ok(())
            }
            _ => Err(BgmError::Construction(
                ErrorInfo::new("not-stochastic", "only stochastic nodes can be unclamped")
                    .with_context("node", self.nodes[idx].name.clone()),
            )),
        }
    }

    /// Redraws an unclamped stochastic node from its distribution and touches
    /// it, leaving an open transaction for the caller to keep.
    pub fn redraw(&mut self, id: NodeId, rng: &mut dyn RngCore) -> Result<(), BgmError> {
        let idx = self.index(id)?;
        let params = self.parent_values(idx);
        let name = self.nodes[idx].name.clone();
        let drawn = match &self.nodes[idx].kind {
            NodeKind::Stochastic { clamped: true, .. } => {
                return Err(BgmError::Construction(
                    ErrorInfo::new("clamped-node", "cannot redraw observed data")
                        .with_context("node", name),
                ))
            }
            NodeKind::Stochastic { distribution, .. } => distribution.sample(&params, rng)?,
            _ => {
                return Err(BgmError::Construction(
                    ErrorInfo::new("not-stochastic", "only stochastic nodes can be redrawn")
                        .with_context("node", name),
                ))
            }
        };
        if let NodeKind::Stochastic { current, .. } = &mut self.nodes[idx].kind {
            *current = drawn;
        }
        self.touch(id)
    }

    /// Exchanges one parent for another, updating both edge sets, and touches
    /// the node. The replacement must hold a value of the same kind and must
    /// not be a descendant of the node (that would close a cycle).
    pub fn swap_parent(
        &mut self,
        node: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
    ) -> Result<(), BgmError> {
        let idx = self.index(node)?;
        self.index(old_parent)?;
        self.index(new_parent)?;
        if !self.nodes[idx].parents.contains(&old_parent) {
            return Err(BgmError::Construction(
                ErrorInfo::new("not-a-parent", "node does not depend on the old parent")
                    .with_context("node", self.nodes[idx].name.clone())
                    .with_context("parent", old_parent.to_string()),
            ));
        }
        let old_kind = self.nodes[old_parent.as_raw() as usize].value().kind();
        let new_kind = self.nodes[new_parent.as_raw() as usize].value().kind();
        if old_kind != new_kind {
            return Err(BgmError::Construction(
                ErrorInfo::new("parent-kind", "replacement parent holds a different value kind")
                    .with_context("node", self.nodes[idx].name.clone()),
            ));
        }
        let mut descendants = BTreeSet::new();
        self.collect_descendants(node, &mut descendants);
        if descendants.contains(&new_parent) {
            return Err(BgmError::Construction(
                ErrorInfo::new("would-create-cycle", "replacement parent depends on the node")
                    .with_context("node", self.nodes[idx].name.clone())
                    .with_context("parent", new_parent.to_string()),
            ));
        }
        for slot in self.nodes[idx].parents.iter_mut() {
            if *slot == old_parent {
                *slot = new_parent;
            }
        }
        self.nodes[old_parent.as_raw() as usize].children.remove(&node);
        self.nodes[new_parent.as_raw() as usize].children.insert(node);
        self.touch(node)?;
        self.rebase(node)
    }

    /// Re-evaluates and commits the closure of a node after a model edit so
    /// the graph returns to a quiescent baseline.
    fn rebase(&mut self, id: NodeId) -> Result<(), BgmError> {
        self.touch(id)?;
        self.keep_all(&[id])
    }

    /// Aggregate log-probability breakdown over all stochastic nodes,
    /// recomputing any dirty node first.
    pub fn ln_probability_summary(
        &mut self,
        under_prior: bool,
    ) -> Result<ProbabilitySummary, BgmError> {
        self.refresh_everything()?;
        let mut likelihood = 0.0;
        let mut prior = 0.0;
        for record in &self.nodes {
            if let NodeKind::Stochastic {
                ln_probability,
                clamped,
                ..
            } = &record.kind
            {
                if *clamped {
                    likelihood += ln_probability;
                } else {
                    prior += ln_probability;
                }
            }
        }
        let posterior = if under_prior { prior } else { prior + likelihood };
        Ok(ProbabilitySummary {
            posterior,
            likelihood,
            prior,
        })
    }

    /// Snapshot of every node's current value, keyed by raw identifier.
    /// Meaningful only at a quiescent point (no pending transaction).
    pub fn snapshot(&self) -> BTreeMap<u64, Value> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx as u64, record.value().clone()))
            .collect()
    }

    /// Restores node values from a snapshot, then re-evaluates and commits
    /// the whole graph so derived values and probabilities are consistent.
    pub fn restore_snapshot(&mut self, snapshot: &BTreeMap<u64, Value>) -> Result<(), BgmError> {
        for (raw, value) in snapshot {
            let id = NodeId::from_raw(*raw);
            let idx = self.index(id)?;
            let record = &mut self.nodes[idx];
            match &mut record.kind {
                NodeKind::Constant { value: stored } => {
                    *stored = value.clone();
                }
                NodeKind::Stochastic { current, stored, .. } => {
                    *current = value.clone();
                    *stored = value.clone();
                }
                NodeKind::Deterministic { current, stored, .. } => {
                    *current = value.clone();
                    *stored = value.clone();
                }
            }
        }
        let roots: Vec<NodeId> = self.node_ids().collect();
        for root in &roots {
            self.touch(*root)?;
        }
        self.keep_all(&roots)
    }
}
