// Copyright 2025 Cowboy AI, LLC.

//! Per-method ordering of competing behaviours

use tracing::debug;

use super::linear_extension::linear_extension;
use crate::config::ComposerConfig;
use crate::descriptor::Precedence;
use crate::errors::{CompositionError, CompositionResult};

/// One behaviour competing for a method, with its ordering facts
#[derive(Debug, Clone)]
pub struct PrecedenceNode<T> {
    /// Behaviour name, the identity edges refer to
    pub name: String,
    /// Effective edges for this method
    pub precedence: Precedence,
    /// Whether the behaviour uses the message convention
    pub message_style: bool,
    /// Caller data carried through the sort
    pub payload: T,
}

/// Orders candidate behaviours for one method
///
/// Two bias groupings decide the starting order: behaviours that declare no
/// precedence come before those that do, and message-style behaviours come
/// after plain ones. Explicit edges are then applied by a pass-based linear
/// extension: each pass emits, in biased order, every node that no remaining
/// node must precede. The bias therefore holds only among nodes released in
/// the same pass, and an unrelated node can move ahead of an edge's target.
#[derive(Debug, Clone, Copy)]
pub struct Linearizer {
    unordered_first: bool,
    message_last: bool,
}

impl Default for Linearizer {
    fn default() -> Self {
        Self {
            unordered_first: true,
            message_last: true,
        }
    }
}

impl Linearizer {
    /// Linearizer using the configured bias rules
    pub fn from_config(config: &ComposerConfig) -> Self {
        Self {
            unordered_first: config.bias_unordered_first,
            message_last: config.bias_message_last,
        }
    }

    fn bias_key<T>(&self, node: &PrecedenceNode<T>) -> (bool, bool) {
        (
            self.message_last && node.message_style,
            self.unordered_first && node.precedence.is_declared(),
        )
    }

    /// Produce a total order honouring every edge among `nodes`
    pub fn linearize<T>(
        &self,
        method: &str,
        mut nodes: Vec<PrecedenceNode<T>>,
    ) -> CompositionResult<Vec<PrecedenceNode<T>>> {
        if nodes.len() < 2 {
            return Ok(nodes);
        }

        nodes.sort_by_key(|node| self.bias_key(node));

        let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
        let order = linear_extension(&names, |name| {
            let mut successors = Vec::new();
            for node in &nodes {
                if &node.name == name {
                    successors.extend(node.precedence.before.iter().cloned());
                } else if node.precedence.after.contains(name) {
                    successors.push(node.name.clone());
                }
            }
            successors
        })
        .map_err(|cycle| CompositionError::CyclicPrecedence {
            method: method.to_string(),
            unresolved: cycle.unresolved,
        })?;

        debug!(method, order = ?order, "Linearized candidate behaviours");

        let mut slots: Vec<Option<PrecedenceNode<T>>> = nodes.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for name in &order {
            if let Some(node) = slots
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|n| &n.name == name))
                .and_then(Option::take)
            {
                ordered.push(node);
            }
        }
        Ok(ordered)
    }
}
