//! Model lineage lookups
//!
//! Nothing is indexed: every query walks the manifest's `depends_on` lists,
//! so results always reflect the snapshot they were computed from.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::manifest::Manifest;

/// Direct neighbours of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub model: String,

    /// Models this one selects from
    pub upstream: Vec<String>,

    /// Models that select from this one
    pub downstream: Vec<String>,
}

impl Lineage {
    /// Direct lineage; empty lists when the model is unknown
    pub fn of(manifest: &Manifest, model: &str) -> Self {
        match manifest.model_by_name(model) {
            Some(node) => Self {
                model: model.to_string(),
                upstream: manifest.upstream_models(node),
                downstream: manifest.downstream_models(node),
            },
            None => Self {
                model: model.to_string(),
                ..Self::default()
            },
        }
    }

    /// All models reachable by following `depends_on` upwards (BFS order)
    pub fn all_upstream(manifest: &Manifest, model: &str) -> Vec<String> {
        walk(model, |name| Self::of(manifest, name).upstream)
    }

    /// All models that transitively select from `model` (BFS order)
    pub fn all_downstream(manifest: &Manifest, model: &str) -> Vec<String> {
        walk(model, |name| Self::of(manifest, name).downstream)
    }
}

fn walk<F>(start: &str, next: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut visited = HashSet::new();
    let mut queue: VecDeque<String> = next(start).into();
    let mut result = Vec::new();

    visited.insert(start.to_string());

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for neighbour in next(&current) {
            if !visited.contains(&neighbour) {
                queue.push_back(neighbour);
            }
        }
        result.push(current);
    }

    result
}
