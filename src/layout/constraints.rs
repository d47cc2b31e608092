use std::collections::VecDeque;

use serde::Serialize;
use thiserror::Error;

use super::junction::BundleRule;
use super::network::BundleId;

/// Lateral lane offset of every bundle, indexed by `BundleId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Offsets(Vec<i32>);

impl Offsets {
    pub fn zeroed(bundles: usize) -> Self {
        Self(vec![0; bundles])
    }

    pub fn get(&self, bundle: BundleId) -> i32 {
        self.0.get(bundle.0).copied().unwrap_or(0)
    }

    pub(crate) fn set(&mut self, bundle: BundleId, offset: i32) {
        self.0[bundle.0] = offset;
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BundleId, i32)> + '_ {
        self.0.iter().enumerate().map(|(idx, &o)| (BundleId(idx), o))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("bundle {0:?} cannot sit above itself")]
    SelfLoop(BundleId),
    #[error("{second:?} already precedes {first:?}")]
    Cycle { first: BundleId, second: BundleId },
}

/// Incremental system of `second >= first + 1` constraints that stays acyclic.
#[derive(Debug, Clone)]
pub struct ConstraintSystem {
    successors: Vec<Vec<usize>>,
    edges: usize,
}

impl ConstraintSystem {
    pub fn new(bundles: usize) -> Self {
        Self {
            successors: vec![Vec::new(); bundles],
            edges: 0,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Admits one rule unless it would make the system infeasible.
    pub fn add(&mut self, rule: &BundleRule) -> Result<(), ConstraintError> {
        let (first, second) = (rule.first.0, rule.second.0);
        if first == second {
            return Err(ConstraintError::SelfLoop(rule.first));
        }
        if self.reaches(second, first) {
            return Err(ConstraintError::Cycle {
                first: rule.first,
                second: rule.second,
            });
        }
        self.successors[first].push(second);
        self.edges += 1;
        Ok(())
    }

    /// Admits every rule or none of them.
    pub fn add_all(&mut self, rules: &[BundleRule]) -> Result<(), ConstraintError> {
        let mut added: Vec<usize> = Vec::with_capacity(rules.len());
        for rule in rules {
            if let Err(err) = self.add(rule) {
                for &first in added.iter().rev() {
                    self.successors[first].pop();
                    self.edges -= 1;
                }
                return Err(err);
            }
            added.push(rule.first.0);
        }
        Ok(())
    }

    /// Smallest non-negative offsets satisfying every admitted rule: the longest
    /// chain of predecessors of each bundle.
    pub fn solve(&self) -> Offsets {
        let n = self.successors.len();
        let mut indegree = vec![0usize; n];
        for succ in &self.successors {
            for &s in succ {
                indegree[s] += 1;
            }
        }
        let mut offsets = vec![0i32; n];
        let mut queue: VecDeque<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
        while let Some(v) = queue.pop_front() {
            for &s in &self.successors[v] {
                offsets[s] = offsets[s].max(offsets[v] + 1);
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    queue.push_back(s);
                }
            }
        }
        Offsets(offsets)
    }

    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut seen = vec![false; self.successors.len()];
        let mut stack = vec![from];
        seen[from] = true;
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            for &s in &self.successors[v] {
                if !seen[s] {
                    seen[s] = true;
                    stack.push(s);
                }
            }
        }
        false
    }
}
