//! 受控 Petri 网缩减算法: 不可行变迁删除、孪生节点合并、私有库所序列合并、
//! 死节点剪枝以及空变迁(skip)消除. 各规则交替执行直到不动点.
use thiserror::Error;

use crate::net::Net;
use crate::net::core::NetError;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::Node;

mod dead_nodes;
mod graph;
mod infeasible;
mod sequence_merge;
mod twins;
mod vacuous;

use graph::ReductionGraph;

pub const DEFAULT_MAX_ITERATIONS: usize = 4096;

#[derive(Debug, Clone)]
pub struct ReductionOptions {
    /// 不动点迭代的轮数上限
    pub max_iterations: usize,
    /// 存在初始标识时剪除从任何初始 token 都不可达的节点
    pub prune_dead_nodes: bool,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            prune_dead_nodes: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReductionResult {
    pub steps: Vec<ReductionStep>,
    pub rounds: usize,
}

impl ReductionResult {
    pub fn changed(&self) -> bool {
        !self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReductionStep {
    InfeasibleRemoved {
        transition: TransitionId,
    },
    TransitionsMerged {
        kept: TransitionId,
        removed: TransitionId,
    },
    PlacesMerged {
        kept: PlaceId,
        removed: PlaceId,
    },
    SequenceMerged {
        place: PlaceId,
        merged: TransitionId,
        removed: TransitionId,
    },
    DeadNodesPruned {
        nodes: Vec<Node>,
    },
    VacuousSplit {
        transition: TransitionId,
        copies: Vec<TransitionId>,
    },
    VacuousPinched {
        transition: TransitionId,
        from: PlaceId,
        into: PlaceId,
    },
}

#[derive(Debug, Error)]
pub enum ReductionError {
    #[error("reduction did not converge within {0} rounds")]
    IterationLimit(usize),
    #[error(transparent)]
    Net(#[from] NetError),
}

pub struct Reducer {
    options: ReductionOptions,
}

impl Reducer {
    pub fn new(options: ReductionOptions) -> Self {
        Self { options }
    }

    /// Rewrites `net` until no rule applies. `markings` are the reset
    /// markings (one place list per reset state); they are updated when a
    /// rule moves or duplicates a marked place.
    pub fn reduce(
        &self,
        net: &mut Net,
        markings: &mut [Vec<PlaceId>],
    ) -> Result<ReductionResult, ReductionError> {
        let mut graph = ReductionGraph { net, markings };
        let mut result = ReductionResult::default();

        for round in 0..self.options.max_iterations {
            let before = result.steps.len();

            result.steps.extend(graph.remove_infeasible_transitions()?);
            result.steps.extend(graph.merge_twin_transitions()?);
            result.steps.extend(graph.merge_twin_places()?);
            result.steps.extend(graph.merge_private_sequences()?);
            if self.options.prune_dead_nodes {
                result.steps.extend(graph.prune_dead_nodes());
            }
            if result.steps.len() == before {
                result.steps.extend(graph.split_vacuous_transitions()?);
                result.steps.extend(graph.pinch_vacuous_transitions()?);
            }

            if result.steps.len() == before {
                result.rounds = round + 1;
                log::debug!(
                    "reduction converged after {} rounds with {} steps",
                    result.rounds,
                    result.steps.len()
                );
                return Ok(result);
            }
        }

        log::warn!(
            "reduction stopped after {} rounds without converging",
            self.options.max_iterations
        );
        Err(ReductionError::IterationLimit(self.options.max_iterations))
    }
}

pub fn reduce_in_place(
    net: &mut Net,
    markings: &mut [Vec<PlaceId>],
    options: ReductionOptions,
) -> Result<ReductionResult, ReductionError> {
    Reducer::new(options).reduce(net, markings)
}
