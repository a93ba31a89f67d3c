use super::graph::ReductionGraph;
use super::{ReductionError, ReductionStep};
use crate::net::structure::Node;

impl ReductionGraph<'_> {
    /// # 约简规则: 不可行变迁删除(Infeasible Transition Removal)
    ///
    /// - 若变迁 `t` 的守卫不可满足, 或其动作的每个选择项都自相矛盾
    ///   (同一网络变量被赋予两个不同常量), 则 `t` 永远不会发生.
    /// - 删除 `t` 及其所有弧; 其前后库所保留, 由死节点剪枝处理.
    pub(crate) fn remove_infeasible_transitions(
        &mut self,
    ) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        for transition in self.net.transition_ids() {
            if !self.net.transitions[transition].is_infeasible() {
                continue;
            }
            self.net.erase(Node::Transition(transition))?;
            log::debug!("removed infeasible transition {}", transition);
            steps.push(ReductionStep::InfeasibleRemoved { transition });
        }
        Ok(steps)
    }
}
