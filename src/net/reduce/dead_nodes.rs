use super::ReductionStep;
use super::graph::ReductionGraph;

impl ReductionGraph<'_> {
    /// # 约简规则: 死节点剪枝(Dead Node Pruning)
    ///
    /// - 仅在存在初始标识时生效.
    /// - 从所有初始 token 所在库所出发做前向可达分析, 删除不可达的库所与变迁.
    pub(crate) fn prune_dead_nodes(&mut self) -> Vec<ReductionStep> {
        let roots = self.roots();
        if roots.is_empty() {
            return Vec::new();
        }
        let nodes = self.net.prune_unreachable(&roots);
        if nodes.is_empty() {
            Vec::new()
        } else {
            vec![ReductionStep::DeadNodesPruned { nodes }]
        }
    }
}
