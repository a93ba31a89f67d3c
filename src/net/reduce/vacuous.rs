use super::graph::ReductionGraph;
use super::{ReductionError, ReductionStep};
use crate::net::ids::PlaceId;
use crate::net::structure::{Composition, Node, Place};

impl ReductionGraph<'_> {
    /// # 约简规则: 多输出空变迁拆分(Vacuous Fork Split)
    ///
    /// - 变迁 `t` 为空变迁(守卫恒真且动作为空操作), 且 `t• = {q_0, …, q_{n-1}}`, `n > 1`.
    /// - 断开 `t` 的全部输出弧, 令 `t` 只连接 `q_0`.
    /// - 对每个 `k ≥ 1` 创建 `t` 的拷贝 `t_k`; 对每个输入库所 `p_l ∈ •t` 创建拷贝 `x_l`,
    ///   连接 `•p_l → x_l → t_k → q_k`. 被标记库所的拷贝同样被标记.
    /// - 每个分支因此得到私有的 skip, 不会把相互独立的分支悄悄合并.
    pub(crate) fn split_vacuous_transitions(
        &mut self,
    ) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        for transition in self.net.transition_ids() {
            if !self.net.transitions.contains(transition)
                || !self.net.transitions[transition].is_vacuous()
            {
                continue;
            }
            let outputs = self.net.output_places(transition);
            if outputs.len() < 2 {
                continue;
            }
            let inputs = self.net.input_places(transition);
            let producers: Vec<Vec<Node>> = inputs
                .iter()
                .map(|place| self.net.prev(Node::Place(*place)))
                .collect();

            for arc in self.net.out_arcs(transition.into()) {
                self.net.disconnect(arc)?;
            }
            self.net.connect(transition, outputs[0])?;

            let mut copies = Vec::with_capacity(outputs.len() - 1);
            for output in &outputs[1..] {
                let copy = self.net.copy(transition.into())?;
                for (place, sources) in inputs.iter().zip(&producers) {
                    let place_copy = self.net.copy(Node::Place(*place))?;
                    self.net.connect_all(sources, &[place_copy])?;
                    self.net.connect(place_copy, copy)?;
                    if let Some(place_copy) = place_copy.as_place() {
                        self.mark_copy(*place, place_copy);
                    }
                }
                self.net.connect(copy, *output)?;
                copies.extend(copy.as_transition());
            }
            log::debug!("split vacuous transition {} into {} copies", transition, copies.len() + 1);
            steps.push(ReductionStep::VacuousSplit { transition, copies });
        }
        Ok(steps)
    }

    /// # 约简规则: 单输入单输出空变迁收缩(Vacuous Pinch)
    ///
    /// - 空变迁 `t` 满足 `•t = {p}`, `t• = {q}`, `p ≠ q`, `p• = {t}`,
    ///   且 `p` 与 `q` 不在同一初始标识中同时被标记.
    /// - 令 `•p` 中每个变迁直接连接 `q`, `q` 继承 `p` 的仲裁标志,
    ///   `p` 上的初始 token 移至 `q`; 删除 `t` 与 `p`.
    pub(crate) fn pinch_vacuous_transitions(
        &mut self,
    ) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        for transition in self.net.transition_ids() {
            if !self.net.transitions.contains(transition)
                || !self.net.transitions[transition].is_vacuous()
            {
                continue;
            }
            let (inputs, outputs) = (
                self.net.input_places(transition),
                self.net.output_places(transition),
            );
            let (&[from], &[into]) = (inputs.as_slice(), outputs.as_slice()) else {
                continue;
            };
            if from == into
                || self.net.consumers(from) != [transition]
                || self.marked_together(from, into)
            {
                continue;
            }
            self.pinch(from, into)?;
            self.net.erase(Node::Transition(transition))?;
            log::debug!("pinched vacuous transition {} ({} -> {})", transition, from, into);
            steps.push(ReductionStep::VacuousPinched {
                transition,
                from,
                into,
            });
        }
        Ok(steps)
    }

    fn pinch(&mut self, from: PlaceId, into: PlaceId) -> Result<(), ReductionError> {
        let sources = self.net.prev(Node::Place(from));
        self.net.connect_all(&sources, &[Node::Place(into)])?;
        let merged = Place::merge(
            Composition::Sequence,
            &self.net.places[from],
            &self.net.places[into],
        );
        self.net.places[into] = merged;
        self.relocate(from, into);
        self.net.erase(Node::Place(from))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::net::Net;
    use crate::net::reduce::graph::ReductionGraph;
    use crate::net::structure::{Node, Place, Transition};

    #[test]
    fn vacuous_fork_gets_private_copies() {
        // a -> p -> skip -> {q0, q1, q2}
        let mut net = Net::empty();
        let a = net.add_transition(Transition::default());
        let p = net.add_place(Place::new());
        let skip = net.add_transition(Transition::default());
        let outputs: Vec<_> = (0..3).map(|_| net.add_place(Place::new())).collect();
        net.connect_sequence(&[a.into(), p.into(), skip.into()]).unwrap();
        for q in &outputs {
            net.connect(skip, *q).unwrap();
        }

        let mut markings = [vec![p]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        let steps = graph.split_vacuous_transitions().unwrap();
        assert_eq!(steps.len(), 1);

        // every successor is fed by exactly one private skip whose input place
        // is produced by `a`
        for q in &outputs {
            let feeders = net.producers(*q);
            assert_eq!(feeders.len(), 1);
            assert!(net.transitions[feeders[0]].is_vacuous());
            let inputs = net.input_places(feeders[0]);
            assert_eq!(inputs.len(), 1);
            assert_eq!(net.producers(inputs[0]), vec![a]);
        }
        assert_eq!(net.output_places(a).len(), 3);
        assert_eq!(markings[0].len(), 3);
    }

    #[test]
    fn single_skip_is_pinched() {
        let mut net = Net::empty();
        let p = net.add_place(Place::arbiter());
        let skip = net.add_transition(Transition::default());
        let q = net.add_place(Place::new());
        let b = net.add_transition(Transition::default());
        net.connect_sequence(&[p.into(), skip.into(), q.into(), b.into(), p.into()]).unwrap();

        let mut markings = [vec![p]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        assert_eq!(graph.pinch_vacuous_transitions().unwrap().len(), 1);
        assert!(!net.is_valid(Node::Place(p)));
        assert!(net.places[q].arbiter);
        assert_eq!(net.output_places(b), vec![q]);
        assert_eq!(markings, [vec![q]]);
    }
}
