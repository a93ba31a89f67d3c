use super::graph::ReductionGraph;
use super::{ReductionError, ReductionStep};
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::{Composition, Node, Transition};

impl ReductionGraph<'_> {
    /// # 约简规则: 私有库所序列合并(Private Sequence Merge)
    ///
    /// - 给定序列 `t_1 → p → t_2`, 满足:
    ///   - `p` 不在任何初始标识中, 不是仲裁库所, 且 `•p = {t_1}`, `p• = {t_2}`;
    ///   - `t_1• = {p}`, `•t_2 = {p}`, `t_1 ≠ t_2`;
    ///   - `t_1` 的动作为空操作; 或 `t_2` 的守卫恒真, 且 `t_2` 的守卫与动作都不读取
    ///     `t_1` 写入的网络变量, 两者不写同一变量, 也不同时带有外部副作用.
    /// - 构造 `t_1 := merge(Sequence, t_1, t_2)`, 令 `t_1• := t_2•`, 删除 `p` 与 `t_2`.
    pub(crate) fn merge_private_sequences(&mut self) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        for place in self.net.place_ids() {
            if !self.net.places.contains(place) {
                continue;
            }
            let Some((first, second)) = self.private_sequence(place) else {
                continue;
            };
            if !self.sequence_is_mergeable(first, second) {
                continue;
            }

            let outputs = self.net.next(second.into());
            let merged = Transition::merge(
                Composition::Sequence,
                &self.net.transitions[first],
                &self.net.transitions[second],
            );
            self.net.transitions[first] = merged;
            self.net.erase(Node::Place(place))?;
            self.net.erase(Node::Transition(second))?;
            for output in outputs {
                self.net.connect(first, output)?;
            }
            log::debug!("merged {} into {} through {}", second, first, place);
            steps.push(ReductionStep::SequenceMerged {
                place,
                merged: first,
                removed: second,
            });
        }
        Ok(steps)
    }

    fn private_sequence(&self, place: PlaceId) -> Option<(TransitionId, TransitionId)> {
        if self.net.places[place].arbiter || self.is_marked(place) {
            return None;
        }
        let (producers, consumers) = (self.net.producers(place), self.net.consumers(place));
        let (&[first], &[second]) = (producers.as_slice(), consumers.as_slice()) else {
            return None;
        };
        if first == second
            || self.net.output_places(first) != [place]
            || self.net.input_places(second) != [place]
        {
            return None;
        }
        Some((first, second))
    }

    fn sequence_is_mergeable(&self, first: TransitionId, second: TransitionId) -> bool {
        let (a, b) = (&self.net.transitions[first], &self.net.transitions[second]);
        if !Transition::mergeable(Composition::Sequence, a, b) {
            return false;
        }
        if a.action.is_noop() {
            return true;
        }
        if !b.guard.is_tautology() {
            return false;
        }
        let written = a.action.written_nets();
        let reads_written = b
            .guard
            .nets()
            .iter()
            .chain(b.action.read_nets().iter())
            .any(|net| written.contains(net));
        let writes_written = b.action.written_nets().iter().any(|net| written.contains(net));
        let both_external = a.action.has_side_effect() && b.action.has_side_effect();
        !reads_written && !writes_written && !both_external
    }
}

#[cfg(test)]
mod tests {
    use crate::logic::action::{Assignment, Choice};
    use crate::logic::expression::Expression;
    use crate::net::Net;
    use crate::net::ids::NetId;
    use crate::net::reduce::graph::ReductionGraph;
    use crate::net::structure::{Place, Transition};

    fn v(raw: u32) -> NetId {
        NetId::new(raw)
    }

    #[test]
    fn guard_then_action_collapses() {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new());
        let p1 = net.add_place(Place::new());
        let p2 = net.add_place(Place::new());
        let wait = net.add_transition(Transition::guarded(Expression::net(v(0))));
        let act = net.add_transition(Transition::acting(Choice::single(vec![Assignment::new(
            v(1),
            true,
        )])));
        net.connect_sequence(&[p0.into(), wait.into(), p1.into(), act.into(), p2.into()])
            .unwrap();

        let mut markings = [vec![p0]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        assert_eq!(graph.merge_private_sequences().unwrap().len(), 1);
        assert_eq!(net.transition_ids(), vec![wait]);
        assert_eq!(net.output_places(wait), vec![p2]);
        assert_eq!(net.transitions[wait].guard, Expression::net(v(0)));
        assert_eq!(net.transitions[wait].action.terms[0].actions.len(), 1);
    }

    #[test]
    fn dependent_assignments_stay_ordered() {
        // x := recv(L); send(R, x)
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new());
        let p1 = net.add_place(Place::new());
        let recv = Assignment::new(v(0), Expression::call("recv", vec![Expression::net(v(1))]));
        let send = Assignment::effect(Expression::call(
            "send",
            vec![Expression::net(v(2)), Expression::net(v(0))],
        ));
        let t1 = net.add_transition(Transition::acting(Choice::single(vec![recv])));
        let t2 = net.add_transition(Transition::acting(Choice::single(vec![send])));
        net.connect_sequence(&[p0.into(), t1.into(), p1.into(), t2.into(), p0.into()])
            .unwrap();

        let mut markings = [vec![p0]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        assert!(graph.merge_private_sequences().unwrap().is_empty());
        assert_eq!(net.transitions.len(), 2);
    }
}
