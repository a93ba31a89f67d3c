use super::graph::ReductionGraph;
use super::{ReductionError, ReductionStep};
use crate::net::structure::{Composition, Node, Place, Transition};

impl ReductionGraph<'_> {
    /// # 约简规则: 孪生变迁合并(Twin Transitions)
    ///
    /// - 变迁 `t_1 ≠ t_2` 满足 `•t_1 = •t_2`, `t_1• = t_2•` 且守卫相同.
    /// - 以选择组合合并: `t_1 := merge(Choice, t_1, t_2)`, 动作取两者选择项的并集;
    ///   删除 `t_2`.
    pub(crate) fn merge_twin_transitions(&mut self) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        let ids = self.net.transition_ids();
        for (i, &kept) in ids.iter().enumerate() {
            if !self.net.transitions.contains(kept) {
                continue;
            }
            for &removed in &ids[i + 1..] {
                if !self.net.transitions.contains(removed) {
                    continue;
                }
                let (a, b) = (&self.net.transitions[kept], &self.net.transitions[removed]);
                if a.guard != b.guard || !Transition::mergeable(Composition::Choice, a, b) {
                    continue;
                }
                if self.net.prev(kept.into()) != self.net.prev(removed.into())
                    || self.net.next(kept.into()) != self.net.next(removed.into())
                {
                    continue;
                }
                let merged = Transition::merge(Composition::Choice, a, b);
                self.net.transitions[kept] = merged;
                self.net.erase(Node::Transition(removed))?;
                log::debug!("merged twin transition {} into {}", removed, kept);
                steps.push(ReductionStep::TransitionsMerged { kept, removed });
            }
        }
        Ok(steps)
    }

    /// # 约简规则: 孪生库所合并(Twin Places)
    ///
    /// - 库所 `p_1 ≠ p_2` 满足 `•p_1 = •p_2`, `p_1• = p_2•`, 且都不在任何初始标识中.
    /// - 两者总是同时被标记, 以并行组合合并为 `p_1`, 删除 `p_2`.
    pub(crate) fn merge_twin_places(&mut self) -> Result<Vec<ReductionStep>, ReductionError> {
        let mut steps = Vec::new();
        let ids = self.net.place_ids();
        for (i, &kept) in ids.iter().enumerate() {
            if !self.net.places.contains(kept) || self.is_marked(kept) {
                continue;
            }
            for &removed in &ids[i + 1..] {
                if !self.net.places.contains(removed) || self.is_marked(removed) {
                    continue;
                }
                let producers = self.net.prev(kept.into());
                let consumers = self.net.next(kept.into());
                if producers.is_empty() && consumers.is_empty() {
                    continue;
                }
                if producers != self.net.prev(removed.into())
                    || consumers != self.net.next(removed.into())
                {
                    continue;
                }
                let merged = Place::merge(
                    Composition::Parallel,
                    &self.net.places[kept],
                    &self.net.places[removed],
                );
                self.net.places[kept] = merged;
                self.net.erase(Node::Place(removed))?;
                log::debug!("merged twin place {} into {}", removed, kept);
                steps.push(ReductionStep::PlacesMerged { kept, removed });
            }
        }
        Ok(steps)
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

    #[test]
    fn twin_transitions_become_one_choice() {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new());
        let p1 = net.add_place(Place::new());
        let guard = Expression::net(NetId::new(9));
        let mut ts = Vec::new();
        for value in [true, false] {
            let action = Choice::single(vec![Assignment::new(NetId::new(0), value)]);
            let t = net.add_transition(Transition::new(guard.clone(), action));
            net.connect_sequence(&[p0.into(), t.into(), p1.into()]).unwrap();
            ts.push(t);
        }

        let mut markings = [vec![p0]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        assert_eq!(graph.merge_twin_transitions().unwrap().len(), 1);
        assert_eq!(net.transition_ids(), vec![ts[0]]);
        assert_eq!(net.transitions[ts[0]].action.terms.len(), 2);
        assert_eq!(net.transitions[ts[0]].guard, guard);
    }

    #[test]
    fn marked_twin_places_are_kept() {
        let mut net = Net::empty();
        let t0 = net.add_transition(Transition::default());
        let t1 = net.add_transition(Transition::default());
        let a = net.add_place(Place::arbiter());
        let b = net.add_place(Place::new());
        let c = net.add_place(Place::new());
        for p in [a, b, c] {
            net.connect_sequence(&[t0.into(), p.into(), t1.into()]).unwrap();
        }

        let mut markings = [vec![c]];
        let mut graph = ReductionGraph { net: &mut net, markings: &mut markings };
        assert_eq!(graph.merge_twin_places().unwrap().len(), 1);
        assert_eq!(net.place_ids(), vec![a, c]);
        assert!(net.places[a].arbiter);
    }
}
