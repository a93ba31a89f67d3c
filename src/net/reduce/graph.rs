use crate::net::Net;
use crate::net::ids::PlaceId;

/// 缩减过程中的工作视图: 被改写的网及其初始标识.
pub(crate) struct ReductionGraph<'a> {
    pub(crate) net: &'a mut Net,
    pub(crate) markings: &'a mut [Vec<PlaceId>],
}

impl ReductionGraph<'_> {
    pub(crate) fn is_marked(&self, place: PlaceId) -> bool {
        self.markings.iter().any(|marking| marking.contains(&place))
    }

    /// Both places hold a token in one and the same reset marking.
    pub(crate) fn marked_together(&self, a: PlaceId, b: PlaceId) -> bool {
        self.markings
            .iter()
            .any(|marking| marking.contains(&a) && marking.contains(&b))
    }

    /// 将初始 token 从 `from` 移至 `into`.
    pub(crate) fn relocate(&mut self, from: PlaceId, into: PlaceId) {
        for marking in self.markings.iter_mut() {
            for place in marking.iter_mut() {
                if *place == from {
                    *place = into;
                }
            }
        }
    }

    /// A copy of a marked place is marked wherever the original is.
    pub(crate) fn mark_copy(&mut self, original: PlaceId, copy: PlaceId) {
        for marking in self.markings.iter_mut() {
            if marking.contains(&original) {
                marking.push(copy);
            }
        }
    }

    pub(crate) fn roots(&self) -> Vec<PlaceId> {
        let mut roots: Vec<PlaceId> = self.markings.iter().flatten().copied().collect();
        roots.sort();
        roots.dedup();
        roots
    }
}
