use std::collections::HashMap;

use crate::bitset::ColorSet;

// While a cell is being probed, each of its colours is tried in turn
// (one "sibling" per colour). Any colour that is absent from some other
// cell's state under every sibling cannot appear in any completion, no
// matter which colour the probed cell finally takes, so it may be
// struck permanently. The buffer tracks, per touched cell, the common
// absent set over completed siblings (`prior`), the absent set of the
// sibling in flight (`current`), and which sibling touched the cell
// last. A cell left untouched by a sibling still has a well-defined
// absent set, namely the complement of its resting state; the folds
// below account for those gaps, so skipping a cell never lets an
// unsound fact through. The scope is one probed cell's colour loop:
// only that cell's alternatives form an exhaustive case split.

#[derive(Debug, Clone, Copy)]
struct MergeEntry {
    /// Colours absent in every completed sibling before `last`.
    prior: ColorSet,
    /// Colours absent in sibling `last`, so far.
    current: ColorSet,
    last: u32,
    /// Entry as it stood before sibling `last` first touched it;
    /// `None` when that sibling created the entry.
    saved: Option<(ColorSet, ColorSet, u32)>,
}

#[derive(Debug, Default)]
pub(crate) struct MergeBuffer {
    map: HashMap<usize, MergeEntry>,
    sibling: u32,
    in_sibling: bool,
    /// Every colour of the probed cell so far got a full sibling.
    complete: bool,
    enabled: bool,
    full: ColorSet,
}

impl MergeBuffer {
    /// Start a probe sequence.
    pub(crate) fn reset(&mut self, enabled: bool, ncolor: u8) {
        self.map.clear();
        self.sibling = 0;
        self.in_sibling = false;
        self.complete = false;
        self.enabled = enabled;
        self.full = ColorSet::full(ncolor);
    }

    /// Start the colour loop of one probed cell.
    pub(crate) fn begin_cell(&mut self) {
        self.map.clear();
        self.sibling = 0;
        self.in_sibling = false;
        self.complete = self.enabled;
    }

    /// Start one sibling probe.
    pub(crate) fn guess(&mut self) {
        if !self.enabled {
            return;
        }
        self.sibling += 1;
        self.in_sibling = true;
    }

    /// A sibling ran to quiescence; keep its contributions.
    pub(crate) fn end_sibling(&mut self) {
        self.in_sibling = false;
    }

    /// Drop the in-flight sibling (contradiction, accidental solve) or
    /// note that a colour had no sibling at all (pad skip). Either way
    /// the current probed cell can no longer prove anything.
    pub(crate) fn cancel(&mut self) {
        if self.in_sibling {
            let sibling = self.sibling;
            self.map.retain(|_, e| {
                if e.last != sibling {
                    return true;
                }
                match e.saved.take() {
                    Some((prior, current, last)) => {
                        e.prior = prior;
                        e.current = current;
                        e.last = last;
                        true
                    }
                    None => false,
                }
            });
            self.sibling -= 1;
            self.in_sibling = false;
        }
        self.complete = false;
    }

    /// A cell shrank from `old` to `new` during the in-flight sibling.
    pub(crate) fn record(&mut self, cell: usize, old: ColorSet, new: ColorSet) {
        if !self.enabled || !self.in_sibling {
            return;
        }
        let absent = self.full.minus(new);
        match self.map.get_mut(&cell) {
            None => {
                // untouched by earlier siblings: its resting state was
                // `old`, so those siblings all lacked old's complement
                let prior = if self.sibling == 1 {
                    self.full
                } else {
                    self.full.minus(old)
                };
                self.map.insert(
                    cell,
                    MergeEntry {
                        prior,
                        current: absent,
                        last: self.sibling,
                        saved: None,
                    },
                );
            }
            Some(e) if e.last == self.sibling => {
                // later shrink in the same sibling: absent only grows
                e.current = absent;
            }
            Some(e) => {
                e.saved = Some((e.prior, e.current, e.last));
                let mut prior = e.prior.intersect(e.current);
                if self.sibling - e.last > 1 {
                    // siblings in between left the cell at `old`
                    prior = prior.intersect(self.full.minus(old));
                }
                e.prior = prior;
                e.current = absent;
                e.last = self.sibling;
            }
        }
    }

    /// After a probed cell's full colour loop: colours provably absent
    /// from each touched cell under every alternative. Only cells the
    /// final sibling touched can qualify.
    pub(crate) fn check(&mut self) -> Vec<(usize, ColorSet)> {
        if !self.enabled || !self.complete || self.sibling == 0 {
            return Vec::new();
        }
        let last = self.sibling;
        let mut out: Vec<(usize, ColorSet)> = self
            .map
            .iter()
            .filter(|(_, e)| e.last == last)
            .map(|(&cell, e)| (cell, e.prior.intersect(e.current)))
            .filter(|(_, dead)| !dead.is_empty())
            .collect();
        out.sort_unstable_by_key(|&(cell, _)| cell);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn set(colors: &[u8]) -> ColorSet {
        colors.iter().copied().collect()
    }

    #[test]
    fn common_elimination_survives_all_siblings() {
        let mut m = MergeBuffer::default();
        m.reset(true, 3);
        m.begin_cell();
        // sibling 1: cell 7 drops colour 2
        m.guess();
        m.record(7, set(&[0, 1, 2]), set(&[0, 1]));
        m.end_sibling();
        // sibling 2: cell 7 drops colours 1 and 2
        m.guess();
        m.record(7, set(&[0, 1, 2]), set(&[0]));
        m.end_sibling();
        let facts = m.check();
        assert_eq!(facts, vec![(7, set(&[2]))]);
    }

    #[test]
    fn one_sided_elimination_does_not_fire() {
        let mut m = MergeBuffer::default();
        m.reset(true, 2);
        m.begin_cell();
        m.guess();
        m.record(7, set(&[0, 1]), set(&[0]));
        m.end_sibling();
        m.guess();
        // cell 7 untouched by sibling 2, cell 8 shrinks instead
        m.record(8, set(&[0, 1]), set(&[1]));
        m.end_sibling();
        // cell 7 missed the last sibling, cell 8 missed the first:
        // 8's prior is the complement of its resting state, which its
        // live possibilities never intersect
        let facts = m.check();
        assert_eq!(facts, vec![]);
    }

    #[test]
    fn gap_fold_blocks_late_entries() {
        let mut m = MergeBuffer::default();
        m.reset(true, 3);
        m.begin_cell();
        m.guess(); // sibling 1 touches nothing
        m.end_sibling();
        m.guess();
        m.record(4, set(&[0, 1, 2]), set(&[0]));
        m.end_sibling();
        // colours 1,2 were still possible during sibling 1
        let facts = m.check();
        assert_eq!(facts, vec![]);
    }

    #[test]
    fn cancel_discards_the_in_flight_sibling() {
        let mut m = MergeBuffer::default();
        m.reset(true, 2);
        m.begin_cell();
        m.guess();
        m.record(3, set(&[0, 1]), set(&[0]));
        m.end_sibling();
        m.guess();
        m.record(3, set(&[0, 1]), set(&[1]));
        m.cancel();
        // the cancelled sibling must not count, and the loop is now
        // incomplete so nothing may fire
        assert_eq!(m.check(), vec![]);
    }

    #[test]
    fn skip_without_sibling_marks_incomplete() {
        let mut m = MergeBuffer::default();
        m.reset(true, 2);
        m.begin_cell();
        m.guess();
        m.record(3, set(&[0, 1]), set(&[0]));
        m.end_sibling();
        m.cancel(); // a colour was skipped, no sibling ran
        assert_eq!(m.check(), vec![]);
    }

    #[test]
    fn disabled_buffer_records_nothing() {
        let mut m = MergeBuffer::default();
        m.reset(false, 2);
        m.begin_cell();
        m.guess();
        m.record(3, set(&[0, 1]), set(&[0]));
        m.end_sibling();
        assert_eq!(m.check(), vec![]);
    }

    #[test]
    fn next_cell_can_still_merge_after_a_skip() {
        let mut m = MergeBuffer::default();
        m.reset(true, 2);
        // first probed cell: one colour skipped
        m.begin_cell();
        m.guess();
        m.record(3, set(&[0, 1]), set(&[0]));
        m.end_sibling();
        m.cancel();
        assert_eq!(m.check(), vec![]);
        // second probed cell runs clean; cell 9 loses colour 0 both times
        m.begin_cell();
        m.guess();
        m.record(9, set(&[0, 1]), set(&[1]));
        m.end_sibling();
        m.guess();
        m.record(9, set(&[0, 1]), set(&[1]));
        m.end_sibling();
        assert_eq!(m.check(), vec![(9, set(&[0]))]);
    }
}
