use tracing::debug;

use crate::bitset::ColorSet;
use crate::puzzle::Color;
use crate::solver::{Contradiction, Solver};

// The probe pad is an array of colour sets, one per cell. Every colour
// a completed probe eliminated from a cell is ORed into that cell's
// pad entry. A later probe on such a (cell, colour) pair would only
// re-explore territory an earlier probe already ruled over, so it is
// skipped; skipping forfeits merging on that cell, because the colour
// loop is no longer exhaustive.

/// What a probe sequence handed back to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// Best speculative assignment found; commit it as a branch.
    Guess { cell: usize, color: Color },
    /// A necessary consequence was set; resume plain propagation.
    Fact,
    /// A probe happened to complete the whole grid.
    Solved,
}

#[derive(Debug, Clone, Copy)]
struct Best {
    cell: usize,
    color: Color,
    nleft: usize,
}

enum CellProbe {
    Done(Probe),
    Continue,
}

impl Solver {
    /// Probe every colour of one candidate cell. Updates `best` with
    /// the probe that left the fewest unsolved cells.
    fn probe_cell(&mut self, idx: usize, best: &mut Option<Best>) -> Result<CellProbe, Contradiction> {
        self.probed[idx] = true;
        self.merge.begin_cell();
        let colors: Vec<Color> = self.puz.cells[idx].possible.iter().collect();
        for c in colors {
            if self.pad[idx].contains(c) {
                // consequences would be a subset of an earlier probe's
                self.merge.cancel();
                continue;
            }
            let (row, col) = self.puz.cell_coords(idx);
            debug!(row, col, color = c, "probing");
            self.stats.probes += 1;
            self.merge.guess();
            let mark = self.hist.len();
            self.guess_cell(idx, c);
            match self.logic_solve() {
                Ok(()) => {
                    if self.puz.solved() {
                        // by wild luck the guess finished the puzzle
                        self.merge.cancel();
                        self.probing = false;
                        return Ok(CellProbe::Done(Probe::Solved));
                    }
                    let nleft = self.puz.ncells - self.puz.nsolved;
                    debug!(row, col, color = c, nleft, "probe complete");
                    if best.map_or(true, |b| nleft < b.nleft) {
                        *best = Some(Best {
                            cell: idx,
                            color: c,
                            nleft,
                        });
                    }
                    self.pad_eliminations(mark);
                    self.merge.end_sibling();
                    self.undo_probe();
                }
                Err(Contradiction) => {
                    // good news: the probed colour is impossible
                    debug!(row, col, color = c, "probe hit a contradiction");
                    self.merge.cancel();
                    if !self.backtrack() {
                        panic!("could not backtrack after a probe");
                    }
                    self.probing = false;
                    return Ok(CellProbe::Done(Probe::Fact));
                }
            }
        }

        // anything every alternative agreed on is a fact; only strikes
        // that change live state count, or a sterile merge would stall
        // the driver forever
        let mut applied = false;
        for (cell, dead) in self.merge.check() {
            let possible = self.puz.cells[cell].possible;
            let strike = dead.intersect(possible);
            if strike.is_empty() {
                continue;
            }
            if strike == possible {
                self.probing = false;
                return Err(Contradiction);
            }
            let (row, col) = self.puz.cell_coords(cell);
            debug!(row, col, ?strike, "merged consequence");
            self.set_cell(cell, possible.minus(strike));
            self.add_jobs_cell(cell);
            applied = true;
        }
        if applied {
            self.stats.merges += 1;
            self.probing = false;
            return Ok(CellProbe::Done(Probe::Fact));
        }
        Ok(CellProbe::Continue)
    }

    /// OR the colours this probe eliminated into the pad. `mark` is
    /// the history length from just before the probe's guess; the
    /// guess entry itself is a choice, not an elimination.
    fn pad_eliminations(&mut self, mark: usize) {
        for i in mark..self.hist.len() {
            let e = self.hist.entries()[i];
            if e.branch {
                continue;
            }
            let eliminated = e.possible.minus(self.puz.cells[e.cell].possible);
            self.pad[e.cell] = self.pad[e.cell].union(eliminated);
        }
    }

    /// Try speculative assignments until one produces a fact, solves
    /// the puzzle, or every candidate has been measured, in which case
    /// the most productive probe becomes the driver's guess.
    pub(crate) fn probe(&mut self) -> Result<Probe, Contradiction> {
        debug_assert!(!self.probing);
        debug_assert!(self.jobs.is_empty(), "probe entered with pending jobs");
        debug!("starting probe sequence");
        self.pad.iter_mut().for_each(|p| *p = ColorSet::empty());
        self.probed.iter_mut().for_each(|p| *p = false);
        self.merge.reset(self.cfg.merge, self.puz.ncolor);
        self.probing = true;
        let mut best: Option<Best> = None;

        // cells next to recent activity first: walk history back to the
        // last guess and probe the unsolved neighbours of changed cells
        if self.cfg.probe_level > 1 {
            let mut k = self.hist.len();
            while k > 0 {
                k -= 1;
                let e = self.hist.entries()[k];
                let (row, col) = self.puz.cell_coords(e.cell);
                for (nr, nc) in neighbors(row, col, self.puz.nrows, self.puz.ncols) {
                    let nidx = self.puz.cell_index(nr, nc);
                    if self.puz.cells[nidx].n < 2 || self.probed[nidx] {
                        continue;
                    }
                    match self.probe_cell(nidx, &mut best)? {
                        CellProbe::Done(p) => return Ok(p),
                        CellProbe::Continue => {}
                    }
                }
                if e.branch {
                    break;
                }
            }
        }

        // full pass over unsolved cells with settled surroundings
        for idx in 0..self.puz.ncells {
            if self.puz.cells[idx].n < 2 || self.probed[idx] {
                continue;
            }
            let (row, col) = self.puz.cell_coords(idx);
            if self.count_neighbors(row, col) < 2 {
                continue;
            }
            match self.probe_cell(idx, &mut best)? {
                CellProbe::Done(p) => return Ok(p),
                CellProbe::Continue => {}
            }
        }

        self.probing = false;
        let Some(best) = best else {
            panic!(
                "probe found no candidate cell (solved {} of {})",
                self.puz.nsolved, self.puz.ncells
            );
        };
        let (row, col) = self.puz.cell_coords(best.cell);
        debug!(row, col, color = best.color, "probe sequence complete");
        Ok(Probe::Guess {
            cell: best.cell,
            color: best.color,
        })
    }
}

/// In-range orthogonal neighbours.
fn neighbors(
    row: usize,
    col: usize,
    nrows: usize,
    ncols: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(4);
    if row > 0 {
        out.push((row - 1, col));
    }
    if row + 1 < nrows {
        out.push((row + 1, col));
    }
    if col > 0 {
        out.push((row, col - 1));
    }
    if col + 1 < ncols {
        out.push((row, col + 1));
    }
    out.into_iter()
}
