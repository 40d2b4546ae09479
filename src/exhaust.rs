use tracing::debug;

use crate::bitset::ColorSet;
use crate::line;
use crate::puzzle::{Dir, Run};
use crate::solver::Solver;

impl Solver {
    /// Last resort before guessing: tentatively paint every remaining
    /// colour into every unsolved cell and check that both crossing
    /// lines still admit a placement. A colour that breaks a line can
    /// never be right, so it is struck permanently. Cheap compared to
    /// a wrong guess, and only run while no speculation is live, so no
    /// history is kept. Returns the number of colours struck.
    pub(crate) fn try_everything(&mut self) -> usize {
        debug_assert!(self.hist.is_empty());
        self.stats.exh_runs += 1;
        let mut hits = 0;
        for idx in 0..self.puz.ncells {
            if self.puz.cells[idx].n < 2 {
                continue;
            }
            let mut real = self.puz.cells[idx].possible;
            let mut realn = self.puz.cells[idx].n;
            let snapshot = real;
            for c in snapshot.iter() {
                if !real.contains(c) {
                    continue;
                }
                self.puz.write_cell(idx, ColorSet::single(c));
                let broken = Dir::ALL
                    .iter()
                    .any(|&dir| !self.line_feasible(dir, self.puz.line_of(idx, dir)));
                if broken {
                    let (row, col) = self.puz.cell_coords(idx);
                    debug!(row, col, color = c, "no line placement, color struck");
                    hits += 1;
                    self.stats.exh_cells += 1;
                    real.clear(c);
                    realn -= 1;
                    self.add_jobs_cell(idx);
                    if realn == 1 {
                        break;
                    }
                }
            }
            self.puz.write_cell_n(idx, real, realn);
        }
        hits
    }

    fn line_feasible(&self, dir: Dir, li: usize) -> bool {
        let cells: Vec<ColorSet> = self
            .puz
            .line_cells(dir, li)
            .map(|i| self.puz.cells[i].possible)
            .collect();
        let runs: &[Run] = &self.puz.clues[dir.index()][li].runs;
        line::feasible(&cells, runs)
    }
}
