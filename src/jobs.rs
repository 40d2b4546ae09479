use tracing::{debug, trace};

use crate::bitset::ColorSet;
use crate::puzzle::{CellState, Dir};
use crate::solver::Solver;

/// A scheduled re-solve of one line. Higher priority pops first; the
/// sequence number keeps ties first-in first-out.
#[derive(Debug, Clone, Copy)]
struct Job {
    priority: i32,
    seq: u64,
    dir: Dir,
    line: usize,
}

fn before(a: &Job, b: &Job) -> bool {
    a.priority > b.priority || (a.priority == b.priority && a.seq < b.seq)
}

/// Binary heap of line jobs with a back-index per line, so a line is
/// queued at most once and membership tests are constant time.
#[derive(Debug)]
pub(crate) struct JobQueue {
    heap: Vec<Job>,
    index: [Vec<i32>; 2],
    seq: u64,
}

impl JobQueue {
    pub(crate) fn new(nrows: usize, ncols: usize) -> JobQueue {
        JobQueue {
            heap: Vec::with_capacity(nrows + ncols),
            index: [vec![-1; nrows], vec![-1; ncols]],
            seq: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queue a line unless it already is.
    pub(crate) fn add(&mut self, dir: Dir, line: usize, priority: i32) {
        if self.index[dir.index()][line] >= 0 {
            return;
        }
        let job = Job {
            priority,
            seq: self.seq,
            dir,
            line,
        };
        self.seq += 1;
        self.heap.push(job);
        let at = self.heap.len() - 1;
        self.index[dir.index()][line] = at as i32;
        self.sift_up(at);
    }

    /// Pop the most promising line.
    pub(crate) fn next(&mut self) -> Option<(Dir, usize)> {
        let top = *self.heap.first()?;
        self.index[top.dir.index()][top.line] = -1;
        let last = self.heap.pop().expect("heap not empty");
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.index[last.dir.index()][last.line] = 0;
            self.sift_down(0);
        }
        Some((top.dir, top.line))
    }

    pub(crate) fn flush(&mut self) {
        for job in &self.heap {
            self.index[job.dir.index()][job.line] = -1;
        }
        self.heap.clear();
    }

    fn place(&mut self, at: usize, job: Job) {
        self.heap[at] = job;
        self.index[job.dir.index()][job.line] = at as i32;
    }

    fn sift_up(&mut self, mut at: usize) {
        let job = self.heap[at];
        while at > 0 {
            let parent = (at - 1) / 2;
            if !before(&job, &self.heap[parent]) {
                break;
            }
            let moved = self.heap[parent];
            self.place(at, moved);
            at = parent;
        }
        self.place(at, job);
    }

    fn sift_down(&mut self, mut at: usize) {
        let job = self.heap[at];
        loop {
            let mut child = 2 * at + 1;
            if child >= self.heap.len() {
                break;
            }
            if child + 1 < self.heap.len() && before(&self.heap[child + 1], &self.heap[child]) {
                child += 1;
            }
            if !before(&self.heap[child], &job) {
                break;
            }
            let moved = self.heap[child];
            self.place(at, moved);
            at = child;
        }
        self.place(at, job);
    }
}

/// A cell's prior state, kept so speculation can be unwound. `branch`
/// marks a guess that backtracking may invert.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hist {
    pub(crate) cell: usize,
    pub(crate) n: u8,
    pub(crate) possible: ColorSet,
    pub(crate) branch: bool,
}

/// Undo log. Recording is implicit: plain entries are kept only while
/// some branch is live, so purely logical deductions made before the
/// first guess cost nothing.
#[derive(Debug, Default)]
pub(crate) struct History {
    entries: Vec<Hist>,
}

impl History {
    pub(crate) fn push(&mut self, cell: usize, prior: CellState, branch: bool) {
        if branch || !self.entries.is_empty() {
            self.entries.push(Hist {
                cell,
                n: prior.n,
                possible: prior.possible,
                branch,
            });
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Hist> {
        self.entries.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[Hist] {
        &self.entries
    }

    pub(crate) fn has_branch(&self) -> bool {
        self.entries.iter().any(|e| e.branch)
    }
}

impl Solver {
    /// Queue both lines through a cell, as after a guess or an imposed
    /// fact.
    pub(crate) fn add_jobs_cell(&mut self, idx: usize) {
        for dir in Dir::ALL {
            let li = self.puz.line_of(idx, dir);
            let priority = 2 - self.puz.clues[dir.index()][li].slack;
            self.jobs.add(dir, li, priority);
        }
    }

    /// Seed the queue with every line; tight lines first.
    pub(crate) fn seed_jobs(&mut self) {
        for dir in Dir::ALL {
            for li in 0..self.puz.nlines(dir) {
                let priority = -self.puz.clues[dir.index()][li].slack;
                self.jobs.add(dir, li, priority);
            }
        }
    }

    /// Unwind one speculative level completely, the most recent branch
    /// included. Used to roll a finished probe back to its base state.
    pub(crate) fn undo_probe(&mut self) {
        while let Some(e) = self.hist.pop() {
            self.puz.write_cell_n(e.cell, e.possible, e.n);
            if e.branch {
                return;
            }
        }
        panic!("probe undo ran past the bottom of history");
    }

    /// Rewind to the most recent branch and invert it: the guessed
    /// colour is removed from the cell instead of restored. Returns
    /// false when no branch is left, meaning the puzzle has no
    /// solution on any open path.
    pub(crate) fn backtrack(&mut self) -> bool {
        self.jobs.flush();
        loop {
            let Some(e) = self.hist.pop() else {
                return false;
            };
            if !e.branch {
                self.puz.write_cell_n(e.cell, e.possible, e.n);
                continue;
            }
            let guessed = self.puz.cells[e.cell]
                .possible
                .sole()
                .expect("branch cell no longer holds a single colour");
            let prior = CellState {
                possible: e.possible,
                n: e.n,
            };
            self.puz.write_cell_n(e.cell, e.possible, e.n);
            let mut inverted = e.possible;
            inverted.clear(guessed);
            if inverted.is_empty() {
                // nothing left on this branch either, keep unwinding
                trace!(cell = e.cell, "branch exhausted, unwinding further");
                continue;
            }
            self.hist.push(e.cell, prior, false);
            self.puz.write_cell(e.cell, inverted);
            self.stats.backtracks += 1;
            let (row, col) = self.puz.cell_coords(e.cell);
            debug!(row, col, color = guessed, "backtracked, guess inverted");
            self.add_jobs_cell(e.cell);
            return true;
        }
    }
}
