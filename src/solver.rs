use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::bitset::ColorSet;
use crate::jobs::{History, JobQueue};
use crate::merge::MergeBuffer;
use crate::probe::Probe;
use crate::puzzle::{Color, Dir, Puzzle, BACKGROUND};

/// A line rejected every placement, or a cell ran out of colours.
/// Recoverable: the driver backtracks to the nearest branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contradiction;

/// How to score a line when ranking guess cells (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingPolicy {
    /// Neighbour count alone decides.
    Simple,
    /// Prefer low slack and few runs.
    AdHoc,
    /// Prefer lines with fewer layouts, counted exactly.
    Math,
}

impl FromStr for RatingPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(RatingPolicy::Simple),
            "adhoc" => Ok(RatingPolicy::AdHoc),
            "math" => Ok(RatingPolicy::Math),
            _ => Err(format!("unknown rating policy: {s}")),
        }
    }
}

/// Which of a guess cell's remaining colours to try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPolicy {
    Max,
    Min,
    Random,
    /// Prefer the colour its neighbours can least agree with.
    Contrast,
}

impl FromStr for ColorPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(ColorPolicy::Max),
            "min" => Ok(ColorPolicy::Min),
            "random" => Ok(ColorPolicy::Random),
            "contrast" => Ok(ColorPolicy::Contrast),
            _ => Err(format!("unknown color policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Run the line solver at all. Off is only useful for measuring.
    pub line_solve: bool,
    /// Allow guessing; off means a stalled puzzle reports stuck.
    pub backtrack: bool,
    /// Probe (measure every candidate guess) instead of the cheap
    /// heuristic pick.
    pub probe: bool,
    /// 1 scans the whole grid; above 1 the neighbours of recently
    /// changed cells are probed first.
    pub probe_level: u8,
    /// Keep consequences common to all probes on a cell.
    pub merge: bool,
    /// Before the first guess, test every colour of every open cell
    /// against its crossing lines.
    pub exhaust: bool,
    /// After solving, search the remaining branches for a second
    /// solution and report whether the first was unique.
    pub check_unique: bool,
    pub rating: RatingPolicy,
    pub color: ColorPolicy,
    /// Seed for the random colour policy.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            line_solve: true,
            backtrack: true,
            probe: true,
            probe_level: 2,
            merge: true,
            exhaust: true,
            check_unique: false,
            rating: RatingPolicy::AdHoc,
            color: ColorPolicy::Contrast,
            seed: 0,
        }
    }
}

/// Work counters, monotone over a solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Line solver invocations.
    pub nlines: u64,
    /// Branches committed.
    pub guesses: u64,
    /// Speculative probes run.
    pub probes: u64,
    /// Facts established by probe merging.
    pub merges: u64,
    /// Guesses inverted.
    pub backtracks: u64,
    /// Exhaustive passes, and colours they struck.
    pub exh_runs: u64,
    pub exh_cells: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Solved,
    /// No assignment satisfies the clues.
    Unsat,
    /// Propagation stalled and guessing is disabled.
    Stuck,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub verdict: Verdict,
    /// The completed grid, twice when a uniqueness check found a
    /// second completion.
    pub solutions: Vec<String>,
    /// Present when `check_unique` was on and the puzzle solved.
    pub unique: Option<bool>,
}

pub struct Solver {
    pub(crate) puz: Puzzle,
    pub(crate) cfg: Config,
    pub(crate) jobs: JobQueue,
    pub(crate) hist: History,
    pub(crate) merge: MergeBuffer,
    /// Per cell, colours eliminated by completed probes this sequence.
    pub(crate) pad: Vec<ColorSet>,
    /// Cells already probed this sequence.
    pub(crate) probed: Vec<bool>,
    pub(crate) stats: Stats,
    pub(crate) probing: bool,
    rng: SmallRng,
}

impl Solver {
    pub fn new(puz: Puzzle, cfg: Config) -> Solver {
        let jobs = JobQueue::new(puz.nrows, puz.ncols);
        let pad = vec![ColorSet::empty(); puz.ncells];
        let probed = vec![false; puz.ncells];
        let rng = SmallRng::seed_from_u64(cfg.seed);
        let mut solver = Solver {
            puz,
            cfg,
            jobs,
            hist: History::default(),
            merge: MergeBuffer::default(),
            pad,
            probed,
            stats: Stats::default(),
            probing: false,
            rng,
        };
        solver.seed_jobs();
        solver
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puz
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Shrink a cell to `new`, recording the prior state while any
    /// branch is live. Every mutation after setup funnels through
    /// here, so undo always sees the full story.
    pub(crate) fn set_cell(&mut self, idx: usize, new: ColorSet) {
        let prior = self.puz.cells[idx];
        debug_assert!(!new.is_empty());
        debug_assert!(new.minus(prior.possible).is_empty());
        self.hist.push(idx, prior, false);
        self.merge.record(idx, prior.possible, new);
        self.puz.write_cell(idx, new);
    }

    /// Set a cell to a single colour as a branch point and queue its
    /// lines. Shared by committed guesses and probes.
    pub(crate) fn guess_cell(&mut self, idx: usize, c: Color) {
        let prior = self.puz.cells[idx];
        debug_assert!(prior.n >= 2 && prior.possible.contains(c));
        self.hist.push(idx, prior, true);
        self.puz.write_cell(idx, ColorSet::single(c));
        self.add_jobs_cell(idx);
    }

    /// Drain the job queue through the line solver. `Ok` means
    /// quiescent: no line can make further progress.
    pub fn logic_solve(&mut self) -> Result<(), Contradiction> {
        if !self.cfg.line_solve {
            self.jobs.flush();
            return Ok(());
        }
        while let Some((dir, li)) = self.jobs.next() {
            self.stats.nlines += 1;
            trace!(?dir, line = li, "line job");
            self.solve_line(dir, li)?;
        }
        Ok(())
    }

    /// The speculative assignment the configured strategy favours
    /// next. `None` means no guess is called for: the grid is
    /// complete, or a probe already established a fact (or finished
    /// the puzzle outright) and propagation should resume instead.
    pub fn guess(&mut self) -> Result<Option<(usize, Color)>, Contradiction> {
        if self.cfg.probe {
            match self.probe()? {
                Probe::Guess { cell, color } => Ok(Some((cell, color))),
                Probe::Fact | Probe::Solved => Ok(None),
            }
        } else if let Some(cell) = self.pick_a_cell() {
            let color = self.pick_color(cell);
            Ok(Some((cell, color)))
        } else {
            Ok(None)
        }
    }

    /// Solve the puzzle. Alternates propagation with exhaustive
    /// checks, probing or heuristic guessing, and backtracking, until
    /// the grid completes, every branch is exhausted, or progress
    /// stops with guessing disabled.
    pub fn solve(&mut self) -> Report {
        let mut solutions: Vec<String> = Vec::new();
        loop {
            match self.logic_solve() {
                Ok(()) => {
                    if self.puz.solved() {
                        let s = self.puz.solution_string();
                        debug!("grid complete");
                        if !self.cfg.check_unique {
                            return Report {
                                verdict: Verdict::Solved,
                                solutions: vec![s],
                                unique: None,
                            };
                        }
                        if solutions.is_empty() {
                            solutions.push(s);
                            // any second completion must live on an
                            // inverted branch
                            if !self.hist.has_branch() || !self.backtrack() {
                                return Report {
                                    verdict: Verdict::Solved,
                                    solutions,
                                    unique: Some(true),
                                };
                            }
                            continue;
                        }
                        solutions.push(s);
                        return Report {
                            verdict: Verdict::Solved,
                            solutions,
                            unique: Some(false),
                        };
                    }

                    if self.cfg.exhaust && self.hist.is_empty() && self.try_everything() > 0 {
                        continue;
                    }
                    if !self.cfg.backtrack {
                        return Report {
                            verdict: Verdict::Stuck,
                            solutions,
                            unique: None,
                        };
                    }
                    if self.cfg.probe {
                        match self.probe() {
                            Ok(Probe::Fact) | Ok(Probe::Solved) => continue,
                            Ok(Probe::Guess { cell, color }) => {
                                let (row, col) = self.puz.cell_coords(cell);
                                debug!(row, col, color, "committing best probe");
                                self.stats.guesses += 1;
                                self.guess_cell(cell, color);
                            }
                            Err(Contradiction) => {
                                if !self.backtrack() {
                                    return self.exhausted(solutions);
                                }
                            }
                        }
                    } else {
                        let cell = self
                            .pick_a_cell()
                            .expect("guess requested on a finished grid");
                        let color = self.pick_color(cell);
                        let (row, col) = self.puz.cell_coords(cell);
                        debug!(row, col, color, "guessing");
                        self.stats.guesses += 1;
                        self.guess_cell(cell, color);
                    }
                }
                Err(Contradiction) => {
                    debug!("stuck on a contradiction");
                    self.probing = false;
                    if !self.backtrack() {
                        return self.exhausted(solutions);
                    }
                }
            }
        }
    }

    /// Every branch is spent. With a solution in hand that proves
    /// uniqueness; with none it proves unsatisfiability.
    fn exhausted(&self, solutions: Vec<String>) -> Report {
        if solutions.is_empty() {
            Report {
                verdict: Verdict::Unsat,
                solutions,
                unique: None,
            }
        } else {
            Report {
                verdict: Verdict::Solved,
                solutions,
                unique: Some(true),
            }
        }
    }

    /// Solved neighbours of a cell; off-grid counts as solved on all
    /// four sides.
    pub(crate) fn count_neighbors(&self, row: usize, col: usize) -> usize {
        let mut count = 0;
        for (dr, dc) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
            let r = row as isize + dr;
            let c = col as isize + dc;
            if r < 0 || c < 0 || r >= self.puz.nrows as isize || c >= self.puz.ncols as isize {
                count += 1;
            } else if self.puz.cells[self.puz.cell_index(r as usize, c as usize)].n == 1 {
                count += 1;
            }
        }
        count
    }

    /// Pick the unsolved cell with the most settled surroundings,
    /// breaking ties by the configured line rating. A cell boxed in on
    /// all four sides wins outright.
    pub(crate) fn pick_a_cell(&self) -> Option<usize> {
        let mut maxv: i32 = -1;
        let mut minrate = f64::INFINITY;
        let mut fav = None;
        for idx in 0..self.puz.ncells {
            if self.puz.cells[idx].n == 1 {
                continue;
            }
            let (row, col) = self.puz.cell_coords(idx);
            let v = self.count_neighbors(row, col) as i32;
            if v == 4 {
                return Some(idx);
            }
            if v >= maxv {
                let s = self.rate_cell(row, col);
                if v > maxv || s < minrate {
                    maxv = v;
                    minrate = s;
                    trace!(row, col, score = v, rate = s, "new favourite guess cell");
                    fav = Some(idx);
                }
            }
        }
        fav
    }

    /// Score the guess cell's two lines; lower means easier to refute.
    fn rate_cell(&self, row: usize, col: usize) -> f64 {
        let clue = |dir: Dir, li: usize| &self.puz.clues[dir.index()][li];
        match self.cfg.rating {
            RatingPolicy::Simple => 0.0,
            RatingPolicy::AdHoc => {
                let score = |dir: Dir, li: usize| {
                    let c = clue(dir, li);
                    c.slack.max(0) + 2 * c.runs.len() as i32
                };
                let si = score(Dir::Row, row);
                let sj = score(Dir::Col, col);
                (3 * si.min(sj) + si.max(sj)) as f64
            }
            RatingPolicy::Math => {
                let layouts = |dir: Dir, li: usize| {
                    let c = clue(dir, li);
                    ln_binomial(c.slack.max(0) + c.runs.len() as i32, c.runs.len() as i32)
                };
                layouts(Dir::Row, row).min(layouts(Dir::Col, col))
            }
        }
    }

    /// Choose a colour for the guess cell under the configured policy.
    pub(crate) fn pick_color(&mut self, idx: usize) -> Color {
        let possible = self.puz.cells[idx].possible;
        debug_assert!(possible.count() >= 2);
        match self.cfg.color {
            ColorPolicy::Max => possible.iter().last().expect("cell has colors"),
            ColorPolicy::Min => possible.iter().next().expect("cell has colors"),
            ColorPolicy::Random => {
                let mut n = 0u32;
                let mut best = BACKGROUND;
                for c in possible.iter() {
                    n += 1;
                    if self.rng.gen_range(0..n) == 0 {
                        best = c;
                    }
                }
                best
            }
            ColorPolicy::Contrast => {
                let (row, col) = self.puz.cell_coords(idx);
                let mut bestc = BACKGROUND;
                let mut bestn = -1i32;
                for c in possible.iter() {
                    let mut n = 0;
                    for (dr, dc) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
                        let r = row as isize + dr;
                        let cc = col as isize + dc;
                        if r < 0
                            || cc < 0
                            || r >= self.puz.nrows as isize
                            || cc >= self.puz.ncols as isize
                        {
                            // the frame clashes with everything but
                            // background
                            if c != BACKGROUND {
                                n += 1;
                            }
                        } else if !self.puz.cells
                            [self.puz.cell_index(r as usize, cc as usize)]
                        .possible
                        .contains(c)
                        {
                            n += 1;
                        }
                    }
                    if n > bestn {
                        bestc = c;
                        bestn = n;
                    }
                }
                bestc
            }
        }
    }
}

/// ln of the binomial coefficient C(n, k).
fn ln_binomial(n: i32, k: i32) -> f64 {
    let mut total = 0.0;
    for i in 0..k {
        total += ((n - i) as f64).ln() - ((i + 1) as f64).ln();
    }
    total
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::parse_puzzle;
    use crate::puzzle::{ColorDef, Run};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn runs(desc: &[(u16, Color)]) -> Vec<Run> {
        desc.iter()
            .map(|&(length, color)| Run { length, color })
            .collect()
    }

    fn puzzle(
        nrows: usize,
        ncols: usize,
        ncolor: u8,
        rows: &[&[(u16, Color)]],
        cols: &[&[(u16, Color)]],
    ) -> Puzzle {
        Puzzle::new(
            nrows,
            ncols,
            ColorDef::letter_table(ncolor),
            rows.iter().map(|r| runs(r)).collect(),
            cols.iter().map(|c| runs(c)).collect(),
        )
        .unwrap()
    }

    fn ambiguous_2x2() -> Puzzle {
        puzzle(2, 2, 2, &[&[(1, 1)], &[(1, 1)]], &[&[(1, 1)], &[(1, 1)]])
    }

    #[test]
    fn trivial_1x1_solves_by_propagation() {
        let puz = puzzle(1, 1, 2, &[&[(1, 1)]], &[&[(1, 1)]]);
        let mut solver = Solver::new(puz, Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(report.solutions, vec!["a".to_string()]);
        assert_eq!(solver.stats().guesses, 0);
        assert_eq!(solver.stats().probes, 0);
        assert!(solver.stats().nlines >= 1);
    }

    #[test]
    fn plus_sign_needs_no_guessing() {
        let puz = puzzle(
            5,
            5,
            2,
            &[&[(1, 1)], &[(3, 1)], &[(5, 1)], &[(3, 1)], &[(1, 1)]],
            &[&[(1, 1)], &[(3, 1)], &[(5, 1)], &[(3, 1)], &[(1, 1)]],
        );
        let mut solver = Solver::new(puz, Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(
            report.solutions[0],
            "--a--\n-aaa-\naaaaa\n-aaa-\n--a--"
        );
        assert_eq!(solver.stats().guesses, 0);
        assert_eq!(solver.stats().probes, 0);
    }

    #[test]
    fn ambiguous_puzzle_fails_the_uniqueness_check() {
        let mut solver = Solver::new(
            ambiguous_2x2(),
            Config {
                check_unique: true,
                ..Config::default()
            },
        );
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(report.unique, Some(false));
        assert_eq!(report.solutions.len(), 2);
        assert_ne!(report.solutions[0], report.solutions[1]);
    }

    #[test]
    fn unique_puzzle_passes_the_uniqueness_check() {
        let puz = puzzle(1, 1, 2, &[&[(1, 1)]], &[&[(1, 1)]]);
        let mut solver = Solver::new(
            puz,
            Config {
                check_unique: true,
                ..Config::default()
            },
        );
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(report.unique, Some(true));
        assert_eq!(report.solutions.len(), 1);
    }

    #[test]
    fn overfull_clue_is_unsat() {
        let puz = puzzle(1, 2, 2, &[&[(3, 1)]], &[&[(1, 1)], &[(1, 1)]]);
        let mut solver = Solver::new(puz, Config::default());
        assert_eq!(solver.logic_solve(), Err(Contradiction));
        let puz = puzzle(1, 2, 2, &[&[(3, 1)]], &[&[(1, 1)], &[(1, 1)]]);
        let mut solver = Solver::new(puz, Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Unsat);
        assert!(report.solutions.is_empty());
    }

    #[test]
    fn conflicting_clues_are_unsat() {
        // both row clues demand full rows, the columns forbid it
        let puz = puzzle(2, 2, 2, &[&[(2, 1)], &[(2, 1)]], &[&[(1, 1)], &[(1, 1)]]);
        let mut solver = Solver::new(puz, Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Unsat);
    }

    #[test]
    fn probing_solves_without_committed_guesses() {
        let mut solver = Solver::new(ambiguous_2x2(), Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(solver.stats().guesses, 0);
        assert!(solver.stats().probes >= 1);
    }

    #[test]
    fn heuristic_mode_guesses_instead_of_probing() {
        let mut solver = Solver::new(
            ambiguous_2x2(),
            Config {
                probe: false,
                ..Config::default()
            },
        );
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(solver.stats().guesses, 1);
        assert_eq!(solver.stats().probes, 0);
    }

    #[test]
    fn guess_reports_what_each_strategy_would_try() {
        let mut solver = Solver::new(
            ambiguous_2x2(),
            Config {
                probe: false,
                ..Config::default()
            },
        );
        solver.logic_solve().unwrap();
        // corner cell, contrast colour
        assert_eq!(solver.guess(), Ok(Some((0, 1))));

        let mut solver = Solver::new(ambiguous_2x2(), Config::default());
        solver.logic_solve().unwrap();
        // the first probe completes the grid, so no guess is needed
        assert_eq!(solver.guess(), Ok(None));
        assert!(solver.puzzle().solved());
    }

    #[test]
    fn stalled_puzzle_reports_stuck_without_backtracking() {
        let mut solver = Solver::new(
            ambiguous_2x2(),
            Config {
                backtrack: false,
                ..Config::default()
            },
        );
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Stuck);
    }

    #[test]
    fn exhaustive_pass_strikes_impossible_colors() {
        let mut puz = ambiguous_2x2();
        puz.constrain(0, 0, ColorSet::single(1)).unwrap();
        let mut solver = Solver::new(puz, Config::default());
        let hits = solver.try_everything();
        assert!(hits >= 1);
        // the corner given forces the diagonal completion
        assert_eq!(solver.puzzle().cells[1].possible, ColorSet::single(0));
        assert_eq!(solver.puzzle().cells[2].possible, ColorSet::single(0));
        assert_eq!(solver.puzzle().cells[3].possible, ColorSet::single(1));
        assert!(solver.stats().exh_runs == 1 && solver.stats().exh_cells >= 1);
    }

    #[test]
    fn quiescence_is_a_fixed_point() {
        let puz = puzzle(
            5,
            5,
            2,
            &[&[(1, 1)], &[(3, 1)], &[(5, 1)], &[(3, 1)], &[(1, 1)]],
            &[&[(1, 1)], &[(3, 1)], &[(5, 1)], &[(3, 1)], &[(1, 1)]],
        );
        let mut solver = Solver::new(puz, Config::default());
        solver.logic_solve().unwrap();
        let snapshot = solver.puzzle().cells.clone();
        let lines_before = solver.stats().nlines;
        solver.seed_jobs();
        solver.logic_solve().unwrap();
        assert_eq!(solver.puzzle().cells, snapshot);
        assert!(solver.stats().nlines > lines_before);
    }

    #[test]
    fn backtrack_restores_and_inverts() {
        let mut solver = Solver::new(ambiguous_2x2(), Config::default());
        solver.logic_solve().unwrap();
        solver.guess_cell(0, 1);
        solver.logic_solve().unwrap();
        assert!(solver.puzzle().solved());
        assert!(solver.backtrack());
        // the guess came out, the guessed colour went with it
        assert_eq!(solver.puzzle().cells[0].possible, ColorSet::single(0));
        assert_eq!(solver.puzzle().cells[1].possible, ColorSet::full(2));
        assert_eq!(solver.stats().backtracks, 1);
        solver.logic_solve().unwrap();
        assert!(solver.puzzle().solved());
        assert_eq!(solver.puzzle().cells[1].possible, ColorSet::single(1));
    }

    #[test]
    fn backtrack_with_no_branch_fails() {
        let mut solver = Solver::new(ambiguous_2x2(), Config::default());
        solver.logic_solve().unwrap();
        assert!(!solver.backtrack());
    }

    #[test]
    fn color_policies_disagree_on_purpose() {
        // centre cell open, every neighbour solved to colour b
        let mut puz = puzzle(
            3,
            3,
            3,
            &[&[(1, 2)], &[(1, 2), (1, 2)], &[(1, 2)]],
            &[&[(1, 2)], &[(1, 2), (1, 2)], &[(1, 2)]],
        );
        for (r, c) in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            puz.constrain(r, c, ColorSet::single(2)).unwrap();
        }
        let center = puz.cell_index(1, 1);
        let pick = |color: ColorPolicy| {
            let mut solver = Solver::new(
                puz.clone(),
                Config {
                    color,
                    ..Config::default()
                },
            );
            solver.pick_color(center)
        };
        assert_eq!(pick(ColorPolicy::Max), 2);
        assert_eq!(pick(ColorPolicy::Min), 0);
        // the surrounding b cells repel background and colour a
        // equally, and background wins the tie
        assert_eq!(pick(ColorPolicy::Contrast), 0);
        let random = pick(ColorPolicy::Random);
        assert!(puz.cells[center].possible.contains(random));
        assert_ne!(pick(ColorPolicy::Contrast), pick(ColorPolicy::Max));
    }

    #[test]
    fn rating_policies_order_lines_sensibly() {
        let puz = puzzle(
            5,
            5,
            2,
            &[&[(4, 1)], &[(1, 1)], &[(1, 1)], &[(1, 1)], &[(1, 1)]],
            &[&[(1, 1)], &[(1, 1)], &[(1, 1)], &[(1, 1)], &[(1, 1)]],
        );
        let solver = Solver::new(
            puz,
            Config {
                rating: RatingPolicy::Math,
                ..Config::default()
            },
        );
        // row 0 admits two layouts, every other line five
        let tight = solver.rate_cell(0, 0);
        let loose = solver.rate_cell(1, 0);
        assert!(tight < loose);
    }

    proptest! {
        #[test]
        fn speculation_always_unwinds_cleanly(
            ops in prop::collection::vec((0usize..9, 0u8..2), 0..12)
        ) {
            let puz = puzzle(
                3,
                3,
                2,
                &[&[(1, 1)], &[(1, 1)], &[(1, 1)]],
                &[&[(1, 1)], &[(1, 1)], &[(1, 1)]],
            );
            let mut solver = Solver::new(puz, Config::default());
            let cells_before = solver.puzzle().cells.clone();
            let nsolved_before = solver.puzzle().nsolved;
            solver.guess_cell(4, 1);
            for (idx, bit) in ops {
                let cur = solver.puzzle().cells[idx].possible;
                let new = cur.minus(ColorSet::single(bit));
                if new.is_empty() || new == cur {
                    continue;
                }
                solver.set_cell(idx, new);
            }
            solver.undo_probe();
            prop_assert_eq!(&solver.puzzle().cells, &cells_before);
            prop_assert_eq!(solver.puzzle().nsolved, nsolved_before);
        }
    }

    #[test]
    fn parsed_puzzle_solves_end_to_end() {
        let puz = parse_puzzle("5x5:1/3/5/3/1,1/3/5/3/1").unwrap();
        let mut solver = Solver::new(puz, Config::default());
        let report = solver.solve();
        assert_eq!(report.verdict, Verdict::Solved);
        assert_eq!(
            report.solutions[0],
            "--a--\n-aaa-\naaaaa\n-aaa-\n--a--"
        );
    }
}
