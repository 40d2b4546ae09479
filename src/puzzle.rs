use smallvec::SmallVec;
use thiserror::Error;

use crate::bitset::{ColorSet, MAX_COLORS};

/// Colour index into the puzzle's colour table. 0 is the background.
pub type Color = u8;

pub const BACKGROUND: Color = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    Row,
    Col,
}

impl Dir {
    pub const ALL: [Dir; 2] = [Dir::Row, Dir::Col];

    pub fn index(self) -> usize {
        match self {
            Dir::Row => 0,
            Dir::Col => 1,
        }
    }

    pub fn cross(self) -> Dir {
        match self {
            Dir::Row => Dir::Col,
            Dir::Col => Dir::Row,
        }
    }
}

/// One clue run: `length` consecutive cells of `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub length: u16,
    pub color: Color,
}

/// The clue for a single line. `slack` is the line length minus the
/// minimum layout length; a negative value means the clue cannot fit,
/// which the line solver reports as a contradiction.
#[derive(Debug, Clone)]
pub struct Clue {
    pub runs: SmallVec<[Run; 8]>,
    pub slack: i32,
}

impl Clue {
    fn new(runs: SmallVec<[Run; 8]>, line_len: usize) -> Clue {
        let slack = line_len as i32 - min_layout(&runs) as i32;
        Clue { runs, slack }
    }
}

/// Minimum cells the runs occupy: lengths plus a one-cell gap wherever
/// same-coloured runs adjoin.
fn min_layout(runs: &[Run]) -> usize {
    let mut total = 0;
    for (i, run) in runs.iter().enumerate() {
        total += run.length as usize;
        if i + 1 < runs.len() && runs[i + 1].color == run.color {
            total += 1;
        }
    }
    total
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellState {
    pub possible: ColorSet,
    pub n: u8,
}

#[derive(Debug, Clone)]
pub struct ColorDef {
    pub name: String,
    pub ch: char,
    pub rgb: String,
}

impl ColorDef {
    pub fn new(name: &str, ch: char, rgb: &str) -> ColorDef {
        ColorDef {
            name: name.to_owned(),
            ch,
            rgb: rgb.to_owned(),
        }
    }

    /// A background-plus-letters table for puzzles that do not name
    /// their colours.
    pub fn letter_table(ncolor: u8) -> Vec<ColorDef> {
        let mut table = vec![ColorDef::new("background", '-', "ffffff")];
        for i in 1..ncolor {
            let ch = (b'a' + i - 1) as char;
            table.push(ColorDef::new(&ch.to_string(), ch, "000000"));
        }
        table
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("puzzle must have at least one row and one column")]
    EmptyGrid,
    #[error("bad color count: {0} (need 2 to {MAX_COLORS})")]
    BadColorCount(usize),
    #[error("expected {expected} {dir:?} clues, got {got}")]
    ClueCount { dir: Dir, expected: usize, got: usize },
    #[error("zero-length run in {dir:?} clue {index}")]
    EmptyRun { dir: Dir, index: usize },
    #[error("unknown color {color} in {dir:?} clue {index}")]
    BadClueColor { dir: Dir, index: usize, color: Color },
    #[error("cell ({row},{col}) is given a color the other givens rule out")]
    BadGiven { row: usize, col: usize },
}

/// A puzzle and its partial solution: the colour table, both clue sets,
/// and one flat cell array viewed through row and column index
/// arithmetic. Rows and columns never own cells; a cell's row view and
/// column view are the same `CellState` slot.
#[readonly::make]
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub ncolor: u8,
    pub colors: Vec<ColorDef>,
    pub nrows: usize,
    pub ncols: usize,
    pub ncells: usize,
    pub nsolved: usize,
    pub clues: [Vec<Clue>; 2],
    pub cells: Vec<CellState>,
}

impl Puzzle {
    pub fn new(
        nrows: usize,
        ncols: usize,
        colors: Vec<ColorDef>,
        row_clues: Vec<Vec<Run>>,
        col_clues: Vec<Vec<Run>>,
    ) -> Result<Puzzle, PuzzleError> {
        if nrows == 0 || ncols == 0 {
            return Err(PuzzleError::EmptyGrid);
        }
        if colors.len() < 2 || colors.len() > MAX_COLORS as usize {
            return Err(PuzzleError::BadColorCount(colors.len()));
        }
        let ncolor = colors.len() as u8;
        if row_clues.len() != nrows {
            return Err(PuzzleError::ClueCount {
                dir: Dir::Row,
                expected: nrows,
                got: row_clues.len(),
            });
        }
        if col_clues.len() != ncols {
            return Err(PuzzleError::ClueCount {
                dir: Dir::Col,
                expected: ncols,
                got: col_clues.len(),
            });
        }

        let build = |dir: Dir, line_len: usize, raw: Vec<Vec<Run>>| {
            raw.into_iter()
                .enumerate()
                .map(|(index, runs)| {
                    for run in &runs {
                        if run.length == 0 {
                            return Err(PuzzleError::EmptyRun { dir, index });
                        }
                        if run.color == BACKGROUND || run.color >= ncolor {
                            return Err(PuzzleError::BadClueColor {
                                dir,
                                index,
                                color: run.color,
                            });
                        }
                    }
                    Ok(Clue::new(runs.into_iter().collect(), line_len))
                })
                .collect::<Result<Vec<Clue>, PuzzleError>>()
        };
        let clues = [build(Dir::Row, ncols, row_clues)?, build(Dir::Col, nrows, col_clues)?];

        let ncells = nrows * ncols;
        let cells = vec![
            CellState {
                possible: ColorSet::full(ncolor),
                n: ncolor,
            };
            ncells
        ];
        Ok(Puzzle {
            ncolor,
            colors,
            nrows,
            ncols,
            ncells,
            nsolved: 0,
            clues,
            cells,
        })
    }

    pub fn cell_index(&self, row: usize, col: usize) -> usize {
        row * self.ncols + col
    }

    pub fn cell_coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.ncols, idx % self.ncols)
    }

    /// Which line of `dir` the cell lies on.
    pub fn line_of(&self, idx: usize, dir: Dir) -> usize {
        match dir {
            Dir::Row => idx / self.ncols,
            Dir::Col => idx % self.ncols,
        }
    }

    pub fn nlines(&self, dir: Dir) -> usize {
        match dir {
            Dir::Row => self.nrows,
            Dir::Col => self.ncols,
        }
    }

    pub fn line_len(&self, dir: Dir) -> usize {
        match dir {
            Dir::Row => self.ncols,
            Dir::Col => self.nrows,
        }
    }

    /// Cell indices along line `li` of `dir`, in line order.
    pub fn line_cells(&self, dir: Dir, li: usize) -> impl Iterator<Item = usize> {
        let (start, step, len) = match dir {
            Dir::Row => (li * self.ncols, 1, self.ncols),
            Dir::Col => (li, self.ncols, self.nrows),
        };
        (0..len).map(move |i| start + i * step)
    }

    pub fn solved(&self) -> bool {
        self.nsolved == self.ncells
    }

    /// Overwrite a cell, keeping `n` and the solved counter in step.
    pub(crate) fn write_cell(&mut self, idx: usize, possible: ColorSet) {
        let n = possible.count();
        self.write_cell_n(idx, possible, n);
    }

    pub(crate) fn write_cell_n(&mut self, idx: usize, possible: ColorSet, n: u8) {
        debug_assert_eq!(n, possible.count());
        let cell = &mut self.cells[idx];
        let was = cell.n;
        cell.possible = possible;
        cell.n = n;
        if was != 1 && n == 1 {
            self.nsolved += 1;
        } else if was == 1 && n != 1 {
            self.nsolved -= 1;
        }
    }

    /// Intersect a given into a cell before solving starts.
    pub fn constrain(&mut self, row: usize, col: usize, allowed: ColorSet) -> Result<(), PuzzleError> {
        let idx = self.cell_index(row, col);
        let new = self.cells[idx].possible.intersect(allowed);
        if new.is_empty() {
            return Err(PuzzleError::BadGiven { row, col });
        }
        self.write_cell(idx, new);
        Ok(())
    }

    /// Render the grid with the colour table characters, one row per
    /// line. Unsolved cells print as '?'.
    pub fn solution_string(&self) -> String {
        let mut out = String::with_capacity(self.ncells + self.nrows);
        for row in 0..self.nrows {
            if row > 0 {
                out.push('\n');
            }
            for col in 0..self.ncols {
                let cell = &self.cells[self.cell_index(row, col)];
                match cell.possible.sole() {
                    Some(c) => out.push(self.colors[c as usize].ch),
                    None => out.push('?'),
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn runs(desc: &[(u16, Color)]) -> Vec<Run> {
        desc.iter()
            .map(|&(length, color)| Run { length, color })
            .collect()
    }

    fn two_color(nrows: usize, ncols: usize, rows: Vec<Vec<Run>>, cols: Vec<Vec<Run>>) -> Puzzle {
        Puzzle::new(nrows, ncols, ColorDef::letter_table(2), rows, cols).unwrap()
    }

    #[test]
    fn slack_counts_same_color_gaps() {
        let c = Clue::new(runs(&[(1, 1), (1, 1)]).into_iter().collect(), 5);
        assert_eq!(c.slack, 2);
        let c = Clue::new(runs(&[(1, 1), (1, 2)]).into_iter().collect(), 5);
        assert_eq!(c.slack, 3);
    }

    #[test]
    fn negative_slack_is_allowed_at_build() {
        // an over-full clue is a solver-level contradiction, not a
        // malformed puzzle
        let p = two_color(
            1,
            2,
            vec![runs(&[(3, 1)])],
            vec![runs(&[(1, 1)]), runs(&[(1, 1)])],
        );
        assert_eq!(p.clues[Dir::Row.index()][0].slack, -1);
    }

    #[test]
    fn line_views_share_cells() {
        let p = two_color(
            2,
            3,
            vec![runs(&[(1, 1)]), runs(&[(1, 1)])],
            vec![runs(&[(1, 1)]), runs(&[(1, 1)]), runs(&[(1, 1)])],
        );
        let row1: Vec<usize> = p.line_cells(Dir::Row, 1).collect();
        let col2: Vec<usize> = p.line_cells(Dir::Col, 2).collect();
        assert_eq!(row1, vec![3, 4, 5]);
        assert_eq!(col2, vec![2, 5]);
        assert_eq!(row1[2], col2[1]);
        assert_eq!(p.line_of(5, Dir::Row), 1);
        assert_eq!(p.line_of(5, Dir::Col), 2);
    }

    #[test]
    fn write_cell_tracks_nsolved() {
        let mut p = two_color(1, 2, vec![runs(&[(1, 1)])], vec![runs(&[(1, 1)]), vec![]]);
        assert_eq!(p.nsolved, 0);
        p.write_cell(0, ColorSet::single(1));
        assert_eq!(p.nsolved, 1);
        p.write_cell(0, ColorSet::full(2));
        assert_eq!(p.nsolved, 0);
    }

    #[test]
    fn rejects_bad_clue_color() {
        let err = Puzzle::new(
            1,
            1,
            ColorDef::letter_table(2),
            vec![runs(&[(1, 2)])],
            vec![runs(&[(1, 1)])],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PuzzleError::BadClueColor {
                dir: Dir::Row,
                index: 0,
                color: 2
            }
        );
    }

    #[test]
    fn constrain_rejects_conflicting_given() {
        let mut p = two_color(1, 1, vec![runs(&[(1, 1)])], vec![runs(&[(1, 1)])]);
        p.constrain(0, 0, ColorSet::single(1)).unwrap();
        let err = p.constrain(0, 0, ColorSet::single(BACKGROUND)).unwrap_err();
        assert_eq!(err, PuzzleError::BadGiven { row: 0, col: 0 });
    }
}
