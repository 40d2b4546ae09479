use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::bitset::ColorSet;
use crate::puzzle::{Color, ColorDef, Puzzle, PuzzleError, Run, BACKGROUND};

// 5x5:1/3/5/3/1,1/3/5/3/1
// 3x3:1b/1a.1b/1a,1b.1a/1a/1b,?-?/---/?-?
#[derive(Parser)]
#[grammar = "puzzle.pest"]
struct PuzzleParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error("expected {expected} grid rows, got {got}")]
    GridRows { expected: usize, got: usize },
    #[error("grid row {row} has {got} cells, expected {expected}")]
    GridWidth { row: usize, expected: usize, got: usize },
    #[error("grid color '{0}' appears in no clue")]
    UnknownGridColor(char),
    #[error("number out of range: {0}")]
    BadNumber(String),
}

/// Parse a puzzle descriptor. Colour indices follow the order in which
/// clue letters first appear; the background is always colour 0.
pub fn parse_puzzle(text: &str) -> Result<Puzzle, ParseError> {
    let parsed = PuzzleParser::parse(Rule::puzzle, text)
        .map_err(|e| ParseError::Syntax(Box::new(e)))?
        .next()
        .expect("grammar yields one puzzle");
    let mut parts = parsed.into_inner();

    let number = |s: &str| -> Result<usize, ParseError> {
        s.parse().map_err(|_| ParseError::BadNumber(s.to_owned()))
    };
    let size_pair = parts.next().expect("size");
    let mut size = size_pair.into_inner();
    let nrows = number(size.next().unwrap().as_str())?;
    let ncols = number(size.next().unwrap().as_str())?;

    // colour letters are interned as they first appear
    let mut letters: Vec<char> = Vec::new();
    let mut intern = |ch: char| -> Color {
        match letters.iter().position(|&l| l == ch) {
            Some(at) => at as Color + 1,
            None => {
                letters.push(ch);
                letters.len() as Color
            }
        }
    };

    let mut clue_set = |pair: pest::iterators::Pair<Rule>| -> Result<Vec<Vec<Run>>, ParseError> {
        pair.into_inner()
            .map(|line| {
                let raw: Vec<(u16, Option<char>)> = line
                    .into_inner()
                    .map(|run| {
                        let mut parts = run.into_inner();
                        let digits = parts.next().unwrap().as_str();
                        let length: u16 = digits
                            .parse()
                            .map_err(|_| ParseError::BadNumber(digits.to_owned()))?;
                        let ch = parts.next().map(|l| l.as_str().chars().next().unwrap());
                        Ok((length, ch))
                    })
                    .collect::<Result<_, ParseError>>()?;
                // a lone bare "0" marks an empty line
                if raw == [(0, None)] {
                    return Ok(Vec::new());
                }
                Ok(raw
                    .into_iter()
                    .map(|(length, ch)| Run {
                        length,
                        color: intern(ch.unwrap_or('a')),
                    })
                    .collect())
            })
            .collect()
    };

    let row_clues = clue_set(parts.next().expect("row clues"))?;
    let col_clues = clue_set(parts.next().expect("col clues"))?;

    let mut colors = vec![ColorDef::new("background", '-', "ffffff")];
    for &ch in &letters {
        colors.push(ColorDef::new(&ch.to_string(), ch, "000000"));
    }
    let mut puz = Puzzle::new(nrows, ncols, colors, row_clues, col_clues)?;

    if let Some(grid) = parts.next().filter(|p| p.as_rule() == Rule::grid) {
        let rows: Vec<&str> = grid.into_inner().map(|cells| cells.as_str()).collect();
        if rows.len() != nrows {
            return Err(ParseError::GridRows {
                expected: nrows,
                got: rows.len(),
            });
        }
        for (r, row) in rows.iter().enumerate() {
            if row.chars().count() != ncols {
                return Err(ParseError::GridWidth {
                    row: r,
                    expected: ncols,
                    got: row.chars().count(),
                });
            }
            for (c, ch) in row.chars().enumerate() {
                let allowed = match ch {
                    '?' => continue,
                    '-' => ColorSet::single(BACKGROUND),
                    ch => {
                        let color = letters
                            .iter()
                            .position(|&l| l == ch)
                            .ok_or(ParseError::UnknownGridColor(ch))?;
                        ColorSet::single(color as Color + 1)
                    }
                };
                puz.constrain(r, c, allowed)?;
            }
        }
    }
    Ok(puz)
}
