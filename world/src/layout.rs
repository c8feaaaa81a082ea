//! Static tile geometry consumed by the occupancy map.

use thiserror::Error;
use townwalk_core::CellCoord;

const FLOOR_GLYPH: char = '.';
const OBSTACLE_GLYPH: char = '#';

/// Errors raised while parsing an ASCII tile layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout contained no non-blank rows.
    #[error("tile layout is empty")]
    Empty,
    /// A row did not match the width established by the first row.
    #[error("row {row} has {found} tiles but the layout is {expected} tiles wide")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph other than `.` or `#` appeared in the layout.
    #[error("unknown tile glyph '{glyph}' at column {column}, row {row}")]
    UnknownGlyph {
        /// The unrecognised character.
        glyph: char,
        /// Zero-based column of the glyph.
        column: usize,
        /// Zero-based row of the glyph.
        row: usize,
    },
    /// The layout is too large to be addressed with signed cell coordinates.
    #[error("tile layout of {columns}x{rows} tiles exceeds the addressable grid")]
    TooLarge {
        /// Number of columns requested.
        columns: usize,
        /// Number of rows requested.
        rows: usize,
    },
}

/// Dense walkability grid derived once from map geometry.
///
/// Cells outside the grid are never walkable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    columns: u32,
    rows: u32,
    walkable: Vec<bool>,
}

impl TileLayout {
    /// Creates a layout in which every cell is walkable.
    #[must_use]
    pub fn open(columns: u32, rows: u32) -> Self {
        Self::from_fn(columns, rows, |_| true)
    }

    /// Builds a layout by querying a host walkability oracle for every cell.
    pub fn from_fn<F>(columns: u32, rows: u32, mut is_walkable: F) -> Self
    where
        F: FnMut(CellCoord) -> bool,
    {
        let columns = columns.min(i32::MAX as u32);
        let rows = rows.min(i32::MAX as u32);
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut walkable = Vec::with_capacity(capacity);
        for row in 0..rows {
            for column in 0..columns {
                walkable.push(is_walkable(CellCoord::new(column as i32, row as i32)));
            }
        }

        Self {
            columns,
            rows,
            walkable,
        }
    }

    /// Parses a layout drawn with `.` for floor and `#` for obstacles.
    ///
    /// Blank lines are ignored and surrounding whitespace is trimmed, so the
    /// layout can be embedded in indented configuration files.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let lines: Vec<&str> = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let Some(first) = lines.first() else {
            return Err(LayoutError::Empty);
        };
        let expected = first.chars().count();

        let mut walkable = Vec::with_capacity(expected * lines.len());
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != expected {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected,
                    found,
                });
            }

            for (column, glyph) in line.chars().enumerate() {
                match glyph {
                    FLOOR_GLYPH => walkable.push(true),
                    OBSTACLE_GLYPH => walkable.push(false),
                    _ => {
                        return Err(LayoutError::UnknownGlyph { glyph, column, row });
                    }
                }
            }
        }

        let too_large = || LayoutError::TooLarge {
            columns: expected,
            rows: lines.len(),
        };
        let columns = i32::try_from(expected).map_err(|_| too_large())?;
        let rows = i32::try_from(lines.len()).map_err(|_| too_large())?;

        Ok(Self {
            columns: columns as u32,
            rows: rows as u32,
            walkable,
        })
    }

    /// Provides the dimensions of the layout as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the cell lies within the layout bounds.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether the map geometry permits standing on the cell.
    #[must_use]
    pub fn is_tile_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}
