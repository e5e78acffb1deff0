//! Hex board geometry and occupancy
//!
//! Every cell of the radius-4 board gets a dense [`CellId`] when the topology
//! is built. Neighbors live in a flat table indexed by (cell, direction) and
//! occupancy is a flat array indexed by cell, so cube coordinates only serve
//! as labels.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ParseCellError, SetupError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Board radius (distance from center to edge)
pub const BOARD_RADIUS: i8 = 4;

/// Number of cells on the board
pub const CELL_COUNT: usize = 61;

/// Pieces per side at the start of a game
pub const START_PIECES: usize = 14;

/// A side with fewer pieces than this has lost (6 ejected)
pub const MIN_PIECES: usize = 9;

/// Direction vectors in cube coordinates (da, db, dc).
/// Direction `d` and `(d + 3) % 6` are antiparallel.
pub const DIRECTIONS: [(i8, i8, i8); 6] = [
    (0, 1, -1),
    (1, 0, -1),
    (1, -1, 0),
    (0, -1, 1),
    (-1, 0, 1),
    (-1, 1, 0),
];

// ============================================================================
// COORDINATES
// ============================================================================

/// Cube hex coordinates, `a + b + c == 0`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cube {
    pub a: i8,
    pub b: i8,
    pub c: i8,
}

impl Cube {
    pub const ORIGIN: Cube = Cube { a: 0, b: 0, c: 0 };

    pub const fn new(a: i8, b: i8) -> Self {
        Self { a, b, c: -a - b }
    }

    /// Check if this cube is on the board
    pub fn is_valid(&self) -> bool {
        self.a + self.b + self.c == 0 && self.distance_to_center() <= BOARD_RADIUS
    }

    /// Distance from center (0,0,0)
    pub fn distance_to_center(&self) -> i8 {
        self.a.abs().max(self.b.abs()).max(self.c.abs())
    }

    /// The cube one step away in `direction` (may be off the board)
    pub fn offset(self, direction: Direction) -> Cube {
        let (da, db, dc) = direction.delta();
        Cube {
            a: self.a + da,
            b: self.b + db,
            c: self.c + dc,
        }
    }

    /// Point reflection through the center
    pub fn mirrored(self) -> Cube {
        Cube {
            a: -self.a,
            b: -self.b,
            c: -self.c,
        }
    }
}

/// One of the six hex directions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Direction(u8);

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction(0),
        Direction(1),
        Direction(2),
        Direction(3),
        Direction(4),
        Direction(5),
    ];

    /// One direction per line through a cell
    pub const AXES: [Direction; 3] = [Direction(0), Direction(1), Direction(2)];

    pub fn new(index: u8) -> Self {
        Direction(index % 6)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn opposite(self) -> Direction {
        Direction((self.0 + 3) % 6)
    }

    /// Both `d` and its opposite share an axis
    pub const fn axis(self) -> usize {
        (self.0 % 3) as usize
    }

    pub const fn delta(self) -> (i8, i8, i8) {
        DIRECTIONS[self.0 as usize]
    }
}

/// Dense cell index into the board arena
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u8);

impl CellId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Cube coordinate label of this cell
    pub fn cube(self) -> Cube {
        Topology::shared().cube(self)
    }

    /// Neighbor in `direction`, `None` at the edge
    pub fn neighbor(self, direction: Direction) -> Option<CellId> {
        Topology::shared().neighbor(self, direction)
    }

    /// Iterate every cell id in arena order
    pub fn all() -> impl Iterator<Item = CellId> {
        (0..CELL_COUNT as u8).map(CellId)
    }
}

/// Labels follow the usual notation: rows `A`..`I` from the Black edge
/// (`a = 4`) to the White edge, columns `1`..`9` from `b = -4`.
impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cube = self.cube();
        let row = (b'A' + (BOARD_RADIUS - cube.a) as u8) as char;
        let column = cube.b + BOARD_RADIUS + 1;
        write!(f, "{}{}", row, column)
    }
}

impl FromStr for CellId {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellError(s.to_string());
        let bytes = s.trim().as_bytes();
        if bytes.len() != 2 {
            return Err(err());
        }

        let row = bytes[0].to_ascii_uppercase();
        let column = bytes[1];
        if !(b'A'..=b'I').contains(&row) || !(b'1'..=b'9').contains(&column) {
            return Err(err());
        }

        let a = BOARD_RADIUS - (row - b'A') as i8;
        let b = (column - b'1') as i8 - BOARD_RADIUS;
        Topology::shared().cell_at(Cube::new(a, b)).ok_or_else(err)
    }
}

// ============================================================================
// SIDES
// ============================================================================

/// Side color. Black starts on rows A-C, White on rows G-I.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Black = 0,
    White = 1,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Black, Side::White];

    pub fn opponent(self) -> Self {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// How far `cube` lies toward the opposing home edge, -4..=4
    pub fn progress(self, cube: Cube) -> i8 {
        match self {
            Side::Black => -cube.a,
            Side::White => cube.a,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Black => write!(f, "Black"),
            Side::White => write!(f, "White"),
        }
    }
}

// ============================================================================
// TOPOLOGY
// ============================================================================

/// Cell set and adjacency, identical for every board
#[derive(Debug)]
pub struct Topology {
    cubes: [Cube; CELL_COUNT],
    index: FxHashMap<Cube, CellId>,
    neighbors: [[Option<CellId>; 6]; CELL_COUNT],
}

impl Topology {
    /// Enumerate the 61 cells (ordered by `a`, then `b`) and link neighbors
    pub fn new() -> Self {
        let mut cubes = [Cube::ORIGIN; CELL_COUNT];
        let mut index = FxHashMap::default();
        let mut next = 0usize;

        for a in -BOARD_RADIUS..=BOARD_RADIUS {
            for b in -BOARD_RADIUS..=BOARD_RADIUS {
                let cube = Cube::new(a, b);
                if !cube.is_valid() {
                    continue;
                }
                cubes[next] = cube;
                index.insert(cube, CellId(next as u8));
                next += 1;
            }
        }
        assert_eq!(next, CELL_COUNT, "radius-4 board must have 61 cells");

        let mut neighbors = [[None; 6]; CELL_COUNT];
        for (i, cube) in cubes.iter().enumerate() {
            for direction in Direction::ALL {
                neighbors[i][direction.index()] = index.get(&cube.offset(direction)).copied();
            }
        }

        Self {
            cubes,
            index,
            neighbors,
        }
    }

    /// Process-wide topology, built on first use
    pub fn shared() -> &'static Topology {
        static TOPOLOGY: OnceLock<Topology> = OnceLock::new();
        TOPOLOGY.get_or_init(Topology::new)
    }

    pub fn cell_at(&self, cube: Cube) -> Option<CellId> {
        self.index.get(&cube).copied()
    }

    pub fn cube(&self, cell: CellId) -> Cube {
        self.cubes[cell.index()]
    }

    pub fn neighbor(&self, cell: CellId, direction: Direction) -> Option<CellId> {
        self.neighbors[cell.index()][direction.index()]
    }

    /// Cells with fewer than six neighbors
    pub fn is_edge(&self, cell: CellId) -> bool {
        self.cube(cell).distance_to_center() == BOARD_RADIUS
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Occupancy of every cell plus running piece counts
#[derive(Debug)]
pub struct Board {
    topology: &'static Topology,
    cells: [Option<Side>; CELL_COUNT],
    counts: [usize; 2],
}

impl Board {
    /// Board with no pieces
    pub fn empty() -> Self {
        Self {
            topology: Topology::shared(),
            cells: [None; CELL_COUNT],
            counts: [0; 2],
        }
    }

    /// Standard opening: three-row wedges at opposite ends
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for cell in CellId::all() {
            if let Some(side) = standard_owner(board.cube(cell)) {
                board.set_occupant(cell, Some(side));
            }
        }
        board
    }

    /// Custom position from piece placements
    pub fn from_pieces(pieces: &[(Cube, Side)]) -> Result<Self, SetupError> {
        let mut board = Self::empty();
        for &(cube, side) in pieces {
            let cell = board.cell_at(cube).ok_or(SetupError::OffBoard(cube))?;
            if board.occupant(cell).is_some() {
                return Err(SetupError::Duplicate(cube));
            }
            board.set_occupant(cell, Some(side));
        }
        Ok(board)
    }

    pub fn topology(&self) -> &'static Topology {
        self.topology
    }

    pub fn occupant(&self, cell: CellId) -> Option<Side> {
        self.cells[cell.index()]
    }

    /// Only the move applier writes occupancy
    pub(crate) fn set_occupant(&mut self, cell: CellId, value: Option<Side>) {
        let slot = &mut self.cells[cell.index()];
        if let Some(old) = *slot {
            self.counts[old.index()] -= 1;
        }
        if let Some(new) = value {
            self.counts[new.index()] += 1;
        }
        *slot = value;
    }

    pub fn neighbor(&self, cell: CellId, direction: Direction) -> Option<CellId> {
        self.topology.neighbor(cell, direction)
    }

    pub fn cell_at(&self, cube: Cube) -> Option<CellId> {
        self.topology.cell_at(cube)
    }

    pub fn cube(&self, cell: CellId) -> Cube {
        self.topology.cube(cell)
    }

    pub fn is_edge(&self, cell: CellId) -> bool {
        self.topology.is_edge(cell)
    }

    /// Cells currently holding a piece of `side`, in arena order
    pub fn cells_of(&self, side: Side) -> impl Iterator<Item = CellId> + '_ {
        CellId::all().filter(move |&cell| self.occupant(cell) == Some(side))
    }

    pub fn remaining(&self, side: Side) -> usize {
        self.counts[side.index()]
    }

    /// Read-only copy of the occupancy for renderers
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot { cells: self.cells }
    }
}

fn standard_owner(cube: Cube) -> Option<Side> {
    let Cube { a, b, .. } = cube;
    if a == 4 || a == 3 || (a == 2 && (-2..=0).contains(&b)) {
        Some(Side::Black)
    } else if a == -4 || a == -3 || (a == -2 && (0..=2).contains(&b)) {
        Some(Side::White)
    } else {
        None
    }
}

/// Owned occupancy copy, detached from the live board
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardSnapshot {
    cells: [Option<Side>; CELL_COUNT],
}

impl BoardSnapshot {
    pub fn occupant(&self, cell: CellId) -> Option<Side> {
        self.cells[cell.index()]
    }

    pub fn remaining(&self, side: Side) -> usize {
        self.cells.iter().filter(|&&c| c == Some(side)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, Option<Side>)> + '_ {
        CellId::all().map(move |cell| (cell, self.occupant(cell)))
    }
}
