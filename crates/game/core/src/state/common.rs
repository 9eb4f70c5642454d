use std::fmt;

/// Unique identifier for any combatant tracked in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete grid position expressed in square coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Offsets of the eight Chebyshev neighbours.
    pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Grid distance where diagonal steps cost the same as orthogonal ones.
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    pub fn euclidean(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_adjacent(self, other: Self) -> bool {
        self.chebyshev(other) == 1
    }

    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        Self::NEIGHBOR_OFFSETS
            .into_iter()
            .map(move |(dx, dy)| self.offset(dx, dy))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Square block of cells occupied by one creature, anchored at its top-left cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Footprint {
    pub anchor: Position,
    /// Side length in cells.
    pub size: u32,
}

impl Footprint {
    pub const fn new(anchor: Position, size: u32) -> Self {
        Self { anchor, size }
    }

    pub fn cells(self) -> impl Iterator<Item = Position> {
        let side = self.size as i32;
        (0..side).flat_map(move |dy| (0..side).map(move |dx| self.anchor.offset(dx, dy)))
    }

    pub fn contains(self, position: Position) -> bool {
        let side = self.size as i32;
        position.x >= self.anchor.x
            && position.y >= self.anchor.y
            && position.x < self.anchor.x + side
            && position.y < self.anchor.y + side
    }

    /// Chebyshev gap between the closest cells of two footprints.
    pub fn distance(self, other: Footprint) -> u32 {
        let gap = |a0: i32, a_len: u32, b0: i32, b_len: u32| -> u32 {
            let a1 = a0 + a_len as i32 - 1;
            let b1 = b0 + b_len as i32 - 1;
            (b0 - a1).max(a0 - b1).max(0) as u32
        };
        let dx = gap(self.anchor.x, self.size, other.anchor.x, other.size);
        let dy = gap(self.anchor.y, self.size, other.anchor.y, other.size);
        dx.max(dy)
    }

    /// The same footprint moved to another anchor.
    pub const fn at(self, anchor: Position) -> Self {
        Self::new(anchor, self.size)
    }
}
