//! Tile map loading, validation and path extraction.

use std::fmt;

use tile_defence_core::{Rect, TileCoord, Vector2, TILE_SIZE};

/// Classification of a single map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Tile where critters spawn.
    Entry,
    /// Tile critters try to reach.
    Exit,
    /// Walkable tile between the entry and the exit.
    Path,
    /// Decorative tile that hosts nothing.
    Scenery,
    /// Tile on which a tower may be built.
    TowerSlot,
}

impl TileKind {
    /// Character representing the tile kind in the map text format.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Entry => 'E',
            Self::Exit => 'X',
            Self::Path => '#',
            Self::Scenery => '.',
            Self::TowerSlot => 'T',
        }
    }

    /// Parses a tile kind from its map text character.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'E' => Some(Self::Entry),
            'X' => Some(Self::Exit),
            '#' => Some(Self::Path),
            '.' => Some(Self::Scenery),
            'T' => Some(Self::TowerSlot),
            _ => None,
        }
    }

    const fn continues_path(self) -> bool {
        matches!(self, Self::Path | Self::Exit)
    }
}

/// Single cell of the map with its pixel placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    coord: TileCoord,
    kind: TileKind,
    size: f64,
}

impl Tile {
    /// Creates a square tile at `coord`.
    #[must_use]
    pub const fn new(coord: TileCoord, kind: TileKind, size: f64) -> Self {
        Self { coord, kind, size }
    }

    /// Grid coordinate of the tile.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Classification of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Side length of the tile in pixels.
    #[must_use]
    pub const fn size(&self) -> f64 {
        self.size
    }

    /// Pixel position of the tile's top-left corner.
    #[must_use]
    pub fn position(&self) -> Vector2 {
        self.coord.origin(self.size)
    }

    /// Pixel rectangle covered by the tile.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.coord.rect(self.size)
    }

    /// Pixel centre of the tile.
    #[must_use]
    pub fn centre(&self) -> Vector2 {
        self.rect().centre()
    }
}

/// Ordered, immutable sequence of tiles critters walk along.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    tiles: Vec<Tile>,
}

impl Path {
    /// Wraps an already ordered tile sequence.
    ///
    /// Maps build their path through [`Map::parse`]; this constructor exists
    /// for callers that assemble short paths by hand.
    #[must_use]
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// Number of tiles on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the path holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// First tile of the path.
    #[must_use]
    pub fn first(&self) -> Option<&Tile> {
        self.tiles.first()
    }

    /// Last tile of the path.
    #[must_use]
    pub fn last(&self) -> Option<&Tile> {
        self.tiles.last()
    }

    /// Index of the last tile, if the path is not empty.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.tiles.len().checked_sub(1)
    }

    /// Iterator over the path tiles from entry to exit.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Number of tiles between `index` and the end of the path.
    #[must_use]
    pub fn remaining_after(&self, index: usize) -> u32 {
        let remaining = self.tiles.len().saturating_sub(1).saturating_sub(index);
        u32::try_from(remaining).unwrap_or(u32::MAX)
    }
}

/// Problem detected while parsing a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapDefect {
    /// The document holds no rows.
    Empty,
    /// A row's length differs from the first row.
    RaggedRow {
        /// Tiles in the first row.
        expected: usize,
        /// Tiles in the offending row.
        found: usize,
    },
    /// A character is not part of the map alphabet.
    UnknownSymbol(char),
    /// No entry tile was found.
    MissingEntry,
    /// A second entry tile was found.
    DuplicateEntry,
    /// No exit tile was found.
    MissingExit,
    /// A second exit tile was found.
    DuplicateExit,
    /// The path splits into more than one continuation.
    Branch,
    /// The path stops before reaching the exit.
    DeadEnd,
    /// A path tile is not part of the entry-to-exit walk.
    Disconnected,
    /// The grid does not fit the coordinate range.
    TooLarge,
}

impl fmt::Display for MapDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "map is empty"),
            Self::RaggedRow { expected, found } => {
                write!(f, "row has {found} tiles but the first row has {expected}")
            }
            Self::UnknownSymbol(symbol) => write!(f, "unknown tile symbol {symbol:?}"),
            Self::MissingEntry => write!(f, "map has no entry tile"),
            Self::DuplicateEntry => write!(f, "map has more than one entry tile"),
            Self::MissingExit => write!(f, "map has no exit tile"),
            Self::DuplicateExit => write!(f, "map has more than one exit tile"),
            Self::Branch => write!(f, "path branches"),
            Self::DeadEnd => write!(f, "path ends before reaching the exit"),
            Self::Disconnected => write!(f, "path tile is not connected to the entry"),
            Self::TooLarge => write!(f, "map is too large"),
        }
    }
}

/// Error returned when a map document cannot be loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// The document violates the map format.
    #[error("malformed map at line {line}, column {col}: {reason}")]
    Malformed {
        /// What is wrong with the document.
        reason: MapDefect,
        /// One-based line of the offending tile, zero for whole-map problems.
        line: usize,
        /// One-based column of the offending tile, zero for whole-map problems.
        col: usize,
    },
}

impl MapError {
    fn whole(reason: MapDefect) -> Self {
        Self::Malformed {
            reason,
            line: 0,
            col: 0,
        }
    }

    fn at(reason: MapDefect, coord: TileCoord) -> Self {
        Self::Malformed {
            reason,
            line: one_based(coord.row()),
            col: one_based(coord.column()),
        }
    }

    /// Defect reported by the error.
    #[must_use]
    pub const fn reason(&self) -> MapDefect {
        match self {
            Self::Malformed { reason, .. } => *reason,
        }
    }
}

/// Rectangular tile grid together with its extracted path.
#[derive(Clone, Debug, PartialEq)]
pub struct Map {
    columns: u32,
    rows: u32,
    tile_size: f64,
    tiles: Vec<Tile>,
    path: Path,
}

impl Map {
    /// Parses a map document using the default tile size.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        Self::parse_with_tile_size(text, TILE_SIZE)
    }

    /// Parses a map document whose tiles measure `tile_size` pixels.
    ///
    /// Rows may end with LF or CRLF. Trailing blank lines are ignored.
    pub fn parse_with_tile_size(text: &str, tile_size: f64) -> Result<Self, MapError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            let _ = lines.pop();
        }

        let Some(first) = lines.first() else {
            return Err(MapError::whole(MapDefect::Empty));
        };
        let width = first.chars().count();
        if width == 0 {
            return Err(MapError::whole(MapDefect::Empty));
        }

        let columns = u32::try_from(width).map_err(|_| MapError::whole(MapDefect::TooLarge))?;
        let rows =
            u32::try_from(lines.len()).map_err(|_| MapError::whole(MapDefect::TooLarge))?;

        let mut tiles = Vec::with_capacity(width * lines.len());
        let mut entry = None;
        let mut exit = None;

        for (row, line) in (0..rows).zip(lines.iter()) {
            let found = line.chars().count();
            if found != width {
                return Err(MapError::Malformed {
                    reason: MapDefect::RaggedRow {
                        expected: width,
                        found,
                    },
                    line: one_based(row),
                    col: 0,
                });
            }

            for (column, symbol) in (0..columns).zip(line.chars()) {
                let coord = TileCoord::new(column, row);
                let kind = TileKind::from_symbol(symbol)
                    .ok_or_else(|| MapError::at(MapDefect::UnknownSymbol(symbol), coord))?;
                match kind {
                    TileKind::Entry if entry.is_some() => {
                        return Err(MapError::at(MapDefect::DuplicateEntry, coord));
                    }
                    TileKind::Entry => entry = Some(coord),
                    TileKind::Exit if exit.is_some() => {
                        return Err(MapError::at(MapDefect::DuplicateExit, coord));
                    }
                    TileKind::Exit => exit = Some(coord),
                    _ => {}
                }
                tiles.push(Tile::new(coord, kind, tile_size));
            }
        }

        let entry = entry.ok_or_else(|| MapError::whole(MapDefect::MissingEntry))?;
        if exit.is_none() {
            return Err(MapError::whole(MapDefect::MissingExit));
        }

        let mut map = Self {
            columns,
            rows,
            tile_size,
            tiles,
            path: Path::default(),
        };
        map.path = map.walk_path(entry)?;
        Ok(map)
    }

    /// Walks from the entry to the exit, refusing branches and stray path tiles.
    fn walk_path(&self, entry: TileCoord) -> Result<Path, MapError> {
        let mut visited = vec![false; self.tiles.len()];
        let mut walk = Vec::new();
        let mut current = entry;

        loop {
            let tile = self
                .tile(current)
                .copied()
                .ok_or_else(|| MapError::at(MapDefect::DeadEnd, current))?;
            if let Some(index) = self.index(current) {
                visited[index] = true;
            }
            walk.push(tile);

            if tile.kind() == TileKind::Exit {
                break;
            }

            let mut next = None;
            for neighbor in neighbors(current, self.columns, self.rows) {
                let Some(index) = self.index(neighbor) else {
                    continue;
                };
                if visited[index] || !self.tiles[index].kind().continues_path() {
                    continue;
                }
                if next.is_some() {
                    return Err(MapError::at(MapDefect::Branch, current));
                }
                next = Some(neighbor);
            }

            match next {
                Some(neighbor) => current = neighbor,
                None => return Err(MapError::at(MapDefect::DeadEnd, current)),
            }
        }

        if let Some(stray) = self
            .tiles
            .iter()
            .zip(visited.iter())
            .find(|(tile, seen)| tile.kind() == TileKind::Path && !**seen)
            .map(|(tile, _)| tile.coord())
        {
            return Err(MapError::at(MapDefect::Disconnected, stray));
        }

        Ok(Path::from_tiles(walk))
    }

    /// Serialises the map back into its text format using LF line endings.
    #[must_use]
    pub fn to_text(&self) -> String {
        let width = usize::try_from(self.columns).unwrap_or(0);
        let mut text = String::with_capacity(self.tiles.len() + self.tiles.len() / width.max(1));
        for row in self.tiles.chunks(width.max(1)) {
            text.extend(row.iter().map(|tile| tile.kind().symbol()));
            text.push('\n');
        }
        text
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of every tile in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Width of the whole map in pixels.
    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        f64::from(self.columns) * self.tile_size
    }

    /// Height of the whole map in pixels.
    #[must_use]
    pub fn pixel_height(&self) -> f64 {
        f64::from(self.rows) * self.tile_size
    }

    /// Tile located at `coord`, if it lies within the map.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).and_then(|index| self.tiles.get(index))
    }

    /// Iterator over every tile in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Path from the entry to the exit.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.column() >= self.columns || coord.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn one_based(value: u32) -> usize {
    usize::try_from(value).map_or(usize::MAX, |value| value.saturating_add(1))
}

fn neighbors(cell: TileCoord, width: u32, height: u32) -> impl Iterator<Item = TileCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(TileCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(TileCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
