use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

pub mod report;
pub mod rules;
pub mod solver;

/// The four tile colors of a standard Rummikub set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    /// The single-letter notation used in the text format (`R B G Y`).
    pub fn letter(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Blue => 'B',
            Color::Green => 'G',
            Color::Yellow => 'Y',
        }
    }

    pub fn from_letter(c: char) -> Option<Color> {
        match c {
            'R' => Some(Color::Red),
            'B' => Some(Color::Blue),
            'G' => Some(Color::Green),
            'Y' => Some(Color::Yellow),
            _ => None,
        }
    }
}

/// A single tile: a number from 1 to 13 and a color.
///
/// Tiles are plain values. The game uses two full decks, so equal tiles can
/// legitimately coexist on the table; "which copy" a move touches is tracked
/// positionally (group index + slot), never by tile identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile {
    number: u8,
    color: Color,
}

impl Tile {
    /// Create a tile. Panics if `number` is outside 1–13.
    pub fn new(number: u8, color: Color) -> Self {
        assert!((1..=13).contains(&number), "Number must be 1-13");
        Tile { number, color }
    }

    pub fn number(self) -> u8 {
        self.number
    }

    pub fn color(self) -> Color {
        self.color
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.color.letter())
    }
}

/// Errors produced while parsing the text notation (`1R 2R 3R, 5B 5G 5Y`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty tile text")]
    Empty,
    #[error("invalid number in `{0}`")]
    BadNumber(String),
    #[error("number {0} is out of range 1-13")]
    NumberRange(u16),
    #[error("invalid color letter `{0}`")]
    BadColor(char),
    #[error("missing color letter in `{0}`")]
    MissingColor(String),
    #[error("trailing characters in `{0}`")]
    TrailingInput(String),
}

impl FromStr for Tile {
    type Err = ParseError;

    /// Parse `"7G"` style notation: digits immediately followed by one color
    /// letter from `R B G Y`.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(ParseError::BadNumber(s.to_string()));
        }
        let number: u16 = digits
            .parse()
            .map_err(|_| ParseError::BadNumber(s.to_string()))?;
        if !(1..=13).contains(&number) {
            return Err(ParseError::NumberRange(number));
        }
        let mut rest = s[digits.len()..].chars();
        let color_char = rest
            .next()
            .ok_or_else(|| ParseError::MissingColor(s.to_string()))?;
        let color = Color::from_letter(color_char).ok_or(ParseError::BadColor(color_char))?;
        if rest.next().is_some() {
            return Err(ParseError::TrailingInput(s.to_string()));
        }
        Ok(Tile::new(number as u8, color))
    }
}

/// An ordered cluster of tiles sitting together on the table.
///
/// Tiles are kept in ascending number order; `insert_sorted` maintains the
/// invariant, while `push_front`/`push_back` are reserved for adjacent-number
/// extension where the caller already guarantees order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Group {
    tiles: VecDeque<Tile>,
}

impl Group {
    pub fn new() -> Self {
        Group {
            tiles: VecDeque::new(),
        }
    }

    /// A group holding a single tile.
    pub fn singleton(tile: Tile) -> Self {
        let mut g = Group::new();
        g.tiles.push_back(tile);
        g
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn get(&self, index: usize) -> Option<Tile> {
        self.tiles.get(index).copied()
    }

    pub fn first(&self) -> Option<Tile> {
        self.tiles.front().copied()
    }

    pub fn last(&self) -> Option<Tile> {
        self.tiles.back().copied()
    }

    /// Insert keeping ascending number order. Ties go after existing tiles of
    /// the same number, so repeated inserts are stable.
    pub fn insert_sorted(&mut self, tile: Tile) {
        let pos = self
            .tiles
            .iter()
            .position(|t| t.number() > tile.number())
            .unwrap_or(self.tiles.len());
        self.tiles.insert(pos, tile);
    }

    /// Place a tile at the low end without scanning. The caller must know the
    /// tile's number does not exceed the current first tile's.
    pub fn push_front(&mut self, tile: Tile) {
        debug_assert!(self
            .tiles
            .front()
            .map_or(true, |t| tile.number() <= t.number()));
        self.tiles.push_front(tile);
    }

    /// Place a tile at the high end without scanning.
    pub fn push_back(&mut self, tile: Tile) {
        debug_assert!(self
            .tiles
            .back()
            .map_or(true, |t| tile.number() >= t.number()));
        self.tiles.push_back(tile);
    }

    /// Remove the tile at `index`.
    ///
    /// Removing from the middle leaves a positional hole, so the group is
    /// partitioned: tiles before the removed slot stay here, tiles after it
    /// come back as a new group. Head and tail removals return no split.
    pub fn remove_at(&mut self, index: usize) -> Option<(Tile, Option<Group>)> {
        debug_assert!(index < self.tiles.len(), "remove_at out of range");
        if index >= self.tiles.len() {
            return None;
        }
        if index == 0 {
            return Some((self.tiles.pop_front().unwrap(), None));
        }
        if index == self.tiles.len() - 1 {
            return Some((self.tiles.pop_back().unwrap(), None));
        }
        let suffix: VecDeque<Tile> = self.tiles.split_off(index + 1);
        let removed = self.tiles.pop_back().unwrap();
        Some((removed, Some(Group { tiles: suffix })))
    }
}

impl FromIterator<Tile> for Group {
    fn from_iter<I: IntoIterator<Item = Tile>>(iter: I) -> Self {
        Group {
            tiles: iter.into_iter().collect(),
        }
    }
}

impl FromStr for Group {
    type Err = ParseError;

    /// Parse a space-separated tile list: `"1R 2R 3R"`.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let mut group = Group::new();
        for token in s.split_whitespace() {
            group.tiles.push_back(token.parse()?);
        }
        if group.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(group)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tile) in self.tiles.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", tile)?;
        }
        Ok(())
    }
}

/// One snapshot of everything on the table: an ordered list of groups.
///
/// Group order carries no game meaning but stays stable (insertion order) so
/// traversal and tie-breaking are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    groups: Vec<Group>,
}

impl Table {
    pub fn new() -> Self {
        Table { groups: Vec::new() }
    }

    pub fn push_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_mut(&mut self, index: usize) -> &mut Group {
        &mut self.groups[index]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn tile_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Remove the tile at `(group_index, tile_index)`.
    ///
    /// If the removal splits the group, the suffix is inserted directly after
    /// the source group and the second return value is `true` (callers that
    /// hold group indices past the source must shift them by one).
    /// Empty groups are left in place; call [`Table::prune_empty`] once the
    /// whole move has been applied.
    pub fn remove_tile(&mut self, group_index: usize, tile_index: usize) -> (Tile, bool) {
        let (tile, suffix) = self.groups[group_index]
            .remove_at(tile_index)
            .expect("tile index out of range");
        match suffix {
            Some(rest) => {
                self.groups.insert(group_index + 1, rest);
                (tile, true)
            }
            None => (tile, false),
        }
    }

    /// Drop all empty groups, preserving the order of the rest.
    pub fn prune_empty(&mut self) {
        self.groups.retain(|g| !g.is_empty());
    }

    /// Order-insensitive fingerprint of the table contents, for visited-state
    /// deduplication. Two tables that hold the same groups in a different
    /// order (or with differently ordered color ties) share a key.
    pub fn canonical_key(&self) -> Vec<Vec<Tile>> {
        let mut key: Vec<Vec<Tile>> = self
            .groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| {
                let mut tiles: Vec<Tile> = g.tiles().copied().collect();
                tiles.sort_unstable();
                tiles
            })
            .collect();
        key.sort_unstable();
        key
    }
}

impl FromStr for Table {
    type Err = ParseError;

    /// Parse a comma-separated group list: `"1R 2R 3R, 5B 5G 5Y"`.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let mut table = Table::new();
        for part in s.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            table.push_group(part.parse()?);
        }
        Ok(table)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", group)?;
        }
        Ok(())
    }
}

/// The player's tiles, in the order they were acquired.
///
/// Order matters to the driver: the solver tries hand tiles front to back and
/// reports the first one that can be legally worked onto the table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    pub fn new() -> Self {
        Hand { tiles: Vec::new() }
    }

    pub fn add(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Deal a hand of `count` tiles from a fresh shuffled double deck.
    pub fn deal<R: Rng>(rng: &mut R, count: usize) -> Hand {
        let mut deck = double_deck();
        deck.shuffle(rng);
        deck.truncate(count);
        Hand { tiles: deck }
    }
}

impl FromStr for Hand {
    type Err = ParseError;

    /// Parse a space-separated tile list: `"4R 11B 7G"`.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let mut hand = Hand::new();
        for token in s.split_whitespace() {
            hand.add(token.parse()?);
        }
        if hand.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(hand)
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tile) in self.tiles.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", tile)?;
        }
        Ok(())
    }
}

/// The full two-deck tile pool: two copies of every number/color pairing,
/// 104 tiles in all.
pub fn double_deck() -> Vec<Tile> {
    let mut deck = Vec::with_capacity(104);
    for _ in 0..2 {
        for color in Color::ALL {
            for number in 1..=13 {
                deck.push(Tile::new(number, color));
            }
        }
    }
    deck
}
