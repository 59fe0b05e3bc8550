//! Directions, rotations and mirrors about the vertical axis.

use crate::coords::BlockPos;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an enum name read from persisted data is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Error for `value` not naming any variant of `kind`.
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// East/west.
    X,
    /// Up/down.
    Y,
    /// North/south.
    Z,
}

/// One of the six unit directions.
///
/// Declaration order matches the 3D data value used by persisted data
/// (`Down = 0` .. `East = 5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// -Y
    Down,
    /// +Y
    Up,
    /// -Z
    North,
    /// +Z
    South,
    /// -X
    West,
    /// +X
    East,
}

impl Direction {
    /// All directions in 3D data value order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Horizontal directions in clockwise order starting at north.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Index in [`Direction::ALL`].
    pub const fn data_3d(self) -> usize {
        self as usize
    }

    /// Inverse of [`Direction::data_3d`].
    pub const fn from_3d(value: usize) -> Direction {
        Self::ALL[value % 6]
    }

    /// Horizontal data value (`South = 0, West = 1, North = 2, East = 3`), `-1` when vertical.
    pub const fn data_2d(self) -> i32 {
        match self {
            Direction::South => 0,
            Direction::West => 1,
            Direction::North => 2,
            Direction::East => 3,
            Direction::Up | Direction::Down => -1,
        }
    }

    /// Inverse of [`Direction::data_2d`]; the value is taken modulo 4.
    pub const fn from_2d(value: i32) -> Direction {
        match value.rem_euclid(4) {
            0 => Direction::South,
            1 => Direction::West,
            2 => Direction::North,
            _ => Direction::East,
        }
    }

    /// Pick a uniformly random horizontal direction.
    pub fn random_horizontal(rng: &mut dyn RandomSource) -> Direction {
        Self::HORIZONTAL[rng.next_int(4) as usize]
    }

    /// True for north, south, east and west.
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Up | Direction::Down)
    }

    /// Axis this direction runs along.
    pub const fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
            Direction::East | Direction::West => Axis::X,
        }
    }

    /// Unit step along X.
    pub const fn step_x(self) -> i32 {
        match self {
            Direction::West => -1,
            Direction::East => 1,
            _ => 0,
        }
    }

    /// Unit step along Y.
    pub const fn step_y(self) -> i32 {
        match self {
            Direction::Down => -1,
            Direction::Up => 1,
            _ => 0,
        }
    }

    /// Unit step along Z.
    pub const fn step_z(self) -> i32 {
        match self {
            Direction::North => -1,
            Direction::South => 1,
            _ => 0,
        }
    }

    /// Reverse direction.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Next horizontal direction clockwise (seen from above). Vertical directions are unchanged.
    pub const fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            other => other,
        }
    }

    /// Next horizontal direction counter-clockwise. Vertical directions are unchanged.
    pub const fn counter_clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
            other => other,
        }
    }

    /// Lowercase name used in persisted data.
    pub const fn name(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dir| dir.name() == s)
            .ok_or_else(|| ParseEnumError::new("direction", s))
    }
}

/// Rotation about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// Identity.
    #[default]
    None,
    /// Quarter turn clockwise.
    Clockwise90,
    /// Half turn.
    Clockwise180,
    /// Quarter turn counter-clockwise.
    CounterClockwise90,
}

impl Rotation {
    /// All rotations in quarter-turn order.
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    const fn quarter_turns(self) -> usize {
        self as usize
    }

    /// Pick a uniformly random rotation.
    pub fn random(rng: &mut dyn RandomSource) -> Rotation {
        Self::ALL[rng.next_int(4) as usize]
    }

    /// Compose two rotations.
    pub const fn rotated(self, other: Rotation) -> Rotation {
        Self::ALL[(self.quarter_turns() + other.quarter_turns()) % 4]
    }

    /// Rotate a direction. Vertical directions are unchanged.
    pub const fn rotate(self, dir: Direction) -> Direction {
        match self {
            Rotation::None => dir,
            Rotation::Clockwise90 => dir.clockwise(),
            Rotation::Clockwise180 => dir.opposite_horizontal(),
            Rotation::CounterClockwise90 => dir.counter_clockwise(),
        }
    }

    /// Rotate a position around `pivot` (same Y).
    pub const fn transform(self, pos: BlockPos, pivot: BlockPos) -> BlockPos {
        let (x, y, z) = (pos.x, pos.y, pos.z);
        let (px, pz) = (pivot.x, pivot.z);
        match self {
            Rotation::None => pos,
            Rotation::Clockwise90 => BlockPos::new(px + pz - z, y, pz - px + x),
            Rotation::Clockwise180 => BlockPos::new(px + px - x, y, pz + pz - z),
            Rotation::CounterClockwise90 => BlockPos::new(px - pz + z, y, pz + px - x),
        }
    }

    /// Lowercase name used in persisted data.
    pub const fn name(self) -> &'static str {
        match self {
            Rotation::None => "none",
            Rotation::Clockwise90 => "clockwise_90",
            Rotation::Clockwise180 => "180",
            Rotation::CounterClockwise90 => "counterclockwise_90",
        }
    }
}

impl FromStr for Rotation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rot| rot.name() == s)
            .ok_or_else(|| ParseEnumError::new("rotation", s))
    }
}

/// Mirror across a vertical plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mirror {
    /// Identity.
    #[default]
    None,
    /// Flip Z (north <-> south).
    LeftRight,
    /// Flip X (east <-> west).
    FrontBack,
}

impl Mirror {
    /// All mirrors.
    pub const ALL: [Mirror; 3] = [Mirror::None, Mirror::LeftRight, Mirror::FrontBack];

    /// Mirror a direction.
    pub const fn mirror(self, dir: Direction) -> Direction {
        match (self, dir) {
            (Mirror::LeftRight, Direction::North | Direction::South) => dir.opposite(),
            (Mirror::FrontBack, Direction::East | Direction::West) => dir.opposite(),
            _ => dir,
        }
    }

    /// Mirror a position about the origin plane.
    pub const fn transform(self, pos: BlockPos) -> BlockPos {
        match self {
            Mirror::None => pos,
            Mirror::LeftRight => BlockPos::new(pos.x, pos.y, -pos.z),
            Mirror::FrontBack => BlockPos::new(-pos.x, pos.y, pos.z),
        }
    }

    /// Lowercase name used in persisted data.
    pub const fn name(self) -> &'static str {
        match self {
            Mirror::None => "none",
            Mirror::LeftRight => "left_right",
            Mirror::FrontBack => "front_back",
        }
    }
}

impl FromStr for Mirror {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mirror| mirror.name() == s)
            .ok_or_else(|| ParseEnumError::new("mirror", s))
    }
}

impl Direction {
    const fn opposite_horizontal(self) -> Direction {
        if self.is_horizontal() {
            self.opposite()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_values_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_3d(dir.data_3d()), dir);
        }
        for dir in Direction::HORIZONTAL {
            assert_eq!(Direction::from_2d(dir.data_2d()), dir);
        }
        assert_eq!(Direction::Up.data_2d(), -1);
    }

    #[test]
    fn clockwise_cycle_returns_to_start() {
        for dir in Direction::HORIZONTAL {
            assert_eq!(dir.clockwise().clockwise().clockwise().clockwise(), dir);
            assert_eq!(dir.clockwise().counter_clockwise(), dir);
        }
    }

    #[test]
    fn rotation_composition_wraps() {
        assert_eq!(
            Rotation::CounterClockwise90.rotated(Rotation::Clockwise90),
            Rotation::None
        );
        assert_eq!(
            Rotation::Clockwise180.rotated(Rotation::Clockwise180),
            Rotation::None
        );
        assert_eq!(
            Rotation::Clockwise90.rotated(Rotation::Clockwise90),
            Rotation::Clockwise180
        );
    }

    #[test]
    fn rotation_transform_agrees_with_direction_rotation() {
        for rot in Rotation::ALL {
            for dir in Direction::HORIZONTAL {
                let step = BlockPos::new(dir.step_x(), 0, dir.step_z());
                let rotated = rot.transform(step, BlockPos::ZERO);
                let expected = rot.rotate(dir);
                assert_eq!(
                    rotated,
                    BlockPos::new(expected.step_x(), 0, expected.step_z()),
                    "{rot:?} {dir:?}"
                );
            }
        }
    }

    #[test]
    fn mirror_flips_expected_axis() {
        assert_eq!(Mirror::LeftRight.mirror(Direction::North), Direction::South);
        assert_eq!(Mirror::LeftRight.mirror(Direction::East), Direction::East);
        assert_eq!(Mirror::FrontBack.mirror(Direction::East), Direction::West);
        assert_eq!(
            Mirror::FrontBack.transform(BlockPos::new(2, 1, 3)),
            BlockPos::new(-2, 1, 3)
        );
    }

    #[test]
    fn unknown_rotation_name_is_rejected() {
        assert_eq!("180".parse::<Rotation>(), Ok(Rotation::Clockwise180));
        let err = "sideways".parse::<Rotation>().unwrap_err();
        assert_eq!(err.to_string(), "unknown rotation `sideways`");
    }
}
