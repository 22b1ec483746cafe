use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::board::Color;

/// Occupancy matrix of a piece: an ordered sequence of ordered rows of
/// booleans.
///
/// Shapes are immutable; rotation produces a new shape. A shape's canonical
/// rotation set is the sequence of distinct shapes reachable by repeated 90°
/// clockwise rotation, with duplicates collapsed (rotationally symmetric
/// shapes have fewer than four entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceShape {
    rows: Vec<Vec<bool>>,
}

impl Serialize for PieceShape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: rows of '#'/'.' joined by '/' (e.g. "##./.##")
        let mut s = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                s.push('/');
            }
            for &cell in row {
                s.push(if cell { '#' } else { '.' });
            }
        }
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for PieceShape {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let rows: Vec<Vec<bool>> = s
            .split('/')
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '#' => Ok(true),
                        '.' => Ok(false),
                        _ => Err(serde::de::Error::custom(format!(
                            "invalid shape character: {c}"
                        ))),
                    })
                    .collect()
            })
            .collect::<Result<_, D::Error>>()?;
        if let Some(first) = rows.first() {
            if rows.iter().any(|r| r.len() != first.len()) {
                return Err(serde::de::Error::custom("inconsistent shape row length"));
            }
        }
        Ok(PieceShape { rows })
    }
}

impl PieceShape {
    #[must_use]
    pub fn new(rows: Vec<Vec<bool>>) -> Self {
        if let Some(first) = rows.first() {
            assert!(
                rows.iter().all(|r| r.len() == first.len()),
                "shape rows must have uniform length"
            );
        }
        Self { rows }
    }

    /// Builds a shape from an ASCII diagram (`#` occupied, `.` empty).
    ///
    /// # Panics
    ///
    /// Panics on unknown characters or ragged rows.
    #[must_use]
    pub fn from_ascii(s: &str) -> Self {
        let rows: Vec<Vec<bool>> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '#' => true,
                        '.' => false,
                        _ => panic!("unknown shape character: {c}"),
                    })
                    .collect()
            })
            .collect();
        Self::new(rows)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_occupied(&self, dx: usize, dy: usize) -> bool {
        self.rows[dy][dx]
    }

    /// Returns an iterator of `(dx, dy)` offsets of occupied cells, row-major.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(dy, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(dx, &cell)| cell.then_some((dx, dy)))
        })
    }

    /// Returns the shape rotated 90° clockwise.
    #[must_use]
    pub fn rotated_right(&self) -> Self {
        let (w, h) = (self.width(), self.height());
        let mut rows = vec![vec![false; h]; w];
        for (dx, dy) in self.occupied_cells() {
            rows[dx][h - 1 - dy] = true;
        }
        Self { rows }
    }

    /// Canonical rotation set: distinct shapes under repeated 90° rotation.
    ///
    /// Index 0 is always `self`; the order follows successive clockwise
    /// rotations. Duplicates (rotational symmetry) are collapsed.
    #[must_use]
    pub fn rotations(&self) -> ArrayVec<PieceShape, 4> {
        let mut rotations = ArrayVec::new();
        rotations.push(self.clone());
        let mut prev = self.clone();
        for _ in 0..3 {
            let next = prev.rotated_right();
            if rotations.contains(&next) {
                break;
            }
            rotations.push(next.clone());
            prev = next;
        }
        rotations
    }

    /// Compact occupancy signature, used for piece-identity keys.
    ///
    /// Folds the matrix dimensions and cell bits into a single `u64`. Shapes
    /// with equal dimensions and occupancy produce equal signatures.
    #[must_use]
    pub fn signature(&self) -> u64 {
        let mut sig = ((self.width() as u64) << 8) | self.height() as u64;
        for (dx, dy) in self.occupied_cells() {
            sig = sig
                .rotate_left(7)
                .wrapping_mul(0x100_0000_01b3)
                .wrapping_add(((dx as u64) << 16) | (dy as u64 + 1));
        }
        sig
    }
}

/// The active falling piece: a shape, a color, and a top-left anchor.
///
/// The anchor may be negative while the piece is above or partially beside
/// the visible board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub shape: PieceShape,
    pub color: Color,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    #[must_use]
    pub fn new(shape: PieceShape, color: Color, x: i32, y: i32) -> Self {
        Self { shape, color, x, y }
    }

    /// Canonical rotation set of the piece's shape.
    #[must_use]
    pub fn rotations(&self) -> ArrayVec<PieceShape, 4> {
        self.shape.rotations()
    }
}

/// An upcoming piece in the queue: shape and color, no position yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedPiece {
    pub shape: PieceShape,
    pub color: Color,
}

impl QueuedPiece {
    #[must_use]
    pub fn new(shape: PieceShape, color: Color) -> Self {
        Self { shape, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> PieceShape {
        PieceShape::from_ascii(
            "
            ##
            ##
            ",
        )
    }

    fn bar() -> PieceShape {
        PieceShape::from_ascii("####")
    }

    fn ell() -> PieceShape {
        PieceShape::from_ascii(
            "
            #.
            #.
            ##
            ",
        )
    }

    #[test]
    fn test_rotation_set_collapses_symmetry() {
        assert_eq!(square().rotations().len(), 1);
        assert_eq!(bar().rotations().len(), 2);
        assert_eq!(ell().rotations().len(), 4);
    }

    #[test]
    fn test_rotation_set_closed_under_rotation() {
        for shape in [square(), bar(), ell()] {
            let rotations = shape.rotations();
            for r in &rotations {
                assert!(rotations.contains(&r.rotated_right()) || {
                    // Rotating the last entry wraps around to the first.
                    r.rotated_right() == rotations[0]
                });
            }
        }
    }

    #[test]
    fn test_rotation_set_has_no_duplicates() {
        for shape in [square(), bar(), ell()] {
            let rotations = shape.rotations();
            for (i, a) in rotations.iter().enumerate() {
                for b in rotations.iter().skip(i + 1) {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_rotated_right_geometry() {
        let rotated = bar().rotated_right();
        assert_eq!(rotated.width(), 1);
        assert_eq!(rotated.height(), 4);
        assert_eq!(rotated, PieceShape::from_ascii("#\n#\n#\n#"));
    }

    #[test]
    fn test_shape_serde_round_trip() {
        let shape = ell();
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(json, "\"#./#./##\"");
        let parsed: PieceShape = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, shape);
    }

    #[test]
    fn test_shape_deserialize_errors() {
        assert!(serde_json::from_str::<PieceShape>("\"#x\"").is_err());
        assert!(serde_json::from_str::<PieceShape>("\"##/#\"").is_err());
    }

    #[test]
    fn test_signature_distinguishes_rotations() {
        let rotations = ell().rotations();
        let mut sigs: Vec<u64> = rotations.iter().map(PieceShape::signature).collect();
        sigs.sort_unstable();
        sigs.dedup();
        assert_eq!(sigs.len(), rotations.len());
    }

    #[test]
    fn test_signature_stable_for_equal_shapes() {
        assert_eq!(bar().signature(), PieceShape::from_ascii("####").signature());
    }
}
