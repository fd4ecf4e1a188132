//! Part shapes, load directions and derived geometric quantities.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outer envelope of the part being optimised.
///
/// Unrecognised shape tags are kept verbatim in [`Shape::Other`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Shape {
    /// Circular cylinder described by diameter and height.
    Cylinder,
    /// Rectangular block described by length, width and height.
    Box,
    /// Sphere.
    Sphere,
    /// Any other shape tag.
    Other(String),
}

impl Shape {
    /// Classify a free-form shape tag.
    ///
    /// # Examples
    /// ```
    /// use topobrief::Shape;
    ///
    /// assert_eq!(Shape::from_tag("Cylindre"), Shape::Cylinder);
    /// assert_eq!(Shape::from_tag("Torus"), Shape::Other("Torus".into()));
    /// ```
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let lower = tag.to_lowercase();
        if lower.contains("cylind") {
            Shape::Cylinder
        } else if lower.contains("box") {
            Shape::Box
        } else if lower.contains("sphere") || lower.contains("sphère") {
            Shape::Sphere
        } else {
            Shape::Other(tag.to_string())
        }
    }

    /// Envelope volume in cubic millimetres, rounded to the nearest unit.
    ///
    /// Cylinders use `dimensions[0]` as diameter and `dimensions[1]` as height.
    /// Boxes multiply up to three dimensions, repeating the second when the
    /// third is missing. Every other shape yields zero.
    ///
    /// # Examples
    /// ```
    /// use topobrief::Shape;
    ///
    /// assert_eq!(Shape::Box.volume(&[80.0, 60.0, 20.0]), 96_000.0);
    /// assert_eq!(Shape::Box.volume(&[10.0, 20.0]), 4_000.0);
    /// assert_eq!(Shape::Sphere.volume(&[50.0, 50.0]), 0.0);
    /// ```
    #[must_use]
    pub fn volume(&self, dimensions: &[f64]) -> f64 {
        let volume = match (self, dimensions) {
            (Shape::Cylinder, [diameter, height, ..]) => {
                let radius = diameter / 2.0;
                PI * radius * radius * height
            }
            (Shape::Box, [length, width, rest @ ..]) => {
                let height = rest.first().copied().unwrap_or(*width);
                length * width * height
            }
            _ => 0.0,
        };
        volume.round()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Cylinder => f.write_str("Cylinder"),
            Shape::Box => f.write_str("Box"),
            Shape::Sphere => f.write_str("Sphere"),
            Shape::Other(tag) => f.write_str(tag),
        }
    }
}

impl From<String> for Shape {
    fn from(value: String) -> Self {
        Shape::from_tag(&value)
    }
}

impl From<Shape> for String {
    fn from(value: Shape) -> Self {
        value.to_string()
    }
}

/// One of the six signed cardinal axes a load can act along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadDirection {
    /// Positive X.
    #[serde(rename = "+X")]
    PosX,
    /// Negative X.
    #[serde(rename = "-X")]
    NegX,
    /// Positive Y.
    #[serde(rename = "+Y")]
    PosY,
    /// Negative Y.
    #[serde(rename = "-Y")]
    NegY,
    /// Positive Z.
    #[serde(rename = "+Z")]
    PosZ,
    /// Negative Z, the gravity-like default.
    #[default]
    #[serde(rename = "-Z")]
    NegZ,
}

impl LoadDirection {
    /// Unit vector pointing along this direction.
    #[must_use]
    pub const fn unit_vector(self) -> [f64; 3] {
        match self {
            LoadDirection::PosX => [1.0, 0.0, 0.0],
            LoadDirection::NegX => [-1.0, 0.0, 0.0],
            LoadDirection::PosY => [0.0, 1.0, 0.0],
            LoadDirection::NegY => [0.0, -1.0, 0.0],
            LoadDirection::PosZ => [0.0, 0.0, 1.0],
            LoadDirection::NegZ => [0.0, 0.0, -1.0],
        }
    }

    /// Wire label, e.g. `"-Z"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LoadDirection::PosX => "+X",
            LoadDirection::NegX => "-X",
            LoadDirection::PosY => "+Y",
            LoadDirection::NegY => "-Y",
            LoadDirection::PosZ => "+Z",
            LoadDirection::NegZ => "-Z",
        }
    }
}

impl fmt::Display for LoadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a token is not a signed cardinal axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDirection;

impl FromStr for LoadDirection {
    type Err = UnknownDirection;

    /// Parse `X`, `+x`, `-Z` and so on. A missing sign means positive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_uppercase();
        let (negative, axis) = match token.strip_prefix('-') {
            Some(axis) => (true, axis),
            None => (false, token.strip_prefix('+').unwrap_or(&token)),
        };
        match (negative, axis) {
            (false, "X") => Ok(LoadDirection::PosX),
            (true, "X") => Ok(LoadDirection::NegX),
            (false, "Y") => Ok(LoadDirection::PosY),
            (true, "Y") => Ok(LoadDirection::NegY),
            (false, "Z") => Ok(LoadDirection::PosZ),
            (true, "Z") => Ok(LoadDirection::NegZ),
            _ => Err(UnknownDirection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_volume_uses_diameter_and_height() {
        let volume = Shape::Cylinder.volume(&[100.0, 100.0, 20.0]);
        assert_eq!(volume, (PI * 50.0 * 50.0 * 100.0).round());
    }

    #[test]
    fn shapes_without_enough_dimensions_have_no_volume() {
        assert_eq!(Shape::Cylinder.volume(&[100.0]), 0.0);
        assert_eq!(Shape::Other("Torus".into()).volume(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn shape_tags_serialize_verbatim() {
        let json = serde_json::to_string(&Shape::Other("Lattice".into())).expect("serializes");
        assert_eq!(json, "\"Lattice\"");
        let shape: Shape = serde_json::from_str("\"box\"").expect("deserializes");
        assert_eq!(shape, Shape::Box);
    }

    #[test]
    fn directions_parse_with_and_without_sign() {
        assert_eq!("-z".parse(), Ok(LoadDirection::NegZ));
        assert_eq!("+Y".parse(), Ok(LoadDirection::PosY));
        assert_eq!("x".parse(), Ok(LoadDirection::PosX));
        assert_eq!("W".parse::<LoadDirection>(), Err(UnknownDirection));
        assert_eq!(LoadDirection::NegY.unit_vector(), [0.0, -1.0, 0.0]);
    }

    #[test]
    fn direction_serializes_as_label() {
        let json = serde_json::to_string(&LoadDirection::PosZ).expect("serializes");
        assert_eq!(json, "\"+Z\"");
    }
}
