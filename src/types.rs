use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which of the three input sheets a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Template,
    Key,
    Student,
}

impl SheetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetKind::Template => "template",
            SheetKind::Key => "key",
            SheetKind::Student => "student",
        }
    }
}

impl Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SheetKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "template" => Ok(SheetKind::Template),
            "key" => Ok(SheetKind::Key),
            "student" => Ok(SheetKind::Student),
            _ => Err(format!("Invalid sheet kind: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for SheetKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SheetKind::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl Serialize for SheetKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A detected bubble, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub x: u32,
    pub y: u32,
    pub r: u32,
}

impl Circle {
    pub fn new(x: u32, y: u32, r: u32) -> Self {
        Self { x, y, r }
    }
}

/// A circle together with the binary pixel counts inside its disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleFeature {
    pub x: u32,
    pub y: u32,
    pub r: u32,
    pub black_count: u32,
    pub white_count: u32,
}

impl BubbleFeature {
    pub fn circle(&self) -> Circle {
        Circle::new(self.x, self.y, self.r)
    }
}

/// Bubbles sharing a line on the sheet, ordered left to right.
pub type Row = Vec<BubbleFeature>;

/// The detection configuration that reproduced the expected bubble count on
/// the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationParams {
    pub sensitivity: u32,
    pub separation: u32,
    pub radius_estimate: u32,
}

/// One-hot (or all-zero) marking of a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVector(Vec<u8>);

impl AnswerVector {
    pub fn blank(options: usize) -> Self {
        Self(vec![0; options])
    }

    pub fn marked(options: usize, index: usize) -> Self {
        let mut values = vec![0; options];
        values[index] = 1;
        Self(values)
    }

    #[cfg(test)]
    pub fn values(&self) -> &[u8] {
        &self.0
    }

    pub fn marked_index(&self) -> Option<usize> {
        self.0.iter().position(|v| *v == 1)
    }
}

impl From<Vec<u8>> for AnswerVector {
    fn from(values: Vec<u8>) -> Self {
        Self(values)
    }
}

impl Display for AnswerVector {
    /// Renders the marked option as a letter (`A`, `B`, ...) or `-` if blank.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.marked_index() {
            Some(index) if index < 26 => write!(f, "{}", (b'A' + index as u8) as char),
            Some(index) => write!(f, "#{}", index + 1),
            None => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub total: u32,
    pub per_question: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_kind_serde() {
        let json = serde_json::to_string(&SheetKind::Student).unwrap();
        assert_eq!(json, "\"student\"");
        let kind: SheetKind = serde_json::from_str("\"key\"").unwrap();
        assert_eq!(kind, SheetKind::Key);
        assert!(serde_json::from_str::<SheetKind>("\"answer\"").is_err());
    }

    #[test]
    fn test_bubble_feature_field_names() {
        let feature = BubbleFeature {
            x: 1,
            y: 2,
            r: 3,
            black_count: 4,
            white_count: 5,
        };
        let value = serde_json::to_value(feature).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"x": 1, "y": 2, "r": 3, "blackCount": 4, "whiteCount": 5})
        );
    }

    #[test]
    fn test_answer_vector_display() {
        assert_eq!(AnswerVector::marked(4, 2).to_string(), "C");
        assert_eq!(AnswerVector::blank(4).to_string(), "-");
        assert_eq!(AnswerVector::marked(4, 0).marked_index(), Some(0));
    }
}
