use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document as exchanged with the backend.
pub type Document = Map<String, Value>;

/// Accent colors offered by the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorSegment {
    #[default]
    Blue,
    Black,
    Red,
}

impl ColorSegment {
    pub fn hex(&self) -> &'static str {
        match self {
            ColorSegment::Blue => "#1AA7ECFF",
            ColorSegment::Black => "#000000FF",
            ColorSegment::Red => "#B22222FF",
        }
    }

    /// Segment index shown in the picker.
    pub fn code(&self) -> u8 {
        match self {
            ColorSegment::Blue => 0,
            ColorSegment::Black => 1,
            ColorSegment::Red => 2,
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        [ColorSegment::Blue, ColorSegment::Black, ColorSegment::Red]
            .into_iter()
            .find(|segment| segment.hex().eq_ignore_ascii_case(hex))
    }
}

/// Server-confirmed per-user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomData {
    pub color: Option<String>,
    #[serde(rename = "fullImage")]
    pub full_image: bool,
}

impl CustomData {
    pub fn new(color: impl Into<String>, full_image: bool) -> Self {
        Self {
            color: Some(color.into()),
            full_image,
        }
    }

    /// Reads the known fields out of a custom-data document. Missing or
    /// mistyped fields keep their defaults.
    pub fn from_document(document: &Document) -> Self {
        Self {
            color: document
                .get("color")
                .and_then(Value::as_str)
                .map(str::to_string),
            full_image: document
                .get("fullImage")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        if let Some(color) = &self.color {
            document.insert("color".into(), Value::String(color.clone()));
        }
        document.insert("fullImage".into(), Value::Bool(self.full_image));
        document
    }

    /// The picker segment for the stored color, blue when unset or unknown.
    pub fn color_segment(&self) -> ColorSegment {
        self.color
            .as_deref()
            .and_then(ColorSegment::from_hex)
            .unwrap_or_default()
    }
}
