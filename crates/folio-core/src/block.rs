//! Block classification shared by the segmenter and the document model.

use std::fmt;

use serde::Serialize;

/// Flavor of a prose block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "prose", rename_all = "lowercase")]
pub enum ProseKind {
    Paragraph,
    /// `#` heading with its level (1-6).
    Heading { level: u8 },
    /// `---`, `***` or `___` on a line of its own.
    Rule,
}

/// Top-level block kinds, one per opening keyword plus prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Prose(ProseKind),
    TypeAlias,
    Struct,
    Enum,
    Const,
    Data,
    Table,
    Diagram,
    Math,
    Config,
    Code,
}

impl BlockKind {
    /// Opening keyword, or `None` for prose.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Prose(_) => None,
            Self::TypeAlias => Some("type"),
            Self::Struct => Some("struct"),
            Self::Enum => Some("enum"),
            Self::Const => Some("const"),
            Self::Data => Some("data"),
            Self::Table => Some("table"),
            Self::Diagram => Some("graph"),
            Self::Math => Some("math"),
            Self::Config => Some("config"),
            Self::Code => Some("code"),
        }
    }

    /// Blocks that end at a `;` instead of a closing brace.
    pub fn ends_with_semicolon(self) -> bool {
        matches!(self, Self::TypeAlias | Self::Const | Self::Table)
    }

    /// Blocks whose body is opaque text where only braces nest.
    pub fn is_opaque(self) -> bool {
        matches!(self, Self::Math | Self::Code)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prose(ProseKind::Paragraph) => f.write_str("paragraph"),
            Self::Prose(ProseKind::Heading { level }) => write!(f, "heading{level}"),
            Self::Prose(ProseKind::Rule) => f.write_str("rule"),
            Self::TypeAlias => f.write_str("type alias"),
            Self::Diagram => f.write_str("diagram"),
            other => f.write_str(other.keyword().unwrap_or("block")),
        }
    }
}
