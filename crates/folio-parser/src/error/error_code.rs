//! Error codes for the Folio diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Syntax errors
//! - `E2xx` - Type errors
//! - `E3xx` - Validation errors
//! - `E4xx` - Reference errors

use std::fmt;

/// Broad class of a diagnostic, derived from its [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Type,
    Validation,
    Reference,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Reference => "ReferenceError",
        };
        f.write_str(name)
    }
}

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    E001,

    /// Unexpected character.
    E002,

    /// Invalid escape sequence.
    ///
    /// Valid escapes are: `\n`, `\r`, `\t`, `\\`, `\'`, `\"`, `\0`, `\u{...}`.
    E003,

    /// Invalid unicode escape format.
    E004,

    /// Invalid unicode codepoint.
    ///
    /// Valid codepoints are 0x0000-0xD7FF and 0xE000-0x10FFFF.
    E005,

    /// Empty unicode escape `\u{}`.
    E006,

    /// Unterminated block comment.
    E007,

    /// Integer literal does not fit in 64 bits.
    E008,

    // =========================================================================
    // Syntax Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    E100,

    /// Incomplete input.
    E101,

    /// Unterminated top-level block.
    ///
    /// A block keyword opened a block that is never closed. Nothing after it
    /// can be segmented, so the rest of the document is dropped.
    E102,

    // =========================================================================
    // Type Errors (E2xx)
    // =========================================================================
    /// A name is declared more than once.
    E200,

    /// Reference to a type that is not declared.
    E201,

    /// Type definitions depend on each other in a cycle.
    E202,

    /// A literal does not match the type it is bound to.
    E203,

    /// A struct field or enum member is declared twice.
    E204,

    /// An enum declares no members.
    E205,

    /// A map key type other than `string` or an enum.
    E206,

    /// A declaration does not follow naming conventions.
    E207,

    /// A data instance or table names a type that is not a struct.
    E208,

    // =========================================================================
    // Validation Errors (E3xx)
    // =========================================================================
    /// A mandatory field is missing from a data instance.
    E300,

    /// A data instance sets a field the struct does not declare.
    E301,

    /// An enum-typed value is not a member of the enum.
    E302,

    /// A table row has the wrong number of cells.
    E303,

    /// A table cell does not match its column type.
    E304,

    /// A node is declared in more than one cluster.
    E305,

    /// An edge references a node that is not declared.
    E306,

    /// A node, cluster, edge or style name is declared twice in one scope.
    E307,

    /// An attribute key is not part of the vocabulary.
    E308,

    /// An attribute value has the wrong type or an unknown keyword.
    E309,

    /// A cluster's member ranks are not contiguous.
    E310,

    /// A `@range` or `@length` constraint is violated.
    E311,

    /// A graph mixes `->` and `--` edges under a policy that rejects it.
    E312,

    /// Value nesting exceeds the validation depth limit.
    E313,

    // =========================================================================
    // Reference Errors (E4xx)
    // =========================================================================
    /// Reference to an undefined `let` variable.
    E400,

    /// Reference to an undefined style preset.
    E401,

    /// Qualified reference to an enum member that does not exist.
    E402,
}

impl ErrorCode {
    /// Returns the string representation of the error code (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            ErrorCode::E007 => "E007",
            ErrorCode::E008 => "E008",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
            ErrorCode::E305 => "E305",
            ErrorCode::E306 => "E306",
            ErrorCode::E307 => "E307",
            ErrorCode::E308 => "E308",
            ErrorCode::E309 => "E309",
            ErrorCode::E310 => "E310",
            ErrorCode::E311 => "E311",
            ErrorCode::E312 => "E312",
            ErrorCode::E313 => "E313",
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "invalid escape sequence",
            ErrorCode::E004 => "invalid unicode escape",
            ErrorCode::E005 => "invalid unicode codepoint",
            ErrorCode::E006 => "empty unicode escape",
            ErrorCode::E007 => "unterminated block comment",
            ErrorCode::E008 => "integer literal out of range",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "unterminated block",
            ErrorCode::E200 => "duplicate definition",
            ErrorCode::E201 => "unknown type",
            ErrorCode::E202 => "cyclic definition",
            ErrorCode::E203 => "incompatible literal",
            ErrorCode::E204 => "duplicate member",
            ErrorCode::E205 => "empty enum",
            ErrorCode::E206 => "invalid map key type",
            ErrorCode::E207 => "naming convention",
            ErrorCode::E208 => "expected struct type",
            ErrorCode::E300 => "missing field",
            ErrorCode::E301 => "unknown field",
            ErrorCode::E302 => "invalid enum value",
            ErrorCode::E303 => "row arity mismatch",
            ErrorCode::E304 => "cell type mismatch",
            ErrorCode::E305 => "duplicate node cluster membership",
            ErrorCode::E306 => "undefined node",
            ErrorCode::E307 => "duplicate name",
            ErrorCode::E308 => "unknown attribute",
            ErrorCode::E309 => "invalid attribute value",
            ErrorCode::E310 => "disjoint cluster ranks",
            ErrorCode::E311 => "constraint violation",
            ErrorCode::E312 => "mixed edge kinds",
            ErrorCode::E313 => "nesting too deep",
            ErrorCode::E400 => "undefined variable",
            ErrorCode::E401 => "undefined style",
            ErrorCode::E402 => "undefined enum member",
        }
    }

    /// Name of the specific error, as used in `Kind(Name)` notation.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "UnterminatedString",
            ErrorCode::E002 => "UnexpectedCharacter",
            ErrorCode::E003 => "InvalidEscape",
            ErrorCode::E004 => "InvalidUnicodeEscape",
            ErrorCode::E005 => "InvalidCodepoint",
            ErrorCode::E006 => "EmptyUnicodeEscape",
            ErrorCode::E007 => "UnterminatedComment",
            ErrorCode::E008 => "IntegerOverflow",
            ErrorCode::E100 => "UnexpectedToken",
            ErrorCode::E101 => "IncompleteInput",
            ErrorCode::E102 => "UnterminatedBlock",
            ErrorCode::E200 => "DuplicateDefinition",
            ErrorCode::E201 => "UnknownType",
            ErrorCode::E202 => "CyclicDefinition",
            ErrorCode::E203 => "IncompatibleLiteral",
            ErrorCode::E204 => "DuplicateMember",
            ErrorCode::E205 => "EmptyEnum",
            ErrorCode::E206 => "InvalidMapKey",
            ErrorCode::E207 => "NamingConvention",
            ErrorCode::E208 => "ExpectedStruct",
            ErrorCode::E300 => "MissingField",
            ErrorCode::E301 => "UnknownField",
            ErrorCode::E302 => "InvalidEnumValue",
            ErrorCode::E303 => "RowArityMismatch",
            ErrorCode::E304 => "CellTypeMismatch",
            ErrorCode::E305 => "DuplicateNodeClusterMembership",
            ErrorCode::E306 => "UndefinedNode",
            ErrorCode::E307 => "DuplicateName",
            ErrorCode::E308 => "UnknownAttribute",
            ErrorCode::E309 => "InvalidAttributeValue",
            ErrorCode::E310 => "DisjointClusterRanks",
            ErrorCode::E311 => "ConstraintViolation",
            ErrorCode::E312 => "MixedEdgeKinds",
            ErrorCode::E313 => "NestingTooDeep",
            ErrorCode::E400 => "UndefinedVariable",
            ErrorCode::E401 => "UndefinedStyle",
            ErrorCode::E402 => "UndefinedEnumMember",
        }
    }

    /// The class of error this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self.as_str().as_bytes()[1] {
            b'0' | b'1' => ErrorKind::Syntax,
            b'2' => ErrorKind::Type,
            b'3' => ErrorKind::Validation,
            _ => ErrorKind::Reference,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E102.to_string(), "E102");
        assert_eq!(ErrorCode::E300.to_string(), "E300");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E001.description(), "unterminated string literal");
        assert_eq!(ErrorCode::E202.description(), "cyclic definition");
        assert_eq!(ErrorCode::E306.description(), "undefined node");
    }

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::E002.kind(), ErrorKind::Syntax);
        assert_eq!(ErrorCode::E102.kind(), ErrorKind::Syntax);
        assert_eq!(ErrorCode::E200.kind(), ErrorKind::Type);
        assert_eq!(ErrorCode::E305.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::E400.kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            format!("{}({})", ErrorCode::E300.kind(), ErrorCode::E300.name()),
            "ValidationError(MissingField)"
        );
    }
}
