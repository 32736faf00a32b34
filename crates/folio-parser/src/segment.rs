//! Block segmentation.
//!
//! Splits a document into top-level [`RawBlock`]s before any block grammar
//! runs. A block starts with a keyword at the beginning of a line whose
//! header has the expected shape (`struct Name {`, `type Name =`, ...). Every
//! other line is prose. The segmenter only tracks enough state to find block
//! ends: bracket depth, string literals and comments. Inner grammar is left to
//! the per-block parsers.

use log::{debug, trace};

use folio_core::{
    block::{BlockKind, ProseKind},
    span::Span,
};

use crate::error::{Diagnostic, ErrorCode};

/// One top-level block with its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'src> {
    pub kind: BlockKind,
    /// Span of the whole block, keyword through terminator.
    pub span: Span,
    /// Source text covered by `span`.
    pub text: &'src str,
    /// Header word: the declared name, the data instance's type, the graph
    /// kind, the config name or the code language.
    pub label: Option<&'src str>,
    /// Span between the outermost braces of brace-terminated blocks.
    pub body: Option<Span>,
}

impl<'src> RawBlock<'src> {
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Text between the outermost braces, if the block has a body.
    pub fn body_text(&self) -> Option<&'src str> {
        let body = self.body?;
        let offset = self.span.start();
        self.text.get(body.start() - offset..body.end() - offset)
    }
}

/// Result of [`segment`]: the blocks found and, if the document ends inside
/// an open block, the diagnostic for it.
#[derive(Debug, Clone)]
pub struct Segmentation<'src> {
    pub blocks: Vec<RawBlock<'src>>,
    /// E102 raised for an unterminated block. Nothing after that block's
    /// keyword is segmented.
    pub unterminated: Option<Diagnostic>,
}

/// Split `source` into blocks.
///
/// This never fails outright: an unterminated block stops segmentation and
/// the blocks recovered before it are still returned.
///
/// # Example
///
/// ```
/// # use folio_parser::segment;
/// # use folio_parser::block::BlockKind;
/// let doc = "Intro text.\n\nstruct Point { x: int; y: int; }\n";
/// let segmentation = segment(doc);
/// let kinds: Vec<_> = segmentation.blocks.iter().map(|b| b.kind).collect();
/// assert_eq!(kinds.len(), 2);
/// assert_eq!(kinds[1], BlockKind::Struct);
/// assert!(segmentation.unterminated.is_none());
/// ```
pub fn segment(source: &str) -> Segmentation<'_> {
    let mut segmenter = Segmenter::new(source);
    let unterminated = segmenter.run().err();
    let blocks = segmenter.blocks;

    debug!(blocks_len = blocks.len(), truncated = unterminated.is_some(); "Segmented document");

    Segmentation {
        blocks,
        unterminated,
    }
}

struct Segmenter<'src> {
    source: &'src str,
    blocks: Vec<RawBlock<'src>>,
    /// Open paragraph as `start..end` of its trimmed lines.
    paragraph: Option<(usize, usize)>,
}

impl<'src> Segmenter<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            blocks: Vec::new(),
            paragraph: None,
        }
    }

    fn run(&mut self) -> Result<(), Diagnostic> {
        let source = self.source;
        let mut pos = 0;

        while pos < source.len() {
            let line_end = source[pos..].find('\n').map_or(source.len(), |i| pos + i);
            let next_line = (line_end + 1).min(source.len());
            let line = &source[pos..line_end];
            let start = pos + (line.len() - line.trim_start().len());
            let end = pos + line.trim_end().len();
            let trimmed = source.get(start..end.max(start)).unwrap_or_default();

            if trimmed.is_empty() || trimmed.starts_with("//") {
                self.flush_paragraph();
                pos = next_line;
                continue;
            }

            if let Some(header) = match_header(source, start) {
                self.flush_paragraph();
                let block_end =
                    find_block_end(source, start, header.kind).ok_or_else(|| {
                        unterminated_block(header.kind, Span::new(start..header.end))
                    })?;
                self.push_block(header, start, block_end);
                pos = block_end;
                continue;
            }

            if let Some(level) = heading_level(trimmed) {
                self.flush_paragraph();
                self.push_prose(ProseKind::Heading { level }, start, end);
            } else if is_rule(trimmed) {
                self.flush_paragraph();
                self.push_prose(ProseKind::Rule, start, end);
            } else {
                let open = self.paragraph.map_or(start, |(open, _)| open);
                self.paragraph = Some((open, end));
            }
            pos = next_line;
        }

        self.flush_paragraph();
        Ok(())
    }

    fn flush_paragraph(&mut self) {
        if let Some((start, end)) = self.paragraph.take() {
            self.push_prose(ProseKind::Paragraph, start, end);
        }
    }

    fn push_prose(&mut self, kind: ProseKind, start: usize, end: usize) {
        trace!(start, end, kind:?; "Prose block");
        self.blocks.push(RawBlock {
            kind: BlockKind::Prose(kind),
            span: Span::new(start..end),
            text: &self.source[start..end],
            label: None,
            body: None,
        });
    }

    fn push_block(&mut self, header: Header<'src>, start: usize, end: usize) {
        let body = header.open_brace.and_then(|open| {
            // The closing brace sits before an optional trailing `;`.
            let close = self.source[..end].trim_end_matches([';', ' ', '\t']).len();
            (close > open).then(|| Span::new(open + 1..close - 1))
        });
        trace!(start, end, kind:? = header.kind, label:? = header.label; "Block");
        self.blocks.push(RawBlock {
            kind: header.kind,
            span: Span::new(start..end),
            text: &self.source[start..end],
            label: header.label,
            body,
        });
    }
}

fn unterminated_block(kind: BlockKind, header: Span) -> Diagnostic {
    let keyword = kind.keyword().unwrap_or("block");
    let help = if kind.ends_with_semicolon() {
        "terminate the declaration with `;`"
    } else {
        "add the matching `}`"
    };
    Diagnostic::error(format!("unterminated `{keyword}` block"))
        .with_code(ErrorCode::E102)
        .with_label(header, "block opened here")
        .with_help(help)
}

/// A recognised block header.
#[derive(Debug, Clone, Copy)]
struct Header<'src> {
    kind: BlockKind,
    label: Option<&'src str>,
    /// Offset just past the header.
    end: usize,
    /// Offset of the `{` that opens the body, for brace-terminated blocks.
    open_brace: Option<usize>,
}

/// Byte cursor for header shape checks.
struct Cursor<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Cursor<'src> {
    /// Skip whitespace; returns whether any was skipped.
    fn ws(&mut self) -> bool {
        let rest = &self.source[self.pos..];
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
        skipped > 0
    }

    fn word(&mut self) -> Option<&'src str> {
        let rest = &self.source[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..len];
        if word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            self.pos += len;
            Some(word)
        } else {
            None
        }
    }

    /// Any run of non-space characters other than `{`, e.g. `c++`.
    fn tag(&mut self) -> Option<&'src str> {
        let rest = &self.source[self.pos..];
        let len = rest
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(rest.len());
        (len > 0).then(|| {
            self.pos += len;
            &rest[..len]
        })
    }

    fn punct(&mut self, ch: char) -> Option<usize> {
        let at = self.pos;
        self.source[at..].starts_with(ch).then(|| {
            self.pos += ch.len_utf8();
            at
        })
    }
}

fn match_header(source: &str, start: usize) -> Option<Header<'_>> {
    let mut cursor = Cursor { source, pos: start };
    let keyword = cursor.word()?;
    let kind = match keyword {
        "type" => BlockKind::TypeAlias,
        "const" => BlockKind::Const,
        "table" => BlockKind::Table,
        "struct" => BlockKind::Struct,
        "enum" => BlockKind::Enum,
        "data" => BlockKind::Data,
        "graph" => BlockKind::Diagram,
        "math" => BlockKind::Math,
        "config" => BlockKind::Config,
        "code" => BlockKind::Code,
        _ => return None,
    };

    let mut label = None;
    let mut open_brace = None;
    match kind {
        BlockKind::TypeAlias | BlockKind::Const => {
            cursor.ws().then_some(())?;
            label = Some(cursor.word()?);
            cursor.ws();
            cursor.punct(if kind == BlockKind::Const { ':' } else { '=' })?;
        }
        BlockKind::Table => {
            cursor.ws().then_some(())?;
            label = Some(cursor.word()?);
            cursor.ws();
            cursor.punct('{')?;
        }
        BlockKind::Struct | BlockKind::Enum | BlockKind::Config => {
            cursor.ws().then_some(())?;
            label = Some(cursor.word()?);
            cursor.ws();
            open_brace = Some(cursor.punct('{')?);
        }
        BlockKind::Data => {
            cursor.ws().then_some(())?;
            label = Some(cursor.word()?);
            cursor.ws().then_some(())?;
            cursor.word()?;
            cursor.ws();
            open_brace = Some(cursor.punct('{')?);
        }
        BlockKind::Diagram => {
            if cursor.ws() {
                label = cursor.word();
                cursor.ws();
            }
            open_brace = Some(cursor.punct('{')?);
        }
        BlockKind::Math => {
            cursor.ws();
            open_brace = Some(cursor.punct('{')?);
        }
        BlockKind::Code => {
            cursor.ws().then_some(())?;
            label = Some(cursor.tag()?);
            cursor.ws();
            open_brace = Some(cursor.punct('{')?);
        }
        BlockKind::Prose(_) => return None,
    }

    Some(Header {
        kind,
        label,
        end: cursor.pos,
        open_brace,
    })
}

/// Find the end offset (exclusive) of the block starting at `start`.
///
/// Returns `None` if the input ends first.
fn find_block_end(source: &str, start: usize, kind: BlockKind) -> Option<usize> {
    let bytes = source.as_bytes();
    let opaque = kind.is_opaque();
    let by_semicolon = kind.ends_with_semicolon();
    let mut depth = 0usize;
    let mut opened = false;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if !opaque {
            match (b, bytes.get(i + 1)) {
                (b'"', _) => {
                    i = skip_string(bytes, i);
                    continue;
                }
                (b'/', Some(b'/')) => {
                    i = bytes[i..]
                        .iter()
                        .position(|&c| c == b'\n')
                        .map_or(bytes.len(), |n| i + n);
                    continue;
                }
                (b'/', Some(b'*')) => {
                    i = source[i + 2..].find("*/").map(|n| i + 2 + n + 2)?;
                    continue;
                }
                _ => {}
            }
        }

        match b {
            b'{' => {
                depth += 1;
                opened = true;
            }
            b'[' if !opaque => depth += 1,
            b'}' | b']' if b == b'}' || !opaque => {
                depth = depth.saturating_sub(1);
                if !by_semicolon && opened && depth == 0 {
                    return Some(trailing_semicolon(bytes, i + 1));
                }
            }
            b';' if by_semicolon && depth == 0 => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset past a string starting at `start`. Strings end at the closing
/// quote, the end of the line or the end of input.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Extend `end` over an optional `;` on the same line.
fn trailing_semicolon(bytes: &[u8], end: usize) -> usize {
    let mut i = end;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if bytes.get(i) == Some(&b';') {
        i + 1
    } else {
        end
    }
}

fn heading_level(line: &str) -> Option<u8> {
    let hashes = line.len() - line.trim_start_matches('#').len();
    let rest = &line[hashes..];
    let level = u8::try_from(hashes).ok().filter(|n| (1..=6).contains(n))?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(level)
}

fn is_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && marks.clone().count() >= 2 && marks.all(|c| c == first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<BlockKind> {
        segment(source).blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_empty_document() {
        let segmentation = segment("");
        assert!(segmentation.blocks.is_empty());
        assert!(segmentation.unterminated.is_none());
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let source = "First line\nstill first.\n\nSecond.";
        let blocks = segment(source).blocks;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "First line\nstill first.");
        assert_eq!(blocks[1].text, "Second.");
        assert_eq!(blocks[1].span, Span::new(25..32));
    }

    #[test]
    fn test_headings_and_rules() {
        let source = "# Title\ntext\n---\n###### Deep\n#hashtag";
        assert_eq!(
            kinds(source),
            vec![
                BlockKind::Prose(ProseKind::Heading { level: 1 }),
                BlockKind::Prose(ProseKind::Paragraph),
                BlockKind::Prose(ProseKind::Rule),
                BlockKind::Prose(ProseKind::Heading { level: 6 }),
                BlockKind::Prose(ProseKind::Paragraph),
            ]
        );
    }

    #[test]
    fn test_every_block_kind() {
        let source = r#"
type Name = string;
const MAX: int = 3;
table Scores { name: string; } = [ ["a"], ];
struct Point { x: int; }
enum Status { ACTIVE; }
data Point origin { x = 0; }
graph flowchart { A -> B; }
math { \frac{a}{b} }
config Server { port = 80; }
code rust { fn main() {} }
"#;
        assert_eq!(
            kinds(source),
            vec![
                BlockKind::TypeAlias,
                BlockKind::Const,
                BlockKind::Table,
                BlockKind::Struct,
                BlockKind::Enum,
                BlockKind::Data,
                BlockKind::Diagram,
                BlockKind::Math,
                BlockKind::Config,
                BlockKind::Code,
            ]
        );
    }

    #[test]
    fn test_labels_and_bodies() {
        let blocks = segment("data Point origin { x = 0; };\ngraph { A; }\ncode c++ { x }").blocks;
        assert_eq!(blocks[0].label, Some("Point"));
        assert_eq!(blocks[0].text, "data Point origin { x = 0; };");
        assert_eq!(blocks[0].body_text(), Some(" x = 0; "));
        assert_eq!(blocks[1].label, None);
        assert_eq!(blocks[2].label, Some("c++"));
        assert_eq!(blocks[2].body_text(), Some(" x "));
    }

    #[test]
    fn test_keyword_without_header_is_prose() {
        let source = "type the name here\nstruct of the essay\ngraphs are fun";
        assert_eq!(kinds(source), vec![BlockKind::Prose(ProseKind::Paragraph)]);
    }

    #[test]
    fn test_braces_in_strings_and_comments() {
        let source = "struct A {\n  // }\n  s: string @default(\"}\");\n  /* } */\n}\nafter";
        let blocks = segment(source).blocks;
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.ends_with("/* } */\n}"));
        assert_eq!(blocks[1].text, "after");
    }

    #[test]
    fn test_code_blocks_count_braces_only() {
        let source = "code js { let s = \"{\"; }\n}\nrest";
        let blocks = segment(source).blocks;
        // The quote is literal, so the `{` inside it opens a level.
        assert_eq!(blocks[0].text, "code js { let s = \"{\"; }\n}");
    }

    #[test]
    fn test_semicolon_blocks_ignore_nested_semicolons() {
        let source = "table T { a: int; b: int; } = [[1, 2], [3, 4]];\nconst X: array<int> = [1, 2];";
        let blocks = segment(source).blocks;
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.ends_with("]];"));
        assert_eq!(blocks[1].text, "const X: array<int> = [1, 2];");
    }

    #[test]
    fn test_multiple_blocks_on_one_line() {
        let source = "type A = int; type B = string;";
        assert_eq!(kinds(source), vec![BlockKind::TypeAlias, BlockKind::TypeAlias]);
    }

    #[test]
    fn test_top_level_comments_dropped() {
        let source = "// hidden\nvisible\n// hidden too\nstruct A { }";
        let blocks = segment(source).blocks;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "visible");
    }

    #[test]
    fn test_unterminated_block_truncates() {
        let source = "Intro.\n\nstruct Open {\n  x: int;\n\ntype Later = int;";
        let segmentation = segment(source);
        assert_eq!(segmentation.blocks.len(), 1);
        let diag = segmentation.unterminated.expect("unterminated");
        assert_eq!(diag.code(), Some(ErrorCode::E102));
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(8));
    }

    #[test]
    fn test_unterminated_semicolon_block() {
        let segmentation = segment("type A = int");
        assert!(segmentation.blocks.is_empty());
        assert!(segmentation.unterminated.is_some());
    }
}
