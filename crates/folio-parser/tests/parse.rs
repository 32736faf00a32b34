use folio_core::{block::BlockKind, identifier::Id, value::Value};
use folio_parser::{BlockContent, ParseConfig, ParsedDocument, error::ErrorCode, parse_document};
use proptest::prelude::*;

fn parse(source: &str) -> ParsedDocument {
    parse_document(source, &ParseConfig::default())
}

fn codes(parsed: &ParsedDocument) -> Vec<ErrorCode> {
    parsed.diagnostics.iter().filter_map(|d| d.code()).collect()
}

#[test]
fn test_point_validates() {
    let parsed = parse("struct Point { x: int; y: int; }\ndata Point p { x = 1; y = 2; }\n");
    assert!(parsed.diagnostics.is_empty());

    let BlockContent::Data(Some(instance)) = &parsed.blocks[1].content else {
        panic!("Expected a bound data instance");
    };
    assert_eq!(instance.type_name, Id::new("Point"));
    assert_eq!(instance.get("y"), Some(&Value::Int(2)));
}

#[test]
fn test_missing_field_names_y() {
    let parsed = parse("struct Point { x: int; y: int; }\ndata Point p { x = 1; }\n");
    assert_eq!(codes(&parsed), vec![ErrorCode::E300]);
    assert!(parsed.diagnostics[0].message().contains("`y`"));
}

#[test]
fn test_undefined_node_blocks_layout() {
    let parsed = parse("graph { node A; A -> B; }\n");
    assert_eq!(codes(&parsed), vec![ErrorCode::E306]);
    assert!(parsed.diagnostics[0].message().contains("`B`"));
    assert!(matches!(
        parsed.blocks[0].content,
        BlockContent::Diagram { valid: false, .. }
    ));
}

#[test]
fn test_duplicate_edges_retained() {
    let parsed = parse("graph { node A; node B; A -> B; A -> B; }\n");
    assert!(parsed.diagnostics.is_empty());
    let graph = parsed.blocks[0].diagram().expect("Expected a diagram");
    assert_eq!(graph.edges.len(), 2);
}

#[test]
fn test_mixed_document() {
    let source = r#"
# Inventory

Servers we run, and how they talk.

enum Status { ACTIVE, RETIRED }

type Port = int;

struct Server {
    name: string;
    port: Port @range(1, 65535);
    status: Status @default(ACTIVE);
    tags: [string]?;
}

data Server web { name = "web"; port = 443; }

table Servers { name: string; port: Port; } = [
    ["web", 443],
    ["db", 5432],
];

graph flowchart {
    title = "Traffic";
    node web { label: "Web" };
    node db;
    web -> db;
}

math { e^{i\pi} + 1 = 0 }
"#;
    let parsed = parse(source);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

    let kinds: Vec<BlockKind> = parsed.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(kinds.iter().filter(|k| matches!(k, BlockKind::Prose(_))).count(), 2);
    assert!(kinds.contains(&BlockKind::Math));
    assert_eq!(parsed.registry.len(), 3);

    let web = parsed
        .blocks
        .iter()
        .find_map(|b| match &b.content {
            BlockContent::Data(Some(instance)) => Some(instance),
            _ => None,
        })
        .expect("Expected a data block");
    assert_eq!(web.fields.len(), 3);
    assert_eq!(web.get("tags"), None);
}

#[test]
fn test_errors_are_collected_across_blocks() {
    let source = r#"
struct A { b: B; }
struct A { x: int; }
type Loop = Loop;
data A a { b = 1; }
graph { node A; node A; }
"#;
    let parsed = parse(source);
    let found = codes(&parsed);
    for code in [ErrorCode::E201, ErrorCode::E200, ErrorCode::E202, ErrorCode::E307] {
        assert!(found.contains(&code), "missing {code:?} in {found:?}");
    }
}

fn value_strategy() -> impl Strategy<Value = (i64, f64, String, bool)> {
    (
        -1_000_000_000_000i64..1_000_000_000_000,
        -1.0e6f64..1.0e6,
        "[a-zA-Z0-9 _.,!?-]{0,16}",
        any::<bool>(),
    )
}

proptest! {
    #[test]
    fn validated_instances_round_trip((n, x, s, b) in value_strategy(), count in 0usize..4) {
        let schema = "struct Item { n: int; x: float; s: string; b: bool; list: [int]; }\n";
        let list: Vec<String> = (0..count).map(|i| (n.wrapping_add(i as i64)).to_string()).collect();
        let data = format!(
            "data Item it {{ n = {n}; x = {x:?}; s = {s:?}; b = {b}; list = [{}]; }}\n",
            list.join(", ")
        );
        let first = parse(&format!("{schema}{data}"));
        prop_assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
        let BlockContent::Data(Some(instance)) = &first.blocks[1].content else {
            panic!("Expected a bound data instance");
        };

        let second = parse(&format!("{schema}{}", instance.to_source()));
        prop_assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
        let BlockContent::Data(Some(again)) = &second.blocks[1].content else {
            panic!("Expected a bound data instance");
        };
        prop_assert_eq!(&again.fields, &instance.fields);
    }
}
