//! Integration tests for the DocumentBuilder API

use folio::{
    BlockContent, DocumentBuilder, FolioError,
    block::BlockKind,
    config::{AppConfig, ClusterRankPolicy, DiagramConfig, LayoutConfig, ValidationConfig},
    diagnostics::{ErrorCode, ErrorKind},
    diagram::MixedEdgePolicy,
};

const MIXED: &str = r#"# Inventory

Servers and how they talk to each other.

struct Port { number: int; }

enum Role { WEB; DB }

table Servers { name: string; role: Role; } = [
    ["web-1", WEB],
    ["db-1", Role::DB],
];

graph flowchart {
    node Web [shape: box];
    node Db [shape: cylinder];
    Web -> Db;
}

code rust { fn main() {} }
"#;

#[test]
fn test_build_mixed_document() {
    let document = DocumentBuilder::default().build("inventory.folio", MIXED);
    assert!(!document.has_errors(), "{:?}", document.records());

    let kinds: Vec<BlockKind> = document.blocks().iter().map(|block| block.kind).collect();
    assert!(kinds.contains(&BlockKind::Table));
    assert!(kinds.contains(&BlockKind::Diagram));
    assert!(kinds.contains(&BlockKind::Code));
    assert!(document.registry().get_struct("Port").is_some());
    assert_eq!(document.tables().count(), 1);

    let view = document.diagrams().next().expect("Expected a diagram");
    let layout = view.layout.expect("Expected a layout");
    assert_eq!(layout.nodes.len(), 2);
    assert_eq!(document.layout(view.block), Some(layout));

    for block in document.blocks() {
        match &block.content {
            BlockContent::Prose { .. }
            | BlockContent::Definition { .. }
            | BlockContent::Data(_)
            | BlockContent::Table(_)
            | BlockContent::Diagram { .. }
            | BlockContent::Math { .. }
            | BlockContent::Config { .. }
            | BlockContent::Code { .. } => {}
        }
    }
}

#[test]
fn test_build_checked_reports_undefined_node() {
    let result = DocumentBuilder::default().build_checked("broken.folio", "graph { node A; A -> B; }\n");
    let Err(FolioError::Parse { err, src, name }) = result else {
        panic!("Expected a parse error");
    };
    assert_eq!(name, "broken.folio");
    assert!(src.contains("A -> B"));
    let diagnostic = &err.diagnostics()[0];
    assert_eq!(diagnostic.code(), Some(ErrorCode::E306));
    assert_eq!(diagnostic.kind(), Some(ErrorKind::Validation));
    assert!(diagnostic.message().contains('B'));
}

#[test]
fn test_failed_block_does_not_stop_the_rest() {
    let source = "data Point p { x = 1; }\n\nstruct Size { w: int; }\n\ngraph { node A; }\n";
    let document = DocumentBuilder::default().build("partial.folio", source);
    assert!(document.has_errors());
    assert_eq!(document.blocks().len(), 3);
    assert!(document.registry().get_struct("Size").is_some());
    assert!(document.diagrams().next().and_then(|view| view.layout).is_some());
}

#[test]
fn test_config_policies_apply() {
    let config = AppConfig::new(
        LayoutConfig {
            cluster_ranks: ClusterRankPolicy::Reject,
            ..LayoutConfig::default()
        },
        DiagramConfig {
            mixed_edges: MixedEdgePolicy::Reject,
        },
        ValidationConfig::default(),
    );
    let builder = DocumentBuilder::new(config);

    let mixed = builder.build("mixed.folio", "graph { node A; node B; node C; A -> B; B -- C; }\n");
    assert!(mixed.records().iter().any(|r| r.code == Some(ErrorCode::E312)));
    assert!(mixed.diagrams().all(|view| view.layout.is_none()));

    let split = builder.build(
        "split.folio",
        "graph { cluster Split { node A; node C; } node B; A -> B; B -> C; }\n",
    );
    assert!(split.records().iter().any(|r| r.code == Some(ErrorCode::E310)));
    assert!(split.has_errors());
    assert!(split.diagrams().all(|view| view.layout.is_none()));
}

#[test]
fn test_build_batch_keeps_order() {
    let sources: Vec<(String, String)> = (0..6)
        .map(|i| {
            (
                format!("doc-{i}.folio"),
                format!("graph {{ node N{i}; node M{i}; N{i} -> M{i}; }}\n"),
            )
        })
        .collect();
    let documents = DocumentBuilder::default().build_batch(&sources);

    assert_eq!(documents.len(), 6);
    for (i, document) in documents.iter().enumerate() {
        assert_eq!(document.id(), format!("doc-{i}.folio"));
        let view = document.diagrams().next().expect("Expected a diagram");
        assert!(view.graph.nodes.contains_key(format!("N{i}").as_str()));
    }
}
