//! Folio Core Types
//!
//! This crate provides the model types shared by the Folio parser, layout
//! engine and document assembler:
//!
//! - **Blocks**: block kinds produced by segmentation ([`block`] module)
//! - **Identifiers**: reference-counted declared names ([`identifier::Id`])
//! - **Spans**: byte ranges into document source ([`span`] module)
//! - **Geometry**: points, sizes and rectangles ([`geometry`] module)
//! - **Schema**: type references and declarations ([`schema`] module)
//! - **Values**: literal values ([`value`] module)
//! - **Data**: validated data instances and tables ([`data`] module)
//! - **Diagram**: the validated diagram graph ([`diagram`] module)
//! - **Layout**: computed node rectangles and edge routes ([`layout`] module)

pub mod block;
pub mod data;
pub mod diagram;
pub mod geometry;
pub mod identifier;
pub mod layout;
pub mod schema;
pub mod span;
pub mod value;
