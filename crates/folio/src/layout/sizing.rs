//! Node size estimation from labels.

use folio_core::{
    diagram::{Attributed, Node, Shape},
    geometry::Size,
};

use crate::config::LayoutConfig;

/// Font size that `char_width` is calibrated for.
const BASE_FONT_SIZE: f32 = 14.0;

/// Side of a `point` node.
const POINT_SIZE: f32 = 10.0;

/// Estimates node sizes without measuring text.
#[derive(Debug, Clone, Copy)]
pub struct NodeSizer {
    char_width: f32,
    min_width: f32,
    min_height: f32,
    padding: f32,
}

impl NodeSizer {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            char_width: config.char_width,
            min_width: config.min_node_width,
            min_height: config.min_node_height,
            padding: config.node_padding,
        }
    }

    pub fn size(&self, node: &Node) -> Size {
        let shape = node.shape();
        if shape == Shape::Point {
            return Size::new(POINT_SIZE, POINT_SIZE);
        }

        let scale = node
            .font_size()
            .map_or(1.0, |size| size as f32 / BASE_FONT_SIZE);
        let label = node.label();
        let columns = label.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let lines = label.lines().count().max(1);

        let char_width = self.char_width * scale;
        let line_height = char_width * 2.0;
        let mut width = columns as f32 * char_width + 2.0 * self.padding;
        let mut height = lines as f32 * line_height + 2.0 * self.padding;

        match shape {
            // Room for the curved or slanted border around the text.
            Shape::Ellipse | Shape::Cylinder => {
                width *= 1.25;
                height *= 1.25;
            }
            Shape::Diamond => {
                width *= 1.5;
                height *= 1.5;
            }
            _ => {}
        }

        let size = Size::new(width.max(self.min_width), height.max(self.min_height));
        if shape.is_square() {
            let side = size.width().max(size.height());
            Size::new(side, side)
        } else {
            size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use folio_core::{
        diagram::{AttrValue, AttributeMap},
        identifier::Id,
        span::Span,
    };

    fn node(name: &str, attributes: &[(&str, AttrValue)]) -> Node {
        Node {
            id: Id::new(name),
            cluster: None,
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<AttributeMap>(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_short_label_uses_minimum() {
        let sizer = NodeSizer::new(&LayoutConfig::default());
        let size = sizer.size(&node("A", &[]));
        assert!(approx_eq!(f32, size.width(), 60.0));
        assert!(approx_eq!(f32, size.height(), 36.0));
    }

    #[test]
    fn test_long_label_grows_with_font() {
        let sizer = NodeSizer::new(&LayoutConfig::default());
        let label = AttrValue::String("a rather long label".to_string());
        let plain = sizer.size(&node("A", &[("label", label.clone())]));
        // 19 chars * 8 + 2 * 10
        assert!(approx_eq!(f32, plain.width(), 172.0));

        let mut font = AttributeMap::new();
        font.insert("size".to_string(), AttrValue::Number(28.0));
        let large = sizer.size(&node("A", &[("label", label), ("font", AttrValue::Map(font))]));
        assert!(approx_eq!(f32, large.width(), 324.0));
    }

    #[test]
    fn test_square_shapes() {
        let sizer = NodeSizer::new(&LayoutConfig::default());
        let circle = sizer.size(&node(
            "wide_circle_label",
            &[("shape", AttrValue::Ident("circle".to_string()))],
        ));
        assert!(approx_eq!(f32, circle.width(), circle.height()));

        let point = sizer.size(&node("p", &[("shape", AttrValue::Ident("point".to_string()))]));
        assert!(approx_eq!(f32, point.width(), POINT_SIZE));
        assert!(approx_eq!(f32, point.height(), POINT_SIZE));
    }
}
