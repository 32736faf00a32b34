//! Edge route construction shared by the layout engines.

use folio_core::geometry::{Bounds, Point};

/// Distance a self-loop reaches out from its node.
const LOOP_REACH: f32 = 20.0;

/// Route through `via` from `source` to `target`, anchored on both borders.
pub fn anchored(source: Bounds, via: &[Point], target: Bounds) -> Vec<Point> {
    let first_aim = via.first().copied().unwrap_or_else(|| target.center());
    let last_aim = via.last().copied().unwrap_or_else(|| source.center());

    let mut points = Vec::with_capacity(via.len() + 2);
    points.push(source.boundary_toward(first_aim));
    points.extend_from_slice(via);
    points.push(target.boundary_toward(last_aim));
    points
}

/// Four-point loop on the node's side: the right side for vertical rank
/// axes, the bottom for horizontal ones.
pub fn self_loop(bounds: Bounds, horizontal: bool) -> Vec<Point> {
    let center = bounds.center();
    if horizontal {
        let offset = bounds.width() / 4.0;
        let y = bounds.max_y();
        vec![
            Point::new(center.x() - offset, y),
            Point::new(center.x() - offset, y + LOOP_REACH),
            Point::new(center.x() + offset, y + LOOP_REACH),
            Point::new(center.x() + offset, y),
        ]
    } else {
        let offset = bounds.height() / 4.0;
        let x = bounds.max_x();
        vec![
            Point::new(x, center.y() - offset),
            Point::new(x + LOOP_REACH, center.y() - offset),
            Point::new(x + LOOP_REACH, center.y() + offset),
            Point::new(x, center.y() + offset),
        ]
    }
}

/// Insert elbows so every segment is axis-aligned.
///
/// Each diagonal segment becomes three: along the rank axis to the midpoint,
/// across, then along the rank axis again.
pub fn orthogonal(points: &[Point], horizontal: bool) -> Vec<Point> {
    let mut routed = Vec::with_capacity(points.len() * 3);
    for (index, &point) in points.iter().enumerate() {
        if let Some(&previous) = index.checked_sub(1).and_then(|i| points.get(i)) {
            if previous.x() != point.x() && previous.y() != point.y() {
                let mid = previous.midpoint(point);
                if horizontal {
                    routed.push(Point::new(mid.x(), previous.y()));
                    routed.push(Point::new(mid.x(), point.y()));
                } else {
                    routed.push(Point::new(previous.x(), mid.y()));
                    routed.push(Point::new(point.x(), mid.y()));
                }
            }
        }
        routed.push(point);
    }
    routed
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::geometry::Size;

    fn square(x: f32, y: f32) -> Bounds {
        Bounds::new_from_center(Point::new(x, y), Size::new(20.0, 20.0))
    }

    #[test]
    fn test_anchored_straight_edge() {
        let points = anchored(square(0.0, 0.0), &[], square(0.0, 100.0));
        assert_eq!(points, vec![Point::new(0.0, 10.0), Point::new(0.0, 90.0)]);
    }

    #[test]
    fn test_anchored_through_bend() {
        let points = anchored(square(0.0, 0.0), &[Point::new(50.0, 50.0)], square(0.0, 100.0));
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], Point::new(50.0, 50.0));
        assert_eq!(points[0], Point::new(10.0, 10.0));
    }

    #[test]
    fn test_self_loop_has_four_points() {
        let points = self_loop(square(0.0, 0.0), false);
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.x() >= 10.0));
    }

    #[test]
    fn test_orthogonal_elbows() {
        let points = orthogonal(&[Point::new(0.0, 0.0), Point::new(40.0, 100.0)], false);
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 50.0),
                Point::new(40.0, 50.0),
                Point::new(40.0, 100.0),
            ]
        );

        let aligned = orthogonal(&[Point::new(0.0, 0.0), Point::new(0.0, 100.0)], false);
        assert_eq!(aligned.len(), 2);
    }
}
