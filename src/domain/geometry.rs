//! Coordinate conversions between continent pixels, tile space and the game world.

use crate::domain::model::{Coord2, Coord3, Point, Rect, Vec3};

/// Edge length of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Game units covered by one continent pixel.
pub const WORLD_UNITS_PER_PIXEL: f64 = 24.0;

/// Game units are inches, world positions are meters.
pub const INCHES_TO_METERS: f64 = 0.0254;

pub fn game_to_world(value: f64) -> f32 {
    (value * INCHES_TO_METERS) as f32
}

/// Re-express a continent coordinate relative to `top_left`, shifted by `padding`.
pub fn refit(value: Coord2, top_left: Coord2, padding: i32) -> Point {
    Point::new(
        (value.x - top_left.x + f64::from(padding)) as i32,
        (value.y - top_left.y + f64::from(padding)) as i32,
    )
}

/// Even-odd point-in-polygon test.
///
/// Edges are half-open: a point on an edge shared by two adjacent polygons is
/// inside exactly one of them.
pub fn contains_point(polygon: &[Coord2], p: Coord2) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// World position of a continent coordinate on the map spanning `continent_rect`.
///
/// The map center becomes the origin, pixels are scaled to game units and the
/// Y axis is flipped; height is negated.
pub fn world_position(coord: Coord3, continent_rect: &Rect) -> Vec3 {
    let center = continent_rect.center();
    Vec3::new(
        game_to_world((coord.x - center.x) * WORLD_UNITS_PER_PIXEL),
        game_to_world(-(coord.y - center.y) * WORLD_UNITS_PER_PIXEL),
        game_to_world(-coord.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refit_truncates_towards_origin() {
        let p = refit(Coord2::new(1050.7, 2200.2), Coord2::new(1000.0, 2000.0), 0);
        assert_eq!(p, Point::new(50, 200));

        let p = refit(Coord2::new(1000.0, 2000.0), Coord2::new(1000.0, 2000.0), 4);
        assert_eq!(p, Point::new(4, 4));
    }

    #[test]
    fn test_contains_point_degenerate_polygon() {
        assert!(!contains_point(&[], Coord2::new(0.0, 0.0)));
        assert!(!contains_point(
            &[Coord2::new(0.0, 0.0), Coord2::new(1.0, 1.0)],
            Coord2::new(0.5, 0.5)
        ));
    }

    #[test]
    fn test_contains_point_concave() {
        // U shape opening upwards
        let u = vec![
            Coord2::new(0.0, 0.0),
            Coord2::new(3.0, 0.0),
            Coord2::new(3.0, 3.0),
            Coord2::new(2.0, 3.0),
            Coord2::new(2.0, 1.0),
            Coord2::new(1.0, 1.0),
            Coord2::new(1.0, 3.0),
            Coord2::new(0.0, 3.0),
        ];
        assert!(contains_point(&u, Coord2::new(0.5, 2.0)));
        assert!(!contains_point(&u, Coord2::new(1.5, 2.0)));
        assert!(contains_point(&u, Coord2::new(1.5, 0.5)));
    }

    #[test]
    fn test_world_position_center_is_origin() {
        let rect = Rect::new(Coord2::new(0.0, 0.0), Coord2::new(200.0, 100.0));
        let pos = world_position(Coord3::new(100.0, 50.0, 0.0), &rect);
        assert_eq!(pos, Vec3::new(0.0, 0.0, 0.0));

        let pos = world_position(Coord3::new(110.0, 60.0, -100.0), &rect);
        assert!((pos.x - 6.096).abs() < 1e-4);
        assert!((pos.y + 6.096).abs() < 1e-4);
        assert!((pos.z - 2.54).abs() < 1e-4);
    }
}
