use crate::geolocation::Coordinate;

pub const TILE_SIZE: f64 = 256.0;

// Web mercator is undefined past this latitude; clamp rather than diverge.
const MAX_MERCATOR_LAT_DEG: f64 = 85.05112878;

/// Pixel position of a coordinate on the whole-world mercator plane at the
/// given zoom level. The plane is `2^zoom * 256` pixels on each side with
/// the origin at the north-west corner.
pub fn global_pixel(coord: Coordinate, zoom: u8) -> (f64, f64) {
    let side = tile_count(zoom) as f64 * TILE_SIZE;
    let x = (coord.longitude + 180.0) / 360.0 * side;
    let lat_rad = coord
        .latitude
        .clamp(-MAX_MERCATOR_LAT_DEG, MAX_MERCATOR_LAT_DEG)
        .to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * side;
    (x, y)
}

/// Number of tiles along one side of the pyramid at the given zoom level.
pub fn tile_count(zoom: u8) -> u32 {
    1 << zoom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_plane_center() {
        let (x, y) = global_pixel(Coordinate::new(0.0, 0.0), 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_plane_side_doubles_per_zoom_level() {
        assert_eq!(tile_count(0), 1);
        assert_eq!(tile_count(1), 2);
        assert_eq!(tile_count(13), 8192);

        let (x0, _) = global_pixel(Coordinate::new(0.0, 90.0), 0);
        let (x1, _) = global_pixel(Coordinate::new(0.0, 90.0), 1);
        assert!((x1 - 2.0 * x0).abs() < 1e-9);
    }

    #[test]
    fn test_latitude_is_clamped_at_the_mercator_limit() {
        let (_, y_pole) = global_pixel(Coordinate::new(90.0, 0.0), 5);
        let (_, y_limit) = global_pixel(Coordinate::new(MAX_MERCATOR_LAT_DEG, 0.0), 5);
        assert!(y_pole.is_finite());
        assert!((y_pole - y_limit).abs() < 1e-6);
    }

    #[test]
    fn test_north_is_up() {
        let (_, y_north) = global_pixel(Coordinate::new(45.0, 0.0), 3);
        let (_, y_south) = global_pixel(Coordinate::new(-45.0, 0.0), 3);
        assert!(y_north < y_south);
    }
}
