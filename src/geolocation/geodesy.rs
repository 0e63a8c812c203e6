use itertools::Itertools;

use super::Coordinate;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers, by the
/// spherical law of cosines. The acos argument is clamped to [-1, 1] so
/// identical or antipodal points cannot push it out of domain through
/// floating-point overshoot.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let start_lat = a.latitude.to_radians();
    let start_lon = a.longitude.to_radians();
    let dest_lat = b.latitude.to_radians();
    let dest_lon = b.longitude.to_radians();

    let central_angle_cos = start_lat.sin() * dest_lat.sin()
        + start_lat.cos() * dest_lat.cos() * (start_lon - dest_lon).cos();

    central_angle_cos.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
}

/// Total length of a trace in kilometers, summed over consecutive fixes.
/// Traces with fewer than two points have zero length.
pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.iter()
        .tuple_windows()
        .map(|(a, b)| distance_km(*a, *b))
        .sum()
}
