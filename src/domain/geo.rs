//! Great-circle distances for the delivery surcharge and the demo seeders.

use rand::Rng;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres spanned by one degree of latitude on the reference sphere.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Warehouse in Osorno; every delivery surcharge is measured from here.
pub const BUSINESS_ORIGIN: GeoPoint = GeoPoint::new(-40.5739, -73.1317);

/// Distance in km between two points given in decimal degrees, rounded to 0.1 km.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round_to_tenth(EARTH_RADIUS_KM * c)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledPoint {
    pub lat: f64,
    pub lng: f64,
    pub distance_km: u32,
}

/// Rejection-sample a point inside the circle of `radius_km` around `center`.
///
/// Candidates are drawn from the lat/lng rectangle bounding the circle and
/// discarded until one lands within the radius.
pub fn sample_point_near<R: Rng + ?Sized>(
    rng: &mut R,
    center: GeoPoint,
    radius_km: f64,
) -> SampledPoint {
    if radius_km <= 0.0 {
        return SampledPoint {
            lat: center.lat,
            lng: center.lng,
            distance_km: 0,
        };
    }

    let lat_span = radius_km / KM_PER_DEGREE;
    let lng_span = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos()).max(1e-6);

    loop {
        let lat = center.lat + rng.gen_range(-lat_span..=lat_span);
        let lng = center.lng + rng.gen_range(-lng_span..=lng_span);
        let distance = haversine(center.lat, center.lng, lat, lng);
        if distance <= radius_km {
            return SampledPoint {
                lat,
                lng,
                distance_km: distance.round() as u32,
            };
        }
    }
}
