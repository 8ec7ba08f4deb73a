use crate::records::City;

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Half size in degrees of the box searched before falling back to all cities
pub const SEARCH_MARGIN_DEG: f64 = 2.0;

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ReverseItem<'a> {
    pub city: &'a City,
    /// great circle distance in kilometers
    pub distance: f64,
}

/// Great circle distance in kilometers between two `(lat, lng)` points.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1 = from.0.to_radians();
    let lat2 = to.0.to_radians();
    let delta_lat = (to.0 - from.0).to_radians();
    let delta_lng = (to.1 - from.1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    // rounding may push `a` slightly out of [0, 1]
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

fn in_box(city: &City, loc: (f64, f64)) -> bool {
    (city.latitude - loc.0).abs() <= SEARCH_MARGIN_DEG
        && (city.longitude - loc.1).abs() <= SEARCH_MARGIN_DEG
}

/// Find the nearest city to `loc` (`(lat, lng)`).
///
/// Only cities in a ±2° box around `loc` are measured; when the box is empty
/// every city is. Equal distances keep the first city and a NaN distance
/// never beats a real one. `None` only for an empty `cities`.
pub fn nearest(cities: &[City], loc: (f64, f64)) -> Option<ReverseItem<'_>> {
    let nearby = cities.iter().filter(|city| in_box(city, loc));
    let boxed = closest(nearby, loc);
    if boxed.is_some() {
        return boxed;
    }

    closest(cities.iter(), loc)
}

fn closest<'a, I>(cities: I, loc: (f64, f64)) -> Option<ReverseItem<'a>>
where
    I: Iterator<Item = &'a City>,
{
    let mut best: Option<ReverseItem<'a>> = None;
    for city in cities {
        let distance = haversine_km(loc, (city.latitude, city.longitude));
        let closer = match &best {
            Some(item) => {
                distance < item.distance || (item.distance.is_nan() && !distance.is_nan())
            }
            None => true,
        };
        if closer {
            best = Some(ReverseItem { city, distance });
        }
    }
    best
}
