//! Hospital catchment areas and the one-shot station resolver.
//!
//! Each box is the rectangle within roughly 500 feet of a large Manhattan
//! hospital (Citi Bike map: <https://member.citibikenyc.com/map/>).

use anyhow::Result;
use tracing::{debug, info};

use crate::fetch::HttpClient;
use crate::gbfs::{GbfsClient, StationInformation};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A named rectangle given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub name: &'static str,
    pub min: LatLon,
    pub max: LatLon,
}

impl BoundingBox {
    /// Strict containment: a point on an edge is outside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat > self.min.lat && lat < self.max.lat && lon > self.min.lon && lon < self.max.lon
    }
}

const fn bbox(name: &'static str, min: (f64, f64), max: (f64, f64)) -> BoundingBox {
    BoundingBox {
        name,
        min: LatLon { lat: min.0, lon: min.1 },
        max: LatLon { lat: max.0, lon: max.1 },
    }
}

pub static HOSPITAL_BOXES: &[BoundingBox] = &[
    // station_ids seen: 3345, 3299, 3363
    bbox("Mount Sinai", (40.787880, -73.955862), (40.792001, -73.948389)),
    // 3156, 3141
    bbox(
        "NewYork-Presbyterian Upper East Side",
        (40.763573, -73.959175),
        (40.766666, -73.950179),
    ),
    // 545, 3687, 174, 528, 536, 2012
    bbox(
        "Bellevue and NYU Langone",
        (40.735625, -73.979437),
        (40.743511, -73.970913),
    ),
    // 224, 316
    bbox(
        "NewYork-Presbyterian Lower Manhattan",
        (40.709229, -74.008624),
        (40.712033, -74.002787),
    ),
    // 3309, 3318, 3338, 3351
    bbox(
        "Metropolitan Hospital Center",
        (40.783116, -73.949118),
        (40.787085, -73.939771),
    ),
];

/// Station IDs inside any of `boxes`, box by box, in feed order within a box.
///
/// A station inside two overlapping boxes is listed twice unless `dedupe`
/// is set, in which case only its first occurrence is kept.
pub fn stations_in_boxes(
    stations: &[StationInformation],
    boxes: &[BoundingBox],
    dedupe: bool,
) -> Vec<String> {
    let mut ids = Vec::new();

    for b in boxes {
        let inside = stations.iter().filter(|s| b.contains(s.lat, s.lon));
        let mut matched = 0;
        for station in inside {
            matched += 1;
            if dedupe && ids.contains(&station.station_id) {
                continue;
            }
            ids.push(station.station_id.clone());
        }
        debug!(area = b.name, matched, "Stations in catchment area");
    }

    ids
}

/// Fetches station information (retrying per the client's policy) and
/// returns the IDs inside `boxes`.
#[tracing::instrument(skip(client, boxes), fields(boxes = boxes.len()))]
pub async fn resolve_station_ids<C: HttpClient>(
    client: &mut GbfsClient<C>,
    boxes: &[BoundingBox],
    dedupe: bool,
) -> Result<Vec<String>> {
    let stations = client.station_information().await?;
    let ids = stations_in_boxes(&stations, boxes, dedupe);
    info!(total = stations.len(), resolved = ids.len(), "Station IDs resolved");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, lat: f64, lon: f64) -> StationInformation {
        StationInformation {
            station_id: id.to_string(),
            lat,
            lon,
        }
    }

    const UNIT: BoundingBox = bbox("unit", (0.0, 0.0), (1.0, 1.0));
    const OVERLAP: BoundingBox = bbox("overlap", (0.5, 0.5), (2.0, 2.0));

    #[test]
    fn test_contains_is_strict() {
        assert!(UNIT.contains(0.5, 0.5));
        assert!(!UNIT.contains(0.0, 0.5));
        assert!(!UNIT.contains(1.0, 0.5));
        assert!(!UNIT.contains(0.5, 0.0));
        assert!(!UNIT.contains(0.5, 1.0));
        assert!(!UNIT.contains(1.5, 0.5));
    }

    #[test]
    fn test_boundary_stations_are_excluded() {
        let stations = vec![
            station("inside", 0.2, 0.3),
            station("edge", 0.0, 0.3),
            station("corner", 1.0, 1.0),
            station("outside", -1.0, 0.3),
        ];

        assert_eq!(stations_in_boxes(&stations, &[UNIT], false), vec!["inside"]);
    }

    #[test]
    fn test_order_is_box_then_feed() {
        let stations = vec![
            station("both", 0.75, 0.75),
            station("unit_only", 0.1, 0.1),
            station("overlap_only", 1.5, 1.5),
        ];

        assert_eq!(
            stations_in_boxes(&stations, &[UNIT, OVERLAP], false),
            vec!["both", "unit_only", "both", "overlap_only"]
        );
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let stations = vec![station("both", 0.75, 0.75), station("overlap_only", 1.5, 1.5)];

        assert_eq!(
            stations_in_boxes(&stations, &[UNIT, OVERLAP], true),
            vec!["both", "overlap_only"]
        );
    }

    #[test]
    fn test_hospital_boxes_are_well_formed() {
        assert_eq!(HOSPITAL_BOXES.len(), 5);
        for b in HOSPITAL_BOXES {
            assert!(b.min.lat < b.max.lat, "{}", b.name);
            assert!(b.min.lon < b.max.lon, "{}", b.name);
        }
    }

    #[test]
    fn test_bellevue_station_resolves() {
        let stations = vec![station("545", 40.7390, -73.9750), station("far", 40.0, -74.5)];
        assert_eq!(stations_in_boxes(&stations, HOSPITAL_BOXES, false), vec!["545"]);
    }
}
