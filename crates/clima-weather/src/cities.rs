//! Built-in catalog of Ecuadorian cities.

use crate::types::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub slug: &'static str,
    pub name: &'static str,
    pub coordinate: Coordinate,
}

const CITIES: &[City] = &[
    City {
        slug: "guayaquil",
        name: "Guayaquil",
        coordinate: Coordinate {
            latitude: -2.1962,
            longitude: -79.8862,
        },
    },
    City {
        slug: "quito",
        name: "Quito",
        coordinate: Coordinate {
            latitude: -0.2298,
            longitude: -78.525,
        },
    },
    City {
        slug: "manta",
        name: "Manta",
        coordinate: Coordinate {
            latitude: -0.9677,
            longitude: -80.7089,
        },
    },
    City {
        slug: "cuenca",
        name: "Cuenca",
        coordinate: Coordinate {
            latitude: -2.9006,
            longitude: -79.0045,
        },
    },
];

pub const DEFAULT_CITY: &str = "guayaquil";

pub fn all() -> &'static [City] {
    CITIES
}

/// Find a city by slug or display name, ignoring case and surrounding space.
pub fn find(name: &str) -> Option<&'static City> {
    let name = name.trim();
    CITIES
        .iter()
        .find(|c| c.slug.eq_ignore_ascii_case(name) || c.name.eq_ignore_ascii_case(name))
}
