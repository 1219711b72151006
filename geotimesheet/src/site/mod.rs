//! Site model and nearest-site resolution.
//!
//! A site is a known work location represented as a single point. The
//! resolver matches a position against a snapshot of sites by great-circle
//! distance; the snapshot itself comes from a [`SiteDirectory`]
//! implementation backed by the external store.

mod directory;

pub use directory::{DirectoryError, SiteDirectory};

#[cfg(test)]
pub use directory::tests::StaticSiteDirectory;

use std::fmt;

use crate::coord::{distance_meters, Coordinate};

/// Opaque site identifier, assigned by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteId(String);

impl SiteId {
    /// Create a site id from its backing-store representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The backing-store representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A known work location.
///
/// Immutable once fetched; owned by the directory snapshot and discarded
/// on the next refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Backing-store identifier.
    pub id: SiteId,
    /// Site location (a point; sites have no polygon geometry).
    pub location: Coordinate,
}

impl Site {
    /// Create a site.
    pub fn new(id: impl Into<String>, location: Coordinate) -> Self {
        Self {
            id: SiteId::new(id),
            location,
        }
    }
}

/// Resolve the site nearest to `position` from a snapshot.
///
/// Distances are compared with strict `<`, so on an exact tie the first
/// site in snapshot iteration order wins. The tie-break must be stable:
/// an unstable winner near two equidistant sites would flap the segment
/// history between them.
///
/// Returns `None` for an empty snapshot.
pub fn nearest<'a>(position: &Coordinate, sites: &'a [Site]) -> Option<&'a Site> {
    let mut best: Option<(&Site, f64)> = None;

    for site in sites {
        let d = distance_meters(position, &site.location);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((site, d)),
        }
    }

    best.map(|(site, _)| site)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;

    fn site(id: &str, lat: f64, lon: f64) -> Site {
        Site {
            id: SiteId::new(id),
            location: Coordinate::new(lat, lon).unwrap(),
        }
    }

    fn pos(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_nearest_single_candidate() {
        // One site at the origin, fix ~111m north: still the only candidate
        let sites = vec![site("1", 0.0, 0.0)];
        let found = nearest(&pos(0.001, 0.0), &sites).unwrap();
        assert_eq!(found.id, SiteId::new("1"));
    }

    #[test]
    fn test_nearest_picks_minimum_distance() {
        let sites = vec![
            site("far", 1.0, 1.0),
            site("near", 0.01, 0.01),
            site("mid", 0.5, 0.5),
        ];
        let found = nearest(&pos(0.0, 0.0), &sites).unwrap();
        assert_eq!(found.id, SiteId::new("near"));
    }

    #[test]
    fn test_nearest_empty_snapshot() {
        assert!(nearest(&pos(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn test_nearest_exact_tie_first_wins() {
        // Two sites symmetric about the fix: identical distance, first wins
        let sites = vec![site("a", 0.001, 0.0), site("b", -0.001, 0.0)];
        let found = nearest(&pos(0.0, 0.0), &sites).unwrap();
        assert_eq!(found.id, SiteId::new("a"));

        // Reversing the snapshot order flips the winner: the tie-break is
        // snapshot order, not site identity
        let reversed = vec![site("b", -0.001, 0.0), site("a", 0.001, 0.0)];
        let found = nearest(&pos(0.0, 0.0), &reversed).unwrap();
        assert_eq!(found.id, SiteId::new("b"));
    }

    #[test]
    fn test_nearest_coincident_site_zero_distance() {
        let sites = vec![site("here", 53.55, 9.99), site("there", 53.56, 9.99)];
        let found = nearest(&pos(53.55, 9.99), &sites).unwrap();
        assert_eq!(found.id, SiteId::new("here"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_sites() -> impl Strategy<Value = Vec<Site>> {
            prop::collection::vec(
                (-90.0..90.0_f64, -180.0..180.0_f64),
                1..20,
            )
            .prop_map(|coords| {
                coords
                    .into_iter()
                    .enumerate()
                    .map(|(i, (lat, lon))| Site {
                        id: SiteId::new(format!("site-{}", i)),
                        location: Coordinate::new(lat, lon).unwrap(),
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn test_nearest_deterministic(
                lat in -90.0..90.0_f64,
                lon in -180.0..180.0_f64,
                sites in arb_sites(),
            ) {
                let p = Coordinate::new(lat, lon).unwrap();

                // Repeated resolution over the same snapshot returns the
                // same site every time
                let first = nearest(&p, &sites).map(|s| s.id.clone());
                for _ in 0..3 {
                    let again = nearest(&p, &sites).map(|s| s.id.clone());
                    prop_assert_eq!(first.clone(), again);
                }
            }

            #[test]
            fn test_nearest_is_global_minimum(
                lat in -90.0..90.0_f64,
                lon in -180.0..180.0_f64,
                sites in arb_sites(),
            ) {
                let p = Coordinate::new(lat, lon).unwrap();
                let found = nearest(&p, &sites).unwrap();
                let found_d = distance_meters(&p, &found.location);

                for site in &sites {
                    prop_assert!(
                        found_d <= distance_meters(&p, &site.location)
                    );
                }
            }
        }
    }
}
