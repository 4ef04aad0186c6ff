//! distances.rs — all-pairs shortest-path table over the track graph.
//!
//! Computed once at boot by Floyd–Warshall and consulted by the planner's
//! heuristic. Both directed edges of a stretch share one physical distance,
//! so the seed (and the result) is symmetric.

use std::collections::HashMap;

use rail_types::layout::{City, Layout};

const INF: u32 = u32::MAX / 2;

#[derive(Debug)]
pub struct DistanceTable {
    table: HashMap<(City, City), u32>,
}

impl DistanceTable {
    pub fn compute(layout: &Layout) -> Self {
        let mut table: HashMap<(City, City), u32> = HashMap::new();

        for seg in layout.segments() {
            table.insert((seg.src, seg.dst), seg.distance);
            table.insert((seg.dst, seg.src), seg.distance);
        }

        for k in City::ALL {
            for i in City::ALL {
                for j in City::ALL {
                    let via = table.get(&(i, k)).copied().unwrap_or(INF)
                        + table.get(&(k, j)).copied().unwrap_or(INF);
                    let direct = table.get(&(i, j)).copied().unwrap_or(INF);
                    if via < direct {
                        table.insert((i, j), via);
                    }
                }
            }
        }

        Self { table }
    }

    /// Minimum track distance between two cities; 0 for a city and itself.
    pub fn between(&self, a: City, b: City) -> u32 {
        if a == b {
            return 0;
        }
        self.table.get(&(a, b)).copied().unwrap_or(INF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_edges_are_tight() {
        let layout = Layout::standard();
        let distances = DistanceTable::compute(&layout);
        // No multi-hop route undercuts these direct stretches.
        assert_eq!(distances.between(City::LA, City::KansasCity), 200);
        assert_eq!(distances.between(City::KansasCity, City::Nyc), 128);
        assert_eq!(distances.between(City::LasVegas, City::KansasCity), 108);
    }

    #[test]
    fn multi_hop_shortcuts_are_found() {
        let layout = Layout::standard();
        let distances = DistanceTable::compute(&layout);
        // LA->NYC direct does not exist; via Kansas City is 200 + 128.
        assert_eq!(distances.between(City::LA, City::Nyc), 328);
        // LA->ATLANTA via Kansas City: 200 + 192.
        assert_eq!(distances.between(City::LA, City::Atlanta), 392);
    }

    #[test]
    fn table_is_transitively_closed() {
        let layout = Layout::standard();
        let distances = DistanceTable::compute(&layout);
        for i in City::ALL {
            for j in City::ALL {
                for k in City::ALL {
                    assert!(
                        distances.between(i, j)
                            <= distances.between(i, k) + distances.between(k, j),
                        "triangle violated: {i}->{j} via {k}"
                    );
                }
            }
        }
    }

    #[test]
    fn table_is_symmetric_and_total() {
        let layout = Layout::standard();
        let distances = DistanceTable::compute(&layout);
        for i in City::ALL {
            for j in City::ALL {
                assert_eq!(distances.between(i, j), distances.between(j, i));
                if i != j {
                    assert!(distances.between(i, j) < INF, "{i}->{j} unreachable");
                }
            }
        }
    }
}
