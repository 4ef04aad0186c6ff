//! pathfind.rs — single-train route search.
//!
//! Plain breadth-first search over (city, orientation) pairs. Orientation
//! matters for revisit pruning because the same city reached facing the
//! other way opens different onward moves without a reversal; the goal test
//! itself is orientation-free.

use std::collections::{HashSet, VecDeque};

use rail_types::{City, Direction, Layout};

/// Returns the segment sequence from `start` to `goal`, or `None` when no
/// route exists. An empty sequence means the train is already there.
pub fn find_route(
    layout: &Layout,
    start: City,
    goal: City,
    initial_facing: Direction,
) -> Option<Vec<(City, City)>> {
    let mut queue: VecDeque<(City, Vec<(City, City)>, Direction)> = VecDeque::new();
    let mut visited: HashSet<(City, Direction)> = HashSet::new();

    queue.push_back((start, Vec::new(), initial_facing));
    visited.insert((start, initial_facing));

    while let Some((current, path, facing)) = queue.pop_front() {
        if current == goal {
            return Some(path);
        }

        for seg in layout.segments_from(current) {
            // A reversal is forced when the segment we just used lists this
            // destination in its reverse_for set.
            let must_reverse = path
                .last()
                .and_then(|&(src, dst)| layout.segment(src, dst))
                .is_some_and(|prev| prev.requires_reversal_toward(seg.dst));

            let new_facing = if must_reverse { facing.flip() } else { facing };

            if visited.insert((seg.dst, new_facing)) {
                let mut new_path = path.clone();
                new_path.push((seg.src, seg.dst));
                queue.push_back((seg.dst, new_path, new_facing));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn la_to_nyc_goes_through_kansas_city() {
        let layout = Layout::standard();
        let path = find_route(&layout, City::LA, City::Nyc, Direction::Forward).unwrap();
        assert_eq!(
            path,
            vec![(City::LA, City::KansasCity), (City::KansasCity, City::Nyc)]
        );
    }

    #[test]
    fn start_equals_goal_is_the_empty_route() {
        let layout = Layout::standard();
        let path = find_route(&layout, City::Calgary, City::Calgary, Direction::Forward);
        assert_eq!(path, Some(vec![]));
    }

    #[test]
    fn every_city_pair_is_routable() {
        let layout = Layout::standard();
        for start in City::ALL {
            for goal in City::ALL {
                assert!(
                    find_route(&layout, start, goal, Direction::Forward).is_some(),
                    "no route {start}->{goal}"
                );
            }
        }
    }

    #[test]
    fn routes_cross_reversals_when_needed() {
        // LAS_VEGAS -> CALGARY has no direct segment; the shortest hop count
        // goes through LA and forces a reversal there.
        let layout = Layout::standard();
        let path = find_route(&layout, City::LasVegas, City::Calgary, Direction::Forward).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], (City::LasVegas, City::LA));
    }

    #[test]
    fn initial_facing_does_not_block_routing() {
        let layout = Layout::standard();
        for facing in [Direction::Forward, Direction::Backward] {
            assert!(find_route(&layout, City::Atlanta, City::LasVegas, facing).is_some());
        }
    }
}
