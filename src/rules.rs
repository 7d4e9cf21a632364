//! Legality predicates over groups and tables.
//!
//! These are pure functions: they never mutate, and the solver calls them on
//! every candidate state, so they stay allocation-free.

use crate::{Group, Table};

/// True iff the group has 3+ tiles of one color with strictly consecutive
/// numbers, relying on the group's ascending-order invariant.
pub fn is_run(group: &Group) -> bool {
    if group.len() < 3 {
        return false;
    }
    group
        .tiles()
        .zip(group.tiles().skip(1))
        .all(|(prev, next)| next.number() == prev.number() + 1 && next.color() == prev.color())
}

/// True iff the group has 3+ tiles of one number with pairwise-distinct
/// colors.
///
/// Distinctness is checked across the whole group with a color bitmask, not
/// just between sorted neighbors: same-number tiles sort by number alone, so
/// two copies of one color are not guaranteed to end up adjacent.
pub fn is_group_set(group: &Group) -> bool {
    if group.len() < 3 {
        return false;
    }
    let number = match group.first() {
        Some(t) => t.number(),
        None => return false,
    };
    let mut colors_seen = 0u8;
    for tile in group.tiles() {
        if tile.number() != number {
            return false;
        }
        let bit = 1u8 << tile.color() as u8;
        if colors_seen & bit != 0 {
            return false;
        }
        colors_seen |= bit;
    }
    true
}

/// Terminal legality of a single group: empty groups are vacuously valid,
/// 1- and 2-tile groups are not, anything larger must be a run or group-set.
pub fn is_valid_set(group: &Group) -> bool {
    match group.len() {
        0 => true,
        1 | 2 => false,
        _ => is_run(group) || is_group_set(group),
    }
}

/// A 1- or 2-tile group that could still grow into a run or group-set.
///
/// Not a legal placement by itself, but a promising intermediate: the
/// heuristic and the move-acceptance gate both treat it as half-finished
/// work rather than a dead end.
pub fn is_partially_valid(group: &Group) -> bool {
    match group.len() {
        1 => true,
        2 => match (group.get(0), group.get(1)) {
            (Some(a), Some(b)) => {
                let run_seed = a.color() == b.color() && b.number() == a.number() + 1;
                let set_seed = a.number() == b.number() && a.color() != b.color();
                run_seed || set_seed
            }
            _ => false,
        },
        _ => false,
    }
}

/// The search goal test: every group on the table is a legal placement.
pub fn all_valid(table: &Table) -> bool {
    table.groups().iter().all(is_valid_set)
}

/// Estimated remaining work: each partially-valid group counts as half a
/// move, on the rough grounds that a 2-tile seed needs one more tile and two
/// 1-tile seeds can merge. Not proven admissible; used for frontier ordering
/// only, with no optimality claim.
pub fn heuristic(table: &Table) -> f32 {
    let partials = table
        .groups()
        .iter()
        .filter(|g| is_partially_valid(g))
        .count();
    partials as f32 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Table, Tile};

    fn group(s: &str) -> Group {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_run() {
        assert!(is_run(&group("1R 2R 3R")));
        assert!(is_run(&group("10B 11B 12B 13B")));
        assert!(!is_run(&group("1R 2R")), "too short");
        assert!(!is_run(&group("1R 2R 4R")), "gap");
        assert!(!is_run(&group("1R 2B 3R")), "color change");
        assert!(!is_run(&group("4G 4G 4G")), "repeated number");
    }

    #[test]
    fn test_is_group_set() {
        assert!(is_group_set(&group("5R 5B 5G")));
        assert!(is_group_set(&group("5R 5B 5G 5Y")));
        assert!(!is_group_set(&group("5R 5B")), "too short");
        assert!(!is_group_set(&group("5R 5B 6G")), "mixed numbers");
        assert!(
            !is_group_set(&group("5R 5B 5R")),
            "duplicate color anywhere in the set"
        );
        assert!(!is_group_set(&group("5R 5R 5B")), "duplicate color adjacent");
    }

    #[test]
    fn test_run_and_group_set_mutually_exclusive() {
        // With 3+ integer numbers, all-equal and all-consecutive cannot both
        // hold, whatever the colors.
        for g in ["1R 2R 3R", "5R 5B 5G", "7B 8B 9B 10B", "13R 13B 13Y"] {
            let g = group(g);
            assert!(!(is_run(&g) && is_group_set(&g)), "{} is both", g);
        }
    }

    #[test]
    fn test_is_valid_set() {
        assert!(is_valid_set(&Group::new()), "empty is vacuously valid");
        assert!(!is_valid_set(&group("5R")));
        assert!(!is_valid_set(&group("5R 5B")));
        assert!(is_valid_set(&group("1R 2R 3R")));
        assert!(is_valid_set(&group("5R 5B 5G")));
        assert!(!is_valid_set(&group("1R 2R 4R")));

        // valid iff run or group-set, for every size >= 3 case above
        for g in ["1R 2R 3R", "5R 5B 5G", "1R 2R 4R", "5R 5B 5R"] {
            let g = group(g);
            assert_eq!(is_valid_set(&g), is_run(&g) || is_group_set(&g));
        }
    }

    #[test]
    fn test_is_partially_valid() {
        assert!(is_partially_valid(&group("7R")), "any singleton");
        assert!(is_partially_valid(&group("7R 8R")), "run seed");
        assert!(is_partially_valid(&group("7R 7B")), "set seed");
        assert!(!is_partially_valid(&group("7R 9R")), "gap");
        assert!(!is_partially_valid(&group("7R 8B")), "wrong color step");
        assert!(!is_partially_valid(&group("7R 7R")), "duplicate color");
        assert!(!is_partially_valid(&group("1R 2R 3R")), "size 3 is not partial");
        assert!(!is_partially_valid(&Group::new()));
    }

    #[test]
    fn test_all_valid_and_idempotent() {
        let good: Table = "1R 2R 3R, 5B 5G 5Y".parse().unwrap();
        assert!(all_valid(&good));
        assert!(all_valid(&good), "repeat call on unmutated table");

        let bad: Table = "1R 2R 3R, 5B 5G".parse().unwrap();
        assert!(!all_valid(&bad));
    }

    #[test]
    fn test_heuristic_counts_partials() {
        let table: Table = "1R 2R 3R, 5B 5G, 9Y".parse().unwrap();
        // Two partially-valid groups (5B 5G and 9Y) at half a move each.
        assert_eq!(heuristic(&table), 1.0);

        let solved: Table = "1R 2R 3R".parse().unwrap();
        assert_eq!(heuristic(&solved), 0.0);
    }

    #[test]
    fn test_middle_removal_leaves_two_partials() {
        let mut table: Table = "1R 2R 3R".parse().unwrap();
        table.remove_tile(0, 1);
        assert_eq!(table.len(), 2);
        assert!(table.groups().iter().all(is_partially_valid));
        assert_eq!(table.groups()[0].first(), Some(Tile::new(1, Color::Red)));
        assert_eq!(table.groups()[1].first(), Some(Tile::new(3, Color::Red)));
    }
}
