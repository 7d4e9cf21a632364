//! Best-first search over table rearrangements.
//!
//! A search node is a full table snapshot; expanding a node relocates one
//! tile at a time around the single most broken group. Every candidate is an
//! independent deep copy of its parent, so sibling branches can never corrupt
//! each other and no mutate-then-revert bookkeeping exists anywhere.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, info, trace};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::rules::{all_valid, heuristic, is_partially_valid, is_valid_set};
use crate::{Group, Hand, Table, Tile};

/// Budgets that bound a single seeded search.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    /// Maximum number of moves on any one branch. Branches that exceed it
    /// are abandoned; the rest of the frontier keeps going.
    pub max_depth: u32,
    /// Global cap on node expansions, the stand-in for wall-clock
    /// cancellation: branching factor times depth can grow combinatorially.
    pub max_expansions: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: 10,
            max_expansions: 200_000,
        }
    }
}

/// Outcome of one seeded search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Table snapshots from the seeded state to the all-valid state,
    /// inclusive, or `None` if the budgets ran out first.
    pub path: Option<Vec<Table>>,
    /// Nodes expanded before terminating.
    pub expansions: usize,
}

/// A winning placement for one hand tile.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The hand tile that was worked onto the table.
    pub tile: Tile,
    /// Intermediate table states, seeded state first, all-valid state last.
    pub steps: Vec<Table>,
}

impl Solution {
    /// Number of moves between the seeded state and the winning state.
    pub fn move_count(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn final_table(&self) -> &Table {
        self.steps.last().expect("solution has at least one step")
    }
}

/// Result of trying a whole hand against a table.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// The first hand tile (in hand order) that admits a placement.
    pub solution: Option<Solution>,
    /// Total expansions across all per-tile searches.
    pub expansions: usize,
}

/// Which end of a group a tile lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

struct Node {
    table: Table,
    g: u32,
    parent: Option<usize>,
}

/// Frontier entry ordered so that `BinaryHeap` pops the lowest `g + h`
/// first; ties break toward the earliest-inserted entry, keeping expansion
/// order stable.
struct FrontierEntry {
    f: f32,
    seq: u64,
    node: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Run the best-first search from `start` until every group is valid or the
/// budgets are exhausted.
///
/// Nodes live in an index arena; the frontier and parent links hold indices
/// into it, and the winning path is rebuilt by an iterative walk back to the
/// root.
pub fn search(start: Table, limits: &SearchLimits) -> SearchResult {
    let mut nodes: Vec<Node> = Vec::new();
    let mut frontier: BinaryHeap<FrontierEntry> = BinaryHeap::new();
    let mut visited: FxHashSet<Vec<Vec<Tile>>> = FxHashSet::default();
    let mut seq: u64 = 0;
    let mut expansions: usize = 0;

    visited.insert(start.canonical_key());
    let f = heuristic(&start);
    nodes.push(Node {
        table: start,
        g: 0,
        parent: None,
    });
    frontier.push(FrontierEntry { f, seq, node: 0 });

    while let Some(entry) = frontier.pop() {
        let node_idx = entry.node;
        let g = nodes[node_idx].g;

        if all_valid(&nodes[node_idx].table) {
            trace!(
                "goal at depth {} after {} expansions: {}",
                g,
                expansions,
                nodes[node_idx].table
            );
            return SearchResult {
                path: Some(reconstruct_path(&nodes, node_idx)),
                expansions,
            };
        }

        // Children of this node would exceed the per-branch move budget;
        // abandon the branch, keep the rest of the frontier.
        if g >= limits.max_depth {
            continue;
        }

        if expansions >= limits.max_expansions {
            debug!("expansion budget exhausted after {} nodes", expansions);
            break;
        }
        expansions += 1;

        for (table, cost) in generate_moves(&nodes[node_idx].table) {
            if !visited.insert(table.canonical_key()) {
                continue;
            }
            let child_g = g + cost;
            let child_f = child_g as f32 + heuristic(&table);
            let child_idx = nodes.len();
            nodes.push(Node {
                table,
                g: child_g,
                parent: Some(node_idx),
            });
            seq += 1;
            frontier.push(FrontierEntry {
                f: child_f,
                seq,
                node: child_idx,
            });
        }
    }

    SearchResult {
        path: None,
        expansions,
    }
}

/// Walk parent links from the terminal node back to the root, then reverse.
fn reconstruct_path(nodes: &[Node], terminal: usize) -> Vec<Table> {
    let mut path = Vec::new();
    let mut cursor = Some(terminal);
    while let Some(idx) = cursor {
        path.push(nodes[idx].table.clone());
        cursor = nodes[idx].parent;
    }
    path.reverse();
    path
}

/// Index of the shortest group failing [`is_valid_set`], first-encountered on
/// ties. `None` means the table is already all valid.
fn shortest_invalid_group(table: &Table) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, group) in table.groups().iter().enumerate() {
        if is_valid_set(group) {
            continue;
        }
        if best.map_or(true, |(_, len)| group.len() < len) {
            best = Some((idx, group.len()));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Enumerate candidate successor tables for `table`, each with its move cost.
///
/// All work centers on the single shortest invalid group: its tiles are
/// offered to the ends of every other group, compatible tiles elsewhere on
/// the table are pulled onto it, and a 2-tile illegal pair may be split into
/// singletons.
fn generate_moves(table: &Table) -> Vec<(Table, u32)> {
    let broken_idx = match shortest_invalid_group(table) {
        Some(idx) => idx,
        None => return Vec::new(),
    };
    let mut candidates = Vec::new();
    let broken_len = table.groups()[broken_idx].len();

    // Push tiles of the broken group onto other groups, keeping only moves
    // that leave the destination valid or partially valid.
    for tile_idx in 0..broken_len {
        for dest_idx in 0..table.len() {
            if dest_idx == broken_idx {
                continue;
            }
            for end in [End::Front, End::Back] {
                if let Some(next) = relocate_if_repairing(table, broken_idx, tile_idx, dest_idx, end)
                {
                    candidates.push((next, 1));
                }
            }
        }
    }

    // Pull compatible tiles from the rest of the table onto the broken group:
    // number predecessor/successor in its color, or its number in an unused
    // color.
    for src_idx in 0..table.len() {
        if src_idx == broken_idx {
            continue;
        }
        for (tile_idx, &tile) in table.groups()[src_idx].tiles().enumerate() {
            if let Some(end) = extension_end(&table.groups()[broken_idx], tile) {
                candidates.push((apply_relocation(table, src_idx, tile_idx, broken_idx, end), 1));
            }
        }
    }

    // Two tiles wrongly forced together must be able to part ways and each
    // look for a different home. Costed as two moves since it undoes work.
    if broken_len == 2 {
        candidates.push((split_pair(table, broken_idx), 2));
    }

    candidates
}

/// Relocate one tile and accept only if the destination group ends up valid
/// or partially valid.
fn relocate_if_repairing(
    table: &Table,
    src_idx: usize,
    tile_idx: usize,
    dest_idx: usize,
    end: End,
) -> Option<Table> {
    let tile = table.groups()[src_idx].get(tile_idx)?;
    let dest = &table.groups()[dest_idx];
    // Positional inserts must not break the ascending-order invariant.
    let fits = match end {
        End::Front => dest.first().map_or(false, |t| tile.number() <= t.number()),
        End::Back => dest.last().map_or(false, |t| tile.number() >= t.number()),
    };
    if !fits {
        return None;
    }

    let mut next = table.clone();
    let (moved, split) = next.remove_tile(src_idx, tile_idx);
    // Source removal can insert a split suffix before the destination.
    let dest_adj = dest_idx + usize::from(split && dest_idx > src_idx);
    match end {
        End::Front => next.group_mut(dest_adj).push_front(moved),
        End::Back => next.group_mut(dest_adj).push_back(moved),
    }
    let dest_after = &next.groups()[dest_adj];
    if !(is_valid_set(dest_after) || is_partially_valid(dest_after)) {
        return None;
    }
    next.prune_empty();
    Some(next)
}

/// Build the successor table for moving `(src_idx, tile_idx)` onto the given
/// end of `dest_idx`. Infallible: callers have already vetted the move.
fn apply_relocation(
    table: &Table,
    src_idx: usize,
    tile_idx: usize,
    dest_idx: usize,
    end: End,
) -> Table {
    let mut next = table.clone();
    let (tile, split) = next.remove_tile(src_idx, tile_idx);
    let dest_adj = dest_idx + usize::from(split && dest_idx > src_idx);
    match end {
        End::Front => next.group_mut(dest_adj).push_front(tile),
        End::Back => next.group_mut(dest_adj).push_back(tile),
    }
    next.prune_empty();
    next
}

/// The end of `dest` that `tile` can legally extend, if any: run extension
/// needs the adjacent number in the same color, group-set extension needs the
/// same number in a color the group does not hold yet.
fn extension_end(dest: &Group, tile: Tile) -> Option<End> {
    let first = dest.first()?;
    let last = dest.last()?;

    if tile.color() == first.color() && tile.number() + 1 == first.number() {
        return Some(End::Front);
    }
    if tile.color() == last.color() && tile.number() == last.number() + 1 {
        return Some(End::Back);
    }
    let same_number = dest.tiles().all(|t| t.number() == tile.number());
    let unused_color = dest.tiles().all(|t| t.color() != tile.color());
    if same_number && unused_color {
        return Some(End::Back);
    }
    None
}

/// Split a 2-tile group into two singleton groups.
fn split_pair(table: &Table, group_idx: usize) -> Table {
    debug_assert_eq!(table.groups()[group_idx].len(), 2);
    let mut next = table.clone();
    let (tile, _) = next.remove_tile(group_idx, 1);
    next.push_group(Group::singleton(tile));
    next
}

/// The seeded start state: the table plus the hand tile as a new singleton.
fn seed(table: &Table, tile: Tile) -> Table {
    let mut start = table.clone();
    start.push_group(Group::singleton(tile));
    start
}

/// Try each hand tile in order and return the first that can be worked onto
/// the table within the budgets.
pub fn solve_hand(table: &Table, hand: &Hand, limits: &SearchLimits) -> SolveOutcome {
    let mut expansions = 0;
    for &tile in hand.tiles() {
        let result = search(seed(table, tile), limits);
        expansions += result.expansions;
        match result.path {
            Some(steps) => {
                info!(
                    "placement found for {} in {} moves ({} expansions total)",
                    tile,
                    steps.len().saturating_sub(1),
                    expansions
                );
                return SolveOutcome {
                    solution: Some(Solution { tile, steps }),
                    expansions,
                };
            }
            None => debug!("no placement for {} within budget", tile),
        }
    }
    SolveOutcome {
        solution: None,
        expansions,
    }
}

/// Like [`solve_hand`], but fans the independent per-tile searches across
/// rayon workers. Each worker owns its deep-copied seeded table, so nothing
/// is shared; the reported tile is still the first in hand order.
pub fn solve_hand_parallel(table: &Table, hand: &Hand, limits: &SearchLimits) -> SolveOutcome {
    let results: Vec<SearchResult> = hand
        .tiles()
        .par_iter()
        .map(|&tile| search(seed(table, tile), limits))
        .collect();

    let expansions = results.iter().map(|r| r.expansions).sum();
    let solution = hand
        .tiles()
        .iter()
        .zip(results)
        .find_map(|(&tile, result)| result.path.map(|steps| Solution { tile, steps }));

    SolveOutcome {
        solution,
        expansions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    fn table(s: &str) -> Table {
        s.parse().unwrap()
    }

    fn tile(s: &str) -> Tile {
        s.parse().unwrap()
    }

    #[test]
    fn test_shortest_invalid_group_prefers_smallest_then_first() {
        let t = table("1R 2R 3R, 5B 5G, 9Y");
        assert_eq!(shortest_invalid_group(&t), Some(2));

        let t = table("7R, 9Y, 1R 2R 3R");
        assert_eq!(shortest_invalid_group(&t), Some(0), "first wins ties");

        let t = table("1R 2R 3R, 5B 5G 5Y");
        assert_eq!(shortest_invalid_group(&t), None);
    }

    #[test]
    fn test_extension_end() {
        let run: Group = "7R 8R".parse().unwrap();
        assert_eq!(extension_end(&run, tile("6R")), Some(End::Front));
        assert_eq!(extension_end(&run, tile("9R")), Some(End::Back));
        assert_eq!(extension_end(&run, tile("9B")), None);
        assert_eq!(extension_end(&run, tile("10R")), None);

        let set: Group = "5R 5B".parse().unwrap();
        assert_eq!(extension_end(&set, tile("5G")), Some(End::Back));
        assert_eq!(extension_end(&set, tile("5R")), None, "color already used");

        let single: Group = "5R".parse().unwrap();
        assert_eq!(extension_end(&single, tile("4R")), Some(End::Front));
        assert_eq!(extension_end(&single, tile("5Y")), Some(End::Back));
    }

    #[test]
    fn test_generate_moves_appends_to_run() {
        let t = table("1R 2R 3R, 4R");
        let moves = generate_moves(&t);
        assert!(
            moves
                .iter()
                .any(|(next, cost)| *cost == 1 && next.to_string() == "1R 2R 3R 4R"),
            "expected the append candidate, got: {:?}",
            moves.iter().map(|(t, _)| t.to_string()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_generate_moves_splits_stranded_pair() {
        // 7R 9R is not consecutive and nothing on the table can extend it, so
        // the split-into-singletons candidate must appear.
        let t = table("1B 2B 3B, 7R 9R");
        let moves = generate_moves(&t);
        let split = moves.iter().find(|(next, _)| {
            next.groups()
                .iter()
                .filter(|g| g.len() == 1)
                .filter(|g| {
                    let t = g.first().unwrap();
                    t == tile("7R") || t == tile("9R")
                })
                .count()
                == 2
        });
        let &(_, cost) = split.expect("split candidate missing");
        assert_eq!(cost, 2);
    }

    #[test]
    fn test_candidates_never_alias_parent() {
        let t = table("1R 2R 3R, 4R");
        let before = t.clone();
        let moves = generate_moves(&t);
        assert!(!moves.is_empty());
        assert_eq!(t, before, "parent must not be mutated by expansion");
    }

    #[test]
    fn test_search_one_move_append() {
        let start = table("1R 2R 3R, 4R");
        let result = search(start, &SearchLimits::default());
        let path = result.path.expect("solvable in one move");
        assert_eq!(path.len(), 2);
        assert_eq!(path.last().unwrap().to_string(), "1R 2R 3R 4R");
    }

    #[test]
    fn test_solve_hand_single_tile_success() {
        let t = table("1R 2R 3R");
        let hand: Hand = "4R".parse().unwrap();
        let outcome = solve_hand(&t, &hand, &SearchLimits::default());
        let solution = outcome.solution.expect("4R extends the run");
        assert_eq!(solution.tile, tile("4R"));
        assert_eq!(solution.move_count(), 1);
        assert_eq!(solution.final_table().to_string(), "1R 2R 3R 4R");
    }

    #[test]
    fn test_solve_hand_unplaceable_tile_fails() {
        let t = table("1R 2R 3R");
        let hand: Hand = "5Y".parse().unwrap();
        let outcome = solve_hand(&t, &hand, &SearchLimits::default());
        assert!(outcome.solution.is_none());
    }

    #[test]
    fn test_solve_hand_reports_first_viable_tile() {
        let t = table("1R 2R 3R");
        let hand: Hand = "5Y 4R 13B".parse().unwrap();
        let outcome = solve_hand(&t, &hand, &SearchLimits::default());
        assert_eq!(outcome.solution.expect("4R works").tile, tile("4R"));
    }

    #[test]
    fn test_search_multi_move_group_formation() {
        // 2G can only land by pulling 2R and 2B off the fronts of the runs,
        // which stay valid as 3R 4R 5R and 3B 4B 5B.
        let t = table("2R 3R 4R 5R, 2B 3B 4B 5B");
        let hand: Hand = "2G".parse().unwrap();
        let outcome = solve_hand(&t, &hand, &SearchLimits::default());
        let solution = outcome.solution.expect("three 2s form a group-set");
        assert!(crate::rules::all_valid(solution.final_table()));
        assert_eq!(
            solution.final_table().tile_count(),
            9,
            "all nine tiles remain on the table"
        );
        let has_two_group = solution
            .final_table()
            .groups()
            .iter()
            .any(|g| g.len() == 3 && g.tiles().all(|t| t.number() == 2));
        assert!(has_two_group, "final table: {}", solution.final_table());
    }

    #[test]
    fn test_depth_bound_prunes_branch_not_search() {
        // With max_depth 0 even a trivial one-move fix is out of reach, but
        // the already-valid seed must still be recognized as terminal.
        let limits = SearchLimits {
            max_depth: 0,
            ..SearchLimits::default()
        };
        assert!(search(table("1R 2R 3R, 4R"), &limits).path.is_none());
        assert!(search(table("1R 2R 3R"), &limits).path.is_some());

        let limits = SearchLimits {
            max_depth: 1,
            ..SearchLimits::default()
        };
        assert!(search(table("1R 2R 3R, 4R"), &limits).path.is_some());
    }

    #[test]
    fn test_expansion_cap_is_honored() {
        let limits = SearchLimits {
            max_expansions: 0,
            ..SearchLimits::default()
        };
        let result = search(table("2R 3R 4R 5R, 2B 3B 4B 5B, 2G"), &limits);
        assert!(result.path.is_none());
        assert_eq!(result.expansions, 0);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let t = table("1R 2R 3R, 5B 5G 5Y");
        let hand: Hand = "9Y 4R 5R".parse().unwrap();
        let limits = SearchLimits::default();
        let seq = solve_hand(&t, &hand, &limits);
        let par = solve_hand_parallel(&t, &hand, &limits);
        assert_eq!(
            seq.solution.as_ref().map(|s| s.tile),
            par.solution.as_ref().map(|s| s.tile)
        );
        assert_eq!(seq.solution.unwrap().tile, Tile::new(4, Color::Red));
    }

    #[test]
    fn test_path_starts_at_seed_and_ends_valid() {
        let t = table("2R 3R 4R 5R, 2B 3B 4B 5B");
        let hand: Hand = "2G".parse().unwrap();
        let solution = solve_hand(&t, &hand, &SearchLimits::default())
            .solution
            .unwrap();
        let first = &solution.steps[0];
        assert_eq!(first.len(), 3, "seed adds the singleton group");
        assert_eq!(first.groups()[2].first(), Some(tile("2G")));
        assert!(crate::rules::all_valid(solution.steps.last().unwrap()));
        // Every consecutive pair differs: each step is a real move.
        for pair in solution.steps.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
