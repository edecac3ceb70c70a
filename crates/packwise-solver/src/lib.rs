//! Whole-pack combination solver.
//!
//! # Purpose
//! Given an order amount and a set of permitted pack sizes, picks the multiset
//! of whole packs to ship under a two-level objective: first minimize the total
//! items shipped (which must cover the amount), then minimize the number of
//! packs among the item-minimal combinations.
//!
//! # Approach
//! Bounded dynamic programming over exact totals. `packs[i]` holds the minimum
//! pack count summing to exactly `i` items, `choice[i]` the size used on the
//! last step of the best path to `i`. A single ascending sweep finalizes every
//! state before it is read; the answer is the first reachable total at or
//! above the amount, reconstructed by walking `choice` back to zero.
//!
//! The table is bounded by the smallest total reachable with a single pack
//! size, `min_s ceil(amount / s) * s`. That total is always feasible, so the
//! optimum can never exceed it, and it is never larger than
//! `amount + max(size)`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Failure modes of [`solve`]. The solver is pure: retrying with identical
/// inputs yields identical results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    /// The requested amount is zero.
    #[error("amount must be at least 1")]
    InvalidAmount,
    /// No pack sizes are configured.
    #[error("no pack sizes configured")]
    NoConfig,
    /// No combination inside the search bound reaches the amount. Cannot
    /// occur for a non-empty set of positive sizes; kept so the finite
    /// horizon is an explicit part of the contract.
    #[error("no pack combination reaches the requested amount")]
    NoSolution,
}

/// An optimal shipment: how many packs of each size, with the derived totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Chosen pack multiset, keyed by pack size. Every count is at least 1.
    pub packs: BTreeMap<u64, u64>,
    /// Total items shipped: `sum(size * count)`. Always `>= amount`.
    pub total_items: u64,
    /// Total physical packs: `sum(count)`.
    pub total_packs: u64,
}

/// Sum the pack counts of a multiset.
///
/// The cache layer stores only the multiset and item total, so hit paths
/// rebuild the pack count from the multiset with this.
pub fn pack_count(packs: &BTreeMap<u64, u64>) -> u64 {
    packs.values().sum()
}

/// Sentinel for totals no combination reaches.
const UNREACHABLE: u32 = u32::MAX;

/// Solve for the optimal pack combination covering `amount`.
///
/// Sizes are canonicalized (sorted ascending, deduplicated, zeroes dropped)
/// before use, so callers may pass them in any order. Ties in the multiset
/// reconstruction are broken toward the first-seen size in ascending order;
/// the item and pack totals are tie-free.
pub fn solve(amount: u64, sizes: &[u64]) -> Result<Solution, SolveError> {
    if amount == 0 {
        return Err(SolveError::InvalidAmount);
    }
    let sizes = canonical_sizes(sizes);
    if sizes.is_empty() {
        return Err(SolveError::NoConfig);
    }

    // Smallest single-size total covering the amount. Feasible by
    // construction, so it bounds the optimum from above.
    let horizon = sizes
        .iter()
        .map(|&s| amount.div_ceil(s) * s)
        .min()
        .ok_or(SolveError::NoConfig)?;

    let len = horizon as usize + 1;
    let mut packs = vec![UNREACHABLE; len];
    // Index into `sizes` of the last pack on the best path to each total.
    let mut choice = vec![0u32; len];
    packs[0] = 0;

    for i in 0..len {
        let here = packs[i];
        if here == UNREACHABLE {
            continue;
        }
        for (idx, &size) in sizes.iter().enumerate() {
            let next = i + size as usize;
            if next >= len {
                // Sizes ascend, so every later size also overshoots.
                break;
            }
            if here + 1 < packs[next] {
                packs[next] = here + 1;
                choice[next] = idx as u32;
            }
        }
    }

    // Outer objective: smallest reachable total at or above the amount.
    let total = (amount as usize..len)
        .find(|&i| packs[i] != UNREACHABLE)
        .ok_or(SolveError::NoSolution)?;

    let mut multiset = BTreeMap::new();
    let mut rest = total;
    while rest > 0 {
        let size = sizes[choice[rest] as usize];
        *multiset.entry(size).or_insert(0u64) += 1;
        rest -= size as usize;
    }

    Ok(Solution {
        total_items: total as u64,
        total_packs: packs[total] as u64,
        packs: multiset,
    })
}

fn canonical_sizes(sizes: &[u64]) -> Vec<u64> {
    let mut out: Vec<u64> = sizes.iter().copied().filter(|&s| s > 0).collect();
    out.sort_unstable();
    out.dedup();
    out
}
