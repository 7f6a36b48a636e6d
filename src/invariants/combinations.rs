//! Brightest-first enumeration of star groups.
//!
//! Yields `K`-subsets of a brightness-ordered list in order of increasing
//! rank sum, so groups made of the brightest stars come out before groups
//! that reach further down the list.
//!
//! Groups form a tree rooted at the `K` brightest stars. A group's parent is
//! found by moving its first member that is not at its brightest possible
//! rank one rank up. Expanding only along that tree, with a min-heap on the
//! rank sum, reaches every group exactly once.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Iterator over `K`-element groups of `items`, lowest rank sum first.
pub struct BrightestFirst<const K: usize> {
    items: Vec<usize>,
    frontier: BinaryHeap<Reverse<(usize, [u32; K])>>,
}

impl<const K: usize> BrightestFirst<K> {
    /// `items` must already be in priority order (index 0 = brightest).
    pub fn new(items: &[usize]) -> Self {
        let mut frontier = BinaryHeap::new();
        if K > 0 && items.len() >= K {
            let brightest: [u32; K] = std::array::from_fn(|member| member as u32);
            frontier.push(Reverse((rank_sum(&brightest), brightest)));
        }
        Self {
            items: items.to_vec(),
            frontier,
        }
    }

    /// Groups over the stars of a brightness-sorted slice, by position.
    pub fn over(len: usize) -> Self {
        let items: Vec<usize> = (0..len).collect();
        Self::new(&items)
    }
}

fn rank_sum<const K: usize>(ranks: &[u32; K]) -> usize {
    ranks.iter().map(|&r| r as usize).sum()
}

impl<const K: usize> Iterator for BrightestFirst<K> {
    type Item = [usize; K];

    fn next(&mut self) -> Option<[usize; K]> {
        let Reverse((_, ranks)) = self.frontier.pop()?;

        // Children demote one member by a rank. Only members up to and
        // including the first one off its brightest rank may move, which
        // makes this group the child's unique parent.
        let dimmest = self.items.len() as u32;
        for member in 0..K {
            let next_taken = ranks.get(member + 1).copied().unwrap_or(dimmest);
            if ranks[member] + 1 < next_taken {
                let mut child = ranks;
                child[member] += 1;
                self.frontier.push(Reverse((rank_sum(&child), child)));
            }
            if ranks[member] != member as u32 {
                break;
            }
        }

        Some(ranks.map(|r| self.items[r as usize]))
    }
}
