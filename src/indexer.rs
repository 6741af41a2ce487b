//! Price ranking over the slots of a scheduling window

use crate::types::PricePoint;

/// Slot positions ordered from cheapest to most expensive
///
/// Equal prices keep the earlier slot first. Points with a non-finite price
/// are left out of the ranking altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceRanking {
    order: Vec<usize>,
    rank_of: Vec<Option<usize>>,
}

impl PriceRanking {
    /// Positions of the input points, cheapest first
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of ranked points
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Zero-based rank of a slot (0 = cheapest)
    pub fn rank_of(&self, slot: usize) -> Option<usize> {
        self.rank_of.get(slot).copied().flatten()
    }

    pub fn is_among_cheapest(&self, slot: usize, k: usize) -> bool {
        self.rank_of(slot).is_some_and(|rank| rank < k)
    }

    pub fn is_among_most_expensive(&self, slot: usize, k: usize) -> bool {
        self.rank_of(slot)
            .is_some_and(|rank| k > 0 && rank >= self.len().saturating_sub(k))
    }

    /// The `k` cheapest slot positions, cheapest first
    pub fn cheapest(&self, k: usize) -> &[usize] {
        &self.order[..k.min(self.order.len())]
    }
}

/// Ranks a window's price points
pub struct PriceWindowIndexer;

impl PriceWindowIndexer {
    pub fn rank(prices: &[PricePoint]) -> PriceRanking {
        let mut order: Vec<usize> = (0..prices.len())
            .filter(|&i| prices[i].price.is_finite())
            .collect();
        order.sort_by(|&a, &b| {
            prices[a]
                .price
                .total_cmp(&prices[b].price)
                .then_with(|| prices[a].timestamp.cmp(&prices[b].timestamp))
        });

        let mut rank_of = vec![None; prices.len()];
        for (rank, &slot) in order.iter().enumerate() {
            rank_of[slot] = Some(rank);
        }
        PriceRanking { order, rank_of }
    }

    /// Rank an optional series; a missing series ranks nothing
    pub fn rank_or_empty(prices: Option<&[PricePoint]>) -> PriceRanking {
        prices.map(Self::rank).unwrap_or_default()
    }
}
