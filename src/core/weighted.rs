//! Weighted random selection over integer weights.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplerError {
    #[error("weight must be a positive integer")]
    InvalidWeight,
    #[error("cannot draw from an empty container")]
    EmptyContainer,
    #[error("roll {roll} is outside 1..={max}")]
    OutOfRange { roll: u64, max: u64 },
}

/// An append-only list of values, each selected with probability
/// proportional to its weight.
///
/// The cumulative weight array is kept alongside the items so both random
/// draws and explicit die rolls are a binary search.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    items: Vec<(u32, T)>,
    cumulative: Vec<u64>,
}

impl<T> Default for WeightedSampler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WeightedSampler<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cumulative: Vec::new(),
        }
    }

    /// Build a sampler from `(weight, value)` pairs, failing on the first
    /// zero weight.
    pub fn from_weighted<I>(pairs: I) -> Result<Self, SamplerError>
    where
        I: IntoIterator<Item = (u32, T)>,
    {
        let mut sampler = Self::new();
        for (weight, value) in pairs {
            sampler.add(weight, value)?;
        }
        Ok(sampler)
    }

    /// Build a sampler where every value has weight 1.
    pub fn uniform<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut sampler = Self::new();
        for value in values {
            sampler.push(1, value);
        }
        sampler
    }

    /// Append a value and return the cumulative weight after insertion.
    pub fn add(&mut self, weight: u32, value: T) -> Result<u64, SamplerError> {
        if weight == 0 {
            return Err(SamplerError::InvalidWeight);
        }
        Ok(self.push(weight, value))
    }

    fn push(&mut self, weight: u32, value: T) -> u64 {
        let total = self.total_weight() + u64::from(weight);
        self.items.push((weight, value));
        self.cumulative.push(total);
        total
    }

    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate `(weight, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.items.iter().map(|(w, v)| (*w, v))
    }

    /// Draw a value at random. Each item is returned with probability
    /// `weight / total_weight`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T, SamplerError> {
        let total = self.total_weight();
        if total == 0 {
            return Err(SamplerError::EmptyContainer);
        }
        let roll = rng.gen_range(1..=total);
        Ok(&self.items[self.index_of(roll)].1)
    }

    /// Look up the value whose cumulative range contains `roll`.
    pub fn resolve(&self, roll: u64) -> Result<&T, SamplerError> {
        let max = self.total_weight();
        if roll == 0 || roll > max {
            return Err(SamplerError::OutOfRange { roll, max });
        }
        Ok(&self.items[self.index_of(roll)].1)
    }

    // Caller guarantees 1 <= roll <= total.
    fn index_of(&self, roll: u64) -> usize {
        self.cumulative.partition_point(|&c| c < roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn add_returns_running_total() {
        let mut s = WeightedSampler::new();
        assert_eq!(s.add(3, "a").unwrap(), 3);
        assert_eq!(s.add(1, "b").unwrap(), 4);
        assert_eq!(s.add(6, "c").unwrap(), 10);
        assert_eq!(s.total_weight(), 10);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn zero_weight_rejected() {
        let mut s = WeightedSampler::new();
        assert_eq!(s.add(0, "a"), Err(SamplerError::InvalidWeight));
        assert!(s.is_empty());
    }

    #[test]
    fn empty_draw_fails() {
        let s: WeightedSampler<&str> = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(s.draw(&mut rng), Err(SamplerError::EmptyContainer));
    }

    #[test]
    fn single_item_always_returned() {
        let s = WeightedSampler::uniform(["only"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(*s.draw(&mut rng).unwrap(), "only");
        }
    }

    #[test]
    fn resolve_covers_every_roll() {
        let s = WeightedSampler::from_weighted([(2, 'a'), (1, 'b'), (3, 'c')]).unwrap();
        let got: Vec<char> = (1..=6).map(|r| *s.resolve(r).unwrap()).collect();
        assert_eq!(got, vec!['a', 'a', 'b', 'c', 'c', 'c']);
    }

    #[test]
    fn resolve_out_of_range() {
        let s = WeightedSampler::from_weighted([(2, 'a'), (1, 'b')]).unwrap();
        assert_eq!(
            s.resolve(0),
            Err(SamplerError::OutOfRange { roll: 0, max: 3 })
        );
        assert_eq!(
            s.resolve(4),
            Err(SamplerError::OutOfRange { roll: 4, max: 3 })
        );
    }

    #[test]
    fn ties_in_weight_are_fine() {
        let s = WeightedSampler::from_weighted([(2, 'x'), (2, 'y')]).unwrap();
        assert_eq!(*s.resolve(2).unwrap(), 'x');
        assert_eq!(*s.resolve(3).unwrap(), 'y');
    }

    #[test]
    fn draw_matches_weight_shares() {
        let s = WeightedSampler::from_weighted([(1, 0usize), (2, 1), (7, 2)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0u32; 3];
        let n = 100_000;
        for _ in 0..n {
            counts[*s.draw(&mut rng).unwrap()] += 1;
        }
        for (i, expected) in [0.1, 0.2, 0.7].iter().enumerate() {
            let share = f64::from(counts[i]) / f64::from(n);
            assert!(
                (share - expected).abs() < 0.01,
                "item {} drawn {:.4}, expected {:.2}",
                i,
                share,
                expected
            );
        }
    }
}
