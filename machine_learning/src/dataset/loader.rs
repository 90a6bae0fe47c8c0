use std::num::NonZeroUsize;

use rand::{rngs::StdRng, seq::SliceRandom};

use super::{Batch, Dataset};

/// Iterates a `Dataset` in batches.
///
/// Every call to `batches` starts a new traversal. When the loader owns a random number
/// generator the order is reshuffled before each traversal, otherwise the dataset order is kept.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: Dataset,
    batch_size: NonZeroUsize,
    order: Vec<usize>,
    rng: Option<StdRng>,
}

impl DataLoader {
    /// Creates a new `DataLoader`.
    ///
    /// # Arguments
    /// * `dataset` - The samples to iterate.
    /// * `batch_size` - The amount of samples per batch, the last batch may hold fewer.
    /// * `shuffle` - The generator used to shuffle each traversal, `None` keeps the order.
    pub fn new(dataset: Dataset, batch_size: NonZeroUsize, shuffle: Option<StdRng>) -> Self {
        Self {
            order: (0..dataset.len()).collect(),
            dataset,
            batch_size,
            rng: shuffle,
        }
    }

    /// Returns the amount of samples in a full traversal.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size.get())
    }

    /// Starts a new traversal over the dataset.
    pub fn batches(&mut self) -> impl Iterator<Item = Batch> + '_ {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }

        let dataset = &self.dataset;
        self.order
            .chunks(self.batch_size.get())
            .map(move |indices| dataset.batch(indices))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn dataset(n: usize) -> Dataset {
        let images = (0..n).map(|v| v as f32).collect();
        Dataset::new(images, (0..n).collect(), (1, 1, 1)).unwrap()
    }

    fn labels(loader: &mut DataLoader) -> Vec<Vec<usize>> {
        loader.batches().map(|batch| batch.y().to_vec()).collect()
    }

    #[test]
    fn fixed_order_with_short_last_batch() {
        let batch_size = NonZeroUsize::new(2).unwrap();
        let mut loader = DataLoader::new(dataset(5), batch_size, None);

        assert_eq!(loader.num_batches(), 3);
        assert_eq!(labels(&mut loader), vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert_eq!(labels(&mut loader), vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn shuffled_traversals_differ_but_cover_everything() {
        let batch_size = NonZeroUsize::new(4).unwrap();
        let rng = StdRng::seed_from_u64(42);
        let mut loader = DataLoader::new(dataset(64), batch_size, Some(rng));

        let first: Vec<usize> = labels(&mut loader).concat();
        let second: Vec<usize> = labels(&mut loader).concat();
        assert_ne!(first, second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_order() {
        let batch_size = NonZeroUsize::new(8).unwrap();
        let mut a = DataLoader::new(dataset(32), batch_size, Some(StdRng::seed_from_u64(1)));
        let mut b = DataLoader::new(dataset(32), batch_size, Some(StdRng::seed_from_u64(1)));

        assert_eq!(labels(&mut a), labels(&mut b));
    }
}
