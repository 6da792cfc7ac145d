use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::linear_algebra::Tensor;

/// Paired inputs and targets with the same number of rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

/// Splits a data set into batches.
pub trait DataIterator {
    fn batches<'a>(
        &self,
        inputs: &'a Tensor,
        targets: &'a Tensor,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Iterator<Item = Batch> + 'a>>;
}

/// Returns the number of rows shared by `inputs` and `targets`.
fn row_count(inputs: &Tensor, targets: &Tensor) -> Result<usize> {
    let rows = |tensor: &Tensor| {
        tensor.shape().leading().ok_or(Error::RankMismatch {
            expected: 1,
            got: 0,
        })
    };

    let (input_rows, target_rows) = (rows(inputs)?, rows(targets)?);
    if input_rows != target_rows {
        return Err(Error::BatchSizeMismatch {
            inputs: input_rows,
            targets: target_rows,
        });
    }
    Ok(input_rows)
}

/// Consecutive slices of `batch_size` rows. When shuffling, the order of the slices is
/// randomized but the rows within each slice are not. The last batch may be short.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BatchIterator {
    pub batch_size: usize,
    pub shuffle: bool,
}

impl BatchIterator {
    pub fn new(batch_size: usize, shuffle: bool) -> Self {
        Self {
            batch_size,
            shuffle,
        }
    }
}

impl Default for BatchIterator {
    fn default() -> Self {
        Self::new(32, true)
    }
}

impl DataIterator for BatchIterator {
    fn batches<'a>(
        &self,
        inputs: &'a Tensor,
        targets: &'a Tensor,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Iterator<Item = Batch> + 'a>> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_owned()));
        }

        let rows = row_count(inputs, targets)?;
        let batch_size = self.batch_size;

        let mut starts = (0..rows).step_by(batch_size).collect::<Vec<_>>();
        if self.shuffle {
            starts.shuffle(rng);
        }

        Ok(Box::new(starts.into_iter().map(move |start| {
            let end = start + batch_size;
            Batch {
                inputs: inputs.slice_rows(start, end),
                targets: targets.slice_rows(start, end),
            }
        })))
    }
}

/// The whole data set as a single batch, with its rows permuted when shuffling.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DataSetIterator {
    pub shuffle: bool,
}

impl DataSetIterator {
    pub fn new(shuffle: bool) -> Self {
        Self { shuffle }
    }
}

impl Default for DataSetIterator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DataIterator for DataSetIterator {
    fn batches<'a>(
        &self,
        inputs: &'a Tensor,
        targets: &'a Tensor,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Iterator<Item = Batch> + 'a>> {
        let rows = row_count(inputs, targets)?;

        let batch = if self.shuffle {
            let mut indices = (0..rows).collect::<Vec<_>>();
            indices.shuffle(rng);
            Batch {
                inputs: inputs.select_rows(&indices),
                targets: targets.select_rows(&indices),
            }
        } else {
            Batch {
                inputs: inputs.clone(),
                targets: targets.clone(),
            }
        };

        Ok(Box::new(std::iter::once(batch)))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    use crate::linear_algebra::Value;

    fn data(rows: usize) -> (Tensor, Tensor) {
        let inputs = (0..rows * 2).map(|x| x as Value).collect::<Vec<_>>();
        let targets = (0..rows).map(|x| x as Value).collect::<Vec<_>>();
        (
            Tensor::from_values((rows, 2), inputs).unwrap(),
            Tensor::from_values((rows, 1), targets).unwrap(),
        )
    }

    #[test]
    fn batches_in_order() {
        let (inputs, targets) = data(5);
        let mut rng = StdRng::seed_from_u64(0);

        let batches = BatchIterator::new(2, false)
            .batches(&inputs, &targets, &mut rng)
            .unwrap()
            .collect::<Vec<_>>();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].inputs, Tensor::from([[0.0, 1.0], [2.0, 3.0]]));
        assert_eq!(batches[1].targets, Tensor::from([[2.0], [3.0]]));
        assert_eq!(batches[2].inputs, Tensor::from([[8.0, 9.0]]));
        assert_eq!(batches[2].targets, Tensor::from([[4.0]]));
    }

    #[test]
    fn shuffled_batches_keep_rows_together() {
        let (inputs, targets) = data(10);
        let mut rng = StdRng::seed_from_u64(1);

        let batches = BatchIterator::new(3, true)
            .batches(&inputs, &targets, &mut rng)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(batches.len(), 4);

        let mut seen = Vec::new();
        for batch in &batches {
            assert_eq!(batch.inputs.shape()[0], batch.targets.shape()[0]);
            for (row, &target) in batch.targets.as_slice().iter().enumerate() {
                // Input row i holds [2i, 2i + 1] and target row i holds i.
                assert_eq!(batch.inputs.get(&[row, 0]), Some(2.0 * target));
                seen.push(target as usize);
            }
        }

        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let (inputs, targets) = data(20);
        let iterator = BatchIterator::new(4, true);

        let run = |seed| {
            iterator
                .batches(&inputs, &targets, &mut StdRng::seed_from_u64(seed))
                .unwrap()
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn whole_data_set() {
        let (inputs, targets) = data(6);
        let mut rng = StdRng::seed_from_u64(2);

        let batches = DataSetIterator::new(false)
            .batches(&inputs, &targets, &mut rng)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(
            batches,
            vec![Batch {
                inputs: inputs.clone(),
                targets: targets.clone()
            }]
        );

        let shuffled = DataSetIterator::new(true)
            .batches(&inputs, &targets, &mut rng)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(shuffled.len(), 1);

        let batch = &shuffled[0];
        assert_eq!(batch.inputs.shape(), inputs.shape());
        for (row, &target) in batch.targets.as_slice().iter().enumerate() {
            assert_eq!(batch.inputs.get(&[row, 1]), Some(2.0 * target + 1.0));
        }
    }

    #[test]
    fn errors() {
        let (inputs, _) = data(4);
        let (_, targets) = data(3);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(matches!(
            BatchIterator::new(2, false).batches(&inputs, &targets, &mut rng),
            Err(Error::BatchSizeMismatch {
                inputs: 4,
                targets: 3
            })
        ));
        assert!(matches!(
            DataSetIterator::new(false).batches(&inputs, &targets, &mut rng),
            Err(Error::BatchSizeMismatch { .. })
        ));
        assert!(matches!(
            BatchIterator::new(0, false).batches(&inputs, &inputs, &mut rng),
            Err(Error::InvalidConfig(_))
        ));
    }
}
