use std::ops::Range;

use ml_core::{DataError, Dataset, SelectionError};
use rand::{seq::index, Rng};

/// How a strategy partitions the training set before solving one sub-problem per part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One sub-problem per class, budgets split proportionally to class sizes.
    PerClass,
    /// A single sub-problem whose elements are consecutive mini-batches.
    PerBatch { batch_size: usize },
}

/// Fails unless `0 < budget <= pool`.
pub fn check_budget(budget: usize, pool: usize) -> Result<(), SelectionError> {
    if budget == 0 {
        return Err(SelectionError::EmptyBudget);
    }

    if budget > pool {
        return Err(SelectionError::BudgetExceedsPool { budget, pool });
    }

    Ok(())
}

/// Splits `budget` across groups proportionally to their sizes with the largest remainder
/// method, so the parts always add up to `budget`.
///
/// Ties between equal remainders go to the earlier group. No part exceeds its group size as
/// long as `budget` does not exceed the total size.
pub fn apportion(budget: usize, sizes: &[usize]) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }

    let mut parts = Vec::with_capacity(sizes.len());
    let mut remainders = Vec::with_capacity(sizes.len());

    for (i, &size) in sizes.iter().enumerate() {
        let quota = budget as u128 * size as u128;
        parts.push((quota / total as u128) as usize);
        remainders.push((quota % total as u128, i));
    }

    let assigned: usize = parts.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for &(_, i) in remainders.iter().take(budget.saturating_sub(assigned)) {
        parts[i] += 1;
    }

    parts
}

/// Collects the indices of every class, in dataset order.
pub fn class_groups<D: Dataset + ?Sized>(data: &D) -> Result<Vec<Vec<usize>>, DataError> {
    let mut groups = vec![Vec::new(); data.num_classes().max(1)];

    for i in 0..data.len() {
        let class = data.class_of(i)?;
        let group = groups
            .get_mut(class)
            .ok_or(DataError::InvalidSample("class is not below the amount of classes"))?;
        group.push(i);
    }

    Ok(groups)
}

/// Consecutive mini-batch ranges over `0..len`, the last one possibly shorter.
pub fn batch_ranges(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

/// Turns weighted mini-batches back into weighted examples: every example inherits its batch's
/// weight. The result is trimmed to at most `budget` entries.
pub fn expand_batches(
    chosen: &[(usize, f32)],
    batches: &[Range<usize>],
    budget: usize,
) -> (Vec<usize>, Vec<f32>) {
    let mut indices = Vec::with_capacity(budget);
    let mut gammas = Vec::with_capacity(budget);

    'outer: for &(batch, weight) in chosen {
        for i in batches[batch].clone() {
            if indices.len() == budget {
                break 'outer;
            }

            indices.push(i);
            gammas.push(weight);
        }
    }

    (indices, gammas)
}

/// Tops `indices` up to `budget` with uniformly drawn unselected examples of weight 1.
pub fn fill_random<R: Rng + ?Sized>(
    indices: &mut Vec<usize>,
    gammas: &mut Vec<f32>,
    budget: usize,
    len: usize,
    rng: &mut R,
) {
    let missing = budget.saturating_sub(indices.len());
    if missing == 0 {
        return;
    }

    let mut taken = vec![false; len];
    for &i in indices.iter() {
        taken[i] = true;
    }

    let remaining: Vec<_> = (0..len).filter(|&i| !taken[i]).collect();
    let amount = missing.min(remaining.len());

    for pos in index::sample(rng, remaining.len(), amount) {
        indices.push(remaining[pos]);
        gammas.push(1.);
    }
}
