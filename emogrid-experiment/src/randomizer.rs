//! Per-participant stimulus randomization.
//!
//! Image order is shuffled within each category, the pool is split into two
//! disjoint phase sets, and a per-trial interleaving matrix decides which
//! category each presentation position shows.

use emogrid_core::{CategoryPool, StimulusPool};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::SessionError;

/// A shuffled pool plus the permutation applied to each category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomizedPool {
    pub pool: StimulusPool,
    /// `permutations[c][j]` is the original index of the image now at
    /// position `j` in category `c`.
    pub permutations: Vec<Vec<usize>>,
}

/// Shuffles each category's images with a single seeded stream.
///
/// The stream is consumed sequentially across categories, so categories are
/// deliberately not independent of one another: the whole ordering is a pure
/// function of (pool contents, seed), which is what makes a participant's
/// session reproducible from their id.
pub fn randomize_within_category(pool: &StimulusPool, seed: u64) -> RandomizedPool {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut categories = Vec::with_capacity(pool.categories.len());
    let mut permutations = Vec::with_capacity(pool.categories.len());

    for category in &pool.categories {
        let mut indices: Vec<usize> = (0..category.images.len()).collect();
        indices.shuffle(&mut rng);
        let images = indices.iter().map(|&i| category.images[i].clone()).collect();
        categories.push(CategoryPool {
            name: category.name.clone(),
            images,
        });
        permutations.push(indices);
    }

    RandomizedPool {
        pool: StimulusPool { categories },
        permutations,
    }
}

/// Category presentation order: one row per presentation position, each row
/// an independent shuffle of `0..num_categories`, so every trial row shows
/// every category exactly once.
pub fn build_category_interleaving(
    num_trials: usize,
    num_categories: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<usize>> {
    (0..num_trials)
        .map(|_| {
            let mut row: Vec<usize> = (0..num_categories).collect();
            row.shuffle(rng);
            row
        })
        .collect()
}

/// Splits each category into two contiguous, non-overlapping slices of
/// `phase_size`: `[0, phase_size)` for Phase 1 and `[phase_size, 2*phase_size)`
/// for Phase 3.
pub fn split_into_phases(
    pool: &StimulusPool,
    phase_size: usize,
) -> Result<(StimulusPool, StimulusPool), SessionError> {
    let needed = 2 * phase_size;
    let mut phase1 = Vec::with_capacity(pool.categories.len());
    let mut phase3 = Vec::with_capacity(pool.categories.len());

    for category in &pool.categories {
        if category.images.len() < needed {
            return Err(SessionError::PhaseSplit {
                category: category.name.clone(),
                available: category.images.len(),
                needed,
            });
        }
        phase1.push(CategoryPool {
            name: category.name.clone(),
            images: category.images[..phase_size].to_vec(),
        });
        phase3.push(CategoryPool {
            name: category.name.clone(),
            images: category.images[phase_size..needed].to_vec(),
        });
    }

    Ok((
        StimulusPool { categories: phase1 },
        StimulusPool { categories: phase3 },
    ))
}

/// The common per-category stimulus count across all phase sets, or 0 when
/// any category or phase disagrees. Callers must treat 0 as a fatal
/// precondition failure, never as an empty session.
pub fn check_num_stim(phases: &[&StimulusPool]) -> usize {
    let mut common = None;
    for phase in phases {
        match (phase.uniform_len(), common) {
            (Some(n), None) => common = Some(n),
            (Some(n), Some(c)) if n == c => {}
            _ => {
                eprintln!(
                    "[ERROR] Number of image stimuli is not equal between phases and/or between image categories."
                );
                return 0;
            }
        }
    }
    common.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use emogrid_core::ImageStimulus;
    use pretty_assertions::assert_eq;

    use super::*;

    fn pool(counts: &[usize]) -> StimulusPool {
        StimulusPool {
            categories: counts
                .iter()
                .enumerate()
                .map(|(c, &n)| CategoryPool {
                    name: format!("cat{c}"),
                    images: (0..n)
                        .map(|i| ImageStimulus::new(format!("{c}_{i}"), format!("{c}/{i}.jpg")))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn shuffle_is_a_permutation_of_each_category() {
        let original = pool(&[8, 8, 8]);
        let randomized = randomize_within_category(&original, 42);
        for (before, after) in original
            .categories
            .iter()
            .zip(&randomized.pool.categories)
        {
            let mut sorted: Vec<_> = after.images.clone();
            sorted.sort_by(|a, b| a.id.cmp(&b.id));
            assert_eq!(sorted, before.images, "same multiset, every element once");
        }
    }

    #[test]
    fn shuffle_is_reproducible_per_seed() {
        let original = pool(&[6, 6, 6]);
        let a = randomize_within_category(&original, 7);
        let b = randomize_within_category(&original, 7);
        assert_eq!(a, b);
        let c = randomize_within_category(&original, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn permutation_indices_describe_the_reorder() {
        let original = pool(&[5]);
        let randomized = randomize_within_category(&original, 3);
        for (j, &i) in randomized.permutations[0].iter().enumerate() {
            assert_eq!(
                randomized.pool.categories[0].images[j],
                original.categories[0].images[i]
            );
        }
    }

    #[test]
    fn interleaving_rows_cover_every_category_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let order = build_category_interleaving(12, 3, &mut rng);
        assert_eq!(order.len(), 12);
        for row in &order {
            let mut sorted = row.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2]);
        }
    }

    #[test]
    fn split_is_disjoint_and_gap_free() {
        let original = pool(&[6, 6]);
        let (phase1, phase3) = split_into_phases(&original, 3).unwrap();
        for (c, category) in original.categories.iter().enumerate() {
            assert_eq!(phase1.categories[c].images, category.images[..3].to_vec());
            assert_eq!(phase3.categories[c].images, category.images[3..6].to_vec());
        }
    }

    #[test]
    fn split_rejects_short_categories() {
        let err = split_into_phases(&pool(&[6, 5]), 3).unwrap_err();
        assert!(matches!(err, SessionError::PhaseSplit { needed: 6, .. }));
    }

    #[test]
    fn check_num_stim_flags_mismatch_with_zero() {
        let phase1 = pool(&[3, 3, 3]);
        let ok = pool(&[3, 3, 3]);
        let bad = pool(&[3, 3, 2]);
        assert_eq!(check_num_stim(&[&phase1, &ok]), 3);
        assert_eq!(check_num_stim(&[&phase1, &bad]), 0);
        assert_eq!(check_num_stim(&[]), 0);
    }

    #[test]
    fn check_num_stim_flags_mismatch_within_a_phase() {
        assert_eq!(check_num_stim(&[&pool(&[4, 4])]), 4);
        assert_eq!(check_num_stim(&[&pool(&[3, 2, 3])]), 0);
    }
}
