use rand::Rng;
use rand::seq::SliceRandom;

/// In-place Fisher-Yates shuffle.
///
/// `SliceRandom::shuffle` walks from the last index down to 1, swapping each
/// slot with a uniformly drawn index in `[0, i]`.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}
