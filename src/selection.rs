//! Weighted random selection
//!
//! Shared by quest assignment and perk assignment. Candidates are filtered by
//! the caller before picking.

use rand::Rng;

/// Something that can be drawn with a relative weight
pub trait Weighted {
    /// Relative weight; `None` means 1
    fn weight(&self) -> Option<f64>;
}

impl<T: Weighted + ?Sized> Weighted for std::sync::Arc<T> {
    fn weight(&self) -> Option<f64> {
        (**self).weight()
    }
}

fn weight_of<T: Weighted>(candidate: &T) -> f64 {
    candidate.weight().unwrap_or(1.0)
}

/// Pick one candidate with probability proportional to its weight.
///
/// Returns `None` only for an empty slice.
pub fn weighted_pick<'a, T: Weighted, R: Rng + ?Sized>(
    candidates: &'a [T],
    rng: &mut R,
) -> Option<&'a T> {
    let last = candidates.last()?;

    let mut total: f64 = candidates.iter().map(weight_of).sum();
    if !(total > 0.0) || !total.is_finite() {
        total = 1.0;
    }

    let mut remaining = rng.gen_range(0.0..total);
    for candidate in candidates {
        remaining -= weight_of(candidate);
        if remaining <= 0.0 {
            return Some(candidate);
        }
    }

    // Float drift can leave a sliver of weight unconsumed
    Some(last)
}

/// Filter candidates with `eligible`, then pick among the survivors
pub fn pick_eligible<'a, T, R, F>(candidates: &'a [T], rng: &mut R, eligible: F) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
    F: Fn(&T) -> bool,
{
    let filtered: Vec<&T> = candidates.iter().filter(|c| eligible(*c)).collect();
    let picked = weighted_pick(&filtered, rng)?;
    Some(*picked)
}

impl<T: Weighted> Weighted for &T {
    fn weight(&self) -> Option<f64> {
        (**self).weight()
    }
}
