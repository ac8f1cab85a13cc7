//! Sampling helpers shared by the generators
//!
//! All generators take `&mut R where R: Rng + ?Sized` so callers decide the
//! source: a seeded `StdRng` in tests, entropy in production.

use rand::Rng;

/// Uniform sample in [0, 1)
pub fn unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..1.0)
}

/// `base + r * span`, r in [0, 1)
pub fn between<R: Rng + ?Sized>(rng: &mut R, base: f64, span: f64) -> f64 {
    base + unit(rng) * span
}

/// Centered jitter `(r - 0.5) * span`, within [-span/2, span/2)
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, span: f64) -> f64 {
    (unit(rng) - 0.5) * span
}

/// Pick one element uniformly
pub fn choose<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
