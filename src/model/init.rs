//! Weight initialization.

use crate::autograd::Tensor;
use rand::Rng;

/// Xavier-initialized weight matrix of `fan_in * fan_out` values.
///
/// Samples a Gaussian via the Box-Muller transform with the Xavier
/// standard deviation `sqrt(2 / (fan_in + fan_out))`.
pub fn xavier<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Tensor {
    let std = (2.0 / (fan_in + fan_out) as f64).sqrt();
    let data: Vec<f32> = (0..fan_in * fan_out)
        .map(|_| {
            let u1: f64 = rng.random::<f64>().max(1e-10);
            let u2: f64 = rng.random::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            (z * std) as f32
        })
        .collect();
    Tensor::from_vec(data, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn same_seed_same_weights() {
        let mut a = StdRng::seed_from_u64(17);
        let mut b = StdRng::seed_from_u64(17);
        let wa = xavier(&mut a, 8, 4);
        let wb = xavier(&mut b, 8, 4);
        assert_eq!(wa.data(), wb.data());
    }

    #[test]
    fn scale_shrinks_with_fan_size() {
        let mut rng = StdRng::seed_from_u64(5);
        let small = xavier(&mut rng, 4, 4);
        let mut rng = StdRng::seed_from_u64(5);
        let large = xavier(&mut rng, 400, 400);

        let spread = |t: &Tensor| {
            t.data().iter().map(|v| v * v).sum::<f32>() / t.len() as f32
        };
        assert!(spread(&large) < spread(&small));
    }

    #[test]
    fn weights_track_gradients() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = xavier(&mut rng, 3, 3);
        assert_eq!(w.len(), 9);
        assert!(w.requires_grad());
    }
}
