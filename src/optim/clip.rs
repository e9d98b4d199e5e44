//! Gradient clipping.

use crate::Tensor;

/// Clip gradients by their global norm.
///
/// The global norm is taken over every gradient in `params`; when it
/// exceeds `max_norm` all gradients are scaled down by the same factor,
/// which caps the update size without changing its direction.
///
/// Returns the global norm measured before clipping.
pub fn clip_grad_norm(params: &mut [&mut Tensor], max_norm: f32) -> f32 {
    let mut total_norm_sq = 0.0;
    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_norm_sq += grad.iter().map(|&g| g * g).sum::<f32>();
        }
    }

    let global_norm = total_norm_sq.sqrt();

    if global_norm > max_norm && global_norm > 0.0 {
        let clip_coef = max_norm / global_norm;
        for param in params.iter_mut() {
            if let Some(grad) = param.grad() {
                param.set_grad(grad * clip_coef);
            }
        }
    }

    global_norm
}
