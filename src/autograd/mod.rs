//! Tape-based autograd engine.
//!
//! Forward operations record backward nodes on their results; calling
//! [`backward`] on the final tensor walks the recorded graph and fills the
//! gradient cells of every tensor that requires one.

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::{bias_add, chunk_max_pool, concat_features, matmul, max_over_time, relu};
pub use tensor::Tensor;

/// Run the backward pass starting from `tensor`.
///
/// With `grad_output` of `None` the seed gradient is all ones, which is the
/// usual case for a scalar loss.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    match grad_output {
        Some(grad) => tensor.set_grad(grad),
        None => tensor.set_grad(ndarray::Array1::ones(tensor.len())),
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
