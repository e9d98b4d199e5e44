//! Backward node trait.

/// A recorded node in the backward graph.
///
/// Implementations read the gradient of the tensor they produced, push it
/// to their inputs, and recurse into the inputs' own nodes.
pub trait BackwardOp {
    fn backward(&self);
}
