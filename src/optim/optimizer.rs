//! Optimizer trait.

use crate::Tensor;

/// Gradient-descent update rule.
///
/// Parameters are borrowed from the model for each step, so the methods
/// take mutable references rather than owned tensors.
pub trait Optimizer {
    /// Apply one update to every parameter that has a gradient.
    fn step(&mut self, params: &mut [&mut Tensor]);

    /// Clear the gradients of all parameters.
    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    fn lr(&self) -> f32;

    fn set_lr(&mut self, lr: f32);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainDescent {
        lr: f32,
    }

    impl Optimizer for PlainDescent {
        fn step(&mut self, params: &mut [&mut Tensor]) {
            for param in params.iter_mut() {
                if let Some(grad) = param.grad() {
                    *param.data_mut() = param.data() - &(&grad * self.lr);
                }
            }
        }

        fn lr(&self) -> f32 {
            self.lr
        }

        fn set_lr(&mut self, lr: f32) {
            self.lr = lr;
        }
    }

    #[test]
    fn step_skips_parameters_without_gradient() {
        let mut with_grad = Tensor::from_vec(vec![1.0], true);
        let mut without = Tensor::from_vec(vec![1.0], true);
        with_grad.set_grad(ndarray::arr1(&[1.0]));

        let mut opt = PlainDescent { lr: 0.5 };
        opt.step(&mut [&mut with_grad, &mut without]);

        assert_eq!(with_grad.data()[0], 0.5);
        assert_eq!(without.data()[0], 1.0);
    }

    #[test]
    fn zero_grad_clears_everything() {
        let mut a = Tensor::from_vec(vec![1.0], true);
        let mut b = Tensor::from_vec(vec![2.0], true);
        a.set_grad(ndarray::arr1(&[1.0]));
        b.set_grad(ndarray::arr1(&[1.0]));

        let mut opt = PlainDescent { lr: 0.1 };
        opt.zero_grad(&mut [&mut a, &mut b]);

        assert!(a.grad().is_none());
        assert!(b.grad().is_none());
    }

    #[test]
    fn lr_is_adjustable() {
        let mut opt = PlainDescent { lr: 0.1 };
        opt.set_lr(0.01);
        assert_eq!(opt.lr(), 0.01);
    }
}
