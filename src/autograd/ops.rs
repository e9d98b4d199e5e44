//! Differentiable operations.
//!
//! Every operation computes its result eagerly and, when any input tracks
//! gradients, records a backward node holding clones of the inputs and a
//! handle to the result's gradient cell. Matrices are flat row-major
//! buffers; callers pass the dimensions explicitly.

use super::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Matrix product `C = A @ B` with `A` of shape `m x k` and `B` of `k x n`.
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    assert_eq!(a.len(), m * k, "matmul: lhs size mismatch");
    assert_eq!(b.len(), k * n, "matmul: rhs size mismatch");

    let a_data = a.data();
    let b_data = b.data();
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let left = a_data[i * k + p];
            if left == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += left * b_data[p * n + j];
            }
        }
    }

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let (m, k, n) = (self.m, self.k, self.n);

            if self.a.requires_grad() {
                // grad_A[i,p] = sum_j grad_C[i,j] * B[p,j]
                let b_data = self.b.data();
                let mut grad_a = vec![0.0; m * k];
                for i in 0..m {
                    for j in 0..n {
                        let g = grad_output[i * n + j];
                        if g == 0.0 {
                            continue;
                        }
                        for p in 0..k {
                            grad_a[i * k + p] += g * b_data[p * n + j];
                        }
                    }
                }
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            if self.b.requires_grad() {
                // grad_B[p,j] = sum_i A[i,p] * grad_C[i,j]
                let a_data = self.a.data();
                let mut grad_b = vec![0.0; k * n];
                for i in 0..m {
                    for p in 0..k {
                        let left = a_data[i * k + p];
                        if left == 0.0 {
                            continue;
                        }
                        for j in 0..n {
                            grad_b[p * n + j] += left * grad_output[i * n + j];
                        }
                    }
                }
                self.b.accumulate_grad(Array1::from(grad_b));
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b.backward_op() {
                op.backward();
            }
        }
    }
}

/// ReLU activation.
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // grad_a = grad * (a > 0)
                let grad_a = grad * &self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Add a bias row to every row of an `rows x cols` matrix.
pub fn bias_add(x: &Tensor, bias: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "bias_add: input size mismatch");
    assert_eq!(bias.len(), cols, "bias_add: bias size mismatch");

    let x_data = x.data();
    let bias_data = bias.data();
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[r * cols + c] = x_data[r * cols + c] + bias_data[c];
        }
    }

    let requires_grad = x.requires_grad() || bias.requires_grad();
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BiasAddBackward {
            x: x.clone(),
            bias: bias.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct BiasAddBackward {
    x: Tensor,
    bias: Tensor,
    rows: usize,
    cols: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for BiasAddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                // grad_bias[c] = sum_r grad[r,c]
                let mut grad_bias = vec![0.0; self.cols];
                for r in 0..self.rows {
                    for c in 0..self.cols {
                        grad_bias[c] += grad[r * self.cols + c];
                    }
                }
                self.bias.accumulate_grad(Array1::from(grad_bias));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.backward_op() {
                op.backward();
            }
        }
    }
}

/// Max over the position axis of an `rows x positions x cols` stack.
///
/// Produces one `cols`-wide row per input row. Gradients flow to the
/// position that won the max; ties go to the earliest position.
pub fn max_over_time(x: &Tensor, rows: usize, positions: usize, cols: usize) -> Tensor {
    chunk_max_pool(x, rows, positions, cols, 1)
}

/// Chunked max pooling over the position axis.
///
/// Positions are split into `chunks` contiguous segments of near-equal
/// length (earlier segments absorb the remainder) and each segment is
/// max-pooled per channel, giving `chunks * cols` features per row.
pub fn chunk_max_pool(
    x: &Tensor,
    rows: usize,
    positions: usize,
    cols: usize,
    chunks: usize,
) -> Tensor {
    assert!(chunks >= 1, "chunk_max_pool: chunks must be at least 1");
    assert!(
        chunks <= positions,
        "chunk_max_pool: more chunks than positions"
    );
    assert_eq!(
        x.len(),
        rows * positions * cols,
        "chunk_max_pool: input size mismatch"
    );

    let bounds = chunk_bounds(positions, chunks);
    let x_data = x.data();
    let mut out = vec![0.0; rows * chunks * cols];
    for r in 0..rows {
        for (s, &(start, end)) in bounds.iter().enumerate() {
            for c in 0..cols {
                let mut best = f32::NEG_INFINITY;
                for p in start..end {
                    let v = x_data[(r * positions + p) * cols + c];
                    if v > best {
                        best = v;
                    }
                }
                out[(r * chunks + s) * cols + c] = best;
            }
        }
    }

    let requires_grad = x.requires_grad();
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ChunkMaxPoolBackward {
            x: x.clone(),
            rows,
            positions,
            cols,
            chunks,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ChunkMaxPoolBackward {
    x: Tensor,
    rows: usize,
    positions: usize,
    cols: usize,
    chunks: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ChunkMaxPoolBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                let bounds = chunk_bounds(self.positions, self.chunks);
                let x_data = self.x.data();
                let mut grad_x = vec![0.0; self.rows * self.positions * self.cols];
                for r in 0..self.rows {
                    for (s, &(start, end)) in bounds.iter().enumerate() {
                        for c in 0..self.cols {
                            let mut best = f32::NEG_INFINITY;
                            let mut winner = start;
                            for p in start..end {
                                let v = x_data[(r * self.positions + p) * self.cols + c];
                                if v > best {
                                    best = v;
                                    winner = p;
                                }
                            }
                            grad_x[(r * self.positions + winner) * self.cols + c] +=
                                grad[(r * self.chunks + s) * self.cols + c];
                        }
                    }
                }
                self.x.accumulate_grad(Array1::from(grad_x));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
        }
    }
}

/// Segment boundaries for chunked pooling; the first `positions % chunks`
/// segments are one position longer.
fn chunk_bounds(positions: usize, chunks: usize) -> Vec<(usize, usize)> {
    let base = positions / chunks;
    let rem = positions % chunks;
    let mut bounds = Vec::with_capacity(chunks);
    let mut start = 0;
    for s in 0..chunks {
        let len = base + usize::from(s < rem);
        bounds.push((start, start + len));
        start += len;
    }
    bounds
}

/// Concatenate per-row feature blocks into one `rows x sum(widths)` matrix.
///
/// `parts[i]` must have shape `rows x widths[i]`.
pub fn concat_features(parts: &[Tensor], rows: usize, widths: &[usize]) -> Tensor {
    assert_eq!(parts.len(), widths.len(), "concat_features: arity mismatch");
    for (part, &w) in parts.iter().zip(widths) {
        assert_eq!(part.len(), rows * w, "concat_features: part size mismatch");
    }

    let total: usize = widths.iter().sum();
    let mut out = vec![0.0; rows * total];
    let mut offset = 0;
    for (part, &w) in parts.iter().zip(widths) {
        let part_data = part.data();
        for r in 0..rows {
            for c in 0..w {
                out[r * total + offset + c] = part_data[r * w + c];
            }
        }
        offset += w;
    }

    let requires_grad = parts.iter().any(Tensor::requires_grad);
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ConcatBackward {
            parts: parts.to_vec(),
            rows,
            widths: widths.to_vec(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ConcatBackward {
    parts: Vec<Tensor>,
    rows: usize,
    widths: Vec<usize>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ConcatBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            let total: usize = self.widths.iter().sum();
            let mut offset = 0;
            for (part, &w) in self.parts.iter().zip(&self.widths) {
                if part.requires_grad() {
                    let mut grad_part = vec![0.0; self.rows * w];
                    for r in 0..self.rows {
                        for c in 0..w {
                            grad_part[r * w + c] = grad[r * total + offset + c];
                        }
                    }
                    part.accumulate_grad(Array1::from(grad_part));
                }
                offset += w;
            }

            for part in &self.parts {
                if let Some(op) = part.backward_op() {
                    op.backward();
                }
            }
        }
    }
}
