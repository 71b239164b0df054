//! Tensor Operations
//!
//! A minimal f32 tensor sized for small decoder-only transformers. Data is a
//! flat `Vec<f32>` in row-major order plus a shape vector; that is all the
//! model needs, so there is no stride machinery, no views, and no aliasing.
//! Every operation allocates a fresh output tensor.
//!
//! ## Shape conventions
//!
//! - Hidden states: `[batch, seq, d_model]`
//! - Attention scores: `[batch, heads, seq, seq]`
//! - Per-head projections: `[batch, heads, seq, head_dim]`
//!
//! ## Parallelism
//!
//! The forward pass is a pure function, so the heavy operations (matmul,
//! softmax, element-wise arithmetic) parallelize freely with Rayon. Small
//! inputs stay sequential; the work threshold below keeps thread overhead
//! from dominating on femto-scale models.
//!
//! ## Failure behavior
//!
//! Shape violations here are integration bugs between layers, not caller
//! errors, so they panic with a message naming both shapes. Caller-facing
//! validation (sequence length, token range, mask broadcast) lives in the
//! embedding and mask modules and returns `Result` instead.

use rayon::prelude::*;

/// Minimum scalar multiply-adds before a 2D matmul goes parallel.
const PAR_MATMUL_THRESHOLD: usize = 1_000;

/// A dense row-major f32 array of arbitrary rank.
///
/// # Example
///
/// ```rust
/// use puck::Tensor;
///
/// let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
/// let b = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
/// let c = a.matmul(&b);
/// assert_eq!(c.data, vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Flat storage, row-major.
    pub data: Vec<f32>,
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor from flat data and a shape.
    ///
    /// # Panics
    ///
    /// Panics if the shape's element count does not match the data length.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self { data, shape }
    }

    /// Create a zero-filled tensor.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            data: vec![0.0; size],
            shape,
        }
    }

    /// Matrix multiplication.
    ///
    /// Two forms cover everything the decoder needs:
    ///
    /// - **2D × 2D** `[m, k] @ [k, n] -> [m, n]`, used by linear layers.
    /// - **4D × 4D** `[b, h, s1, k] @ [b, h, k, s2] -> [b, h, s1, s2]`,
    ///   the batched per-head form used by attention. Each `(batch, head)`
    ///   pair is an independent 2D product and runs on its own Rayon task.
    ///
    /// Large 2D products switch to a parallel row partition once the work
    /// exceeds [`PAR_MATMUL_THRESHOLD`] multiply-adds.
    ///
    /// # Panics
    ///
    /// Panics on incompatible inner dimensions or unsupported ranks.
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        match (self.shape.len(), other.shape.len()) {
            (2, 2) => self.matmul_2d(other),
            (4, 4) => self.matmul_4d(other),
            _ => panic!(
                "unsupported matmul ranks: {:?} @ {:?}",
                self.shape, other.shape
            ),
        }
    }

    fn matmul_2d(&self, other: &Tensor) -> Tensor {
        let (m, k) = (self.shape[0], self.shape[1]);
        let (k2, n) = (other.shape[0], other.shape[1]);
        assert_eq!(
            k, k2,
            "matmul inner dimensions differ: {:?} @ {:?}",
            self.shape, other.shape
        );

        let mut out = vec![0.0; m * n];

        let fill_row = |i: usize, out_row: &mut [f32]| {
            for (l, &a) in self.data[i * k..(i + 1) * k].iter().enumerate() {
                let b_row = &other.data[l * n..(l + 1) * n];
                // Row-times-row accumulation keeps both operands sequential
                // in memory, which LLVM auto-vectorizes.
                for (o, &b) in out_row.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        };

        if m * n * k >= PAR_MATMUL_THRESHOLD {
            out.par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, out_row)| fill_row(i, out_row));
        } else {
            for (i, out_row) in out.chunks_mut(n).enumerate() {
                fill_row(i, out_row);
            }
        }

        Tensor::new(out, vec![m, n])
    }

    fn matmul_4d(&self, other: &Tensor) -> Tensor {
        let (batch, heads, s1, k) = (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        assert_eq!(
            &other.shape[..3],
            &[batch, heads, k],
            "batched matmul shapes differ: {:?} @ {:?}",
            self.shape,
            other.shape
        );
        let s2 = other.shape[3];

        let mut out = vec![0.0; batch * heads * s1 * s2];

        // One independent s1 x s2 product per (batch, head) pair.
        out.par_chunks_mut(s1 * s2)
            .enumerate()
            .for_each(|(bh, chunk)| {
                let a_base = bh * s1 * k;
                let b_base = bh * k * s2;
                for i in 0..s1 {
                    let a_row = &self.data[a_base + i * k..a_base + (i + 1) * k];
                    let out_row = &mut chunk[i * s2..(i + 1) * s2];
                    for (l, &a) in a_row.iter().enumerate() {
                        let b_row = &other.data[b_base + l * s2..b_base + (l + 1) * s2];
                        for (o, &b) in out_row.iter_mut().zip(b_row) {
                            *o += a * b;
                        }
                    }
                }
            });

        Tensor::new(out, vec![batch, heads, s1, s2])
    }

    /// Numerically stable softmax over the last axis.
    ///
    /// Every leading dimension indexes an independent row; each row is
    /// shifted by its maximum before exponentiating so that `exp` never
    /// overflows, then normalized to sum to one:
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / sum_j exp(x[j] - max(x))
    /// ```
    ///
    /// Rows containing `-inf` entries (masked attention pairs) produce
    /// exactly zero probability at those entries.
    pub fn softmax_last(&self) -> Tensor {
        let cols = *self.shape.last().expect("softmax on 0-rank tensor");
        let mut out = self.data.clone();

        out.par_chunks_mut(cols).for_each(|row| {
            let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let mut sum = 0.0;
            for x in row.iter_mut() {
                *x = (*x - max).exp();
                sum += *x;
            }
            for x in row.iter_mut() {
                *x /= sum;
            }
        });

        Tensor::new(out, self.shape.clone())
    }

    /// Element-wise addition.
    ///
    /// Supports the two patterns the decoder uses: exact shape match
    /// (residual connections) and broadcasting a final-axis vector
    /// (`[*, n] + [n]`, bias addition).
    ///
    /// # Panics
    ///
    /// Panics if neither pattern applies.
    pub fn add(&self, other: &Tensor) -> Tensor {
        if self.shape == other.shape {
            let data = self
                .data
                .par_iter()
                .zip(&other.data)
                .map(|(a, b)| a + b)
                .collect();
            return Tensor::new(data, self.shape.clone());
        }

        let last = self.shape.last().copied().unwrap_or(0);
        if other.shape.len() == 1 && other.data.len() == last {
            let data = self
                .data
                .par_iter()
                .enumerate()
                .map(|(i, a)| a + other.data[i % last])
                .collect();
            return Tensor::new(data, self.shape.clone());
        }

        panic!("cannot add {:?} + {:?}", self.shape, other.shape);
    }

    /// Element-wise multiplication, with the same broadcasting rules as
    /// [`Tensor::add`]. The final-axis broadcast covers layer-norm scale.
    pub fn mul(&self, other: &Tensor) -> Tensor {
        if self.shape == other.shape {
            let data = self
                .data
                .par_iter()
                .zip(&other.data)
                .map(|(a, b)| a * b)
                .collect();
            return Tensor::new(data, self.shape.clone());
        }

        let last = self.shape.last().copied().unwrap_or(0);
        if other.shape.len() == 1 && other.data.len() == last {
            let data = self
                .data
                .par_iter()
                .enumerate()
                .map(|(i, a)| a * other.data[i % last])
                .collect();
            return Tensor::new(data, self.shape.clone());
        }

        panic!("cannot mul {:?} * {:?}", self.shape, other.shape);
    }

    /// Multiply every element by a scalar (attention score scaling).
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        let data = self.data.iter().map(|&x| x * scalar).collect();
        Tensor::new(data, self.shape.clone())
    }

    /// Reinterpret the data under a new shape with the same element count.
    ///
    /// # Panics
    ///
    /// Panics if element counts differ.
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        Tensor::new(self.data.clone(), new_shape.to_vec())
    }

    /// Swap the last two axes.
    ///
    /// Used to turn per-head keys `[batch, heads, seq, head_dim]` into
    /// `[batch, heads, head_dim, seq]` for the score product. Also works on
    /// plain 2D matrices.
    pub fn transpose_last2(&self) -> Tensor {
        let ndim = self.shape.len();
        assert!(
            ndim >= 2,
            "transpose_last2 needs rank >= 2, got {:?}",
            self.shape
        );

        let rows = self.shape[ndim - 2];
        let cols = self.shape[ndim - 1];
        let outer: usize = self.shape[..ndim - 2].iter().product();

        let mut out = vec![0.0; self.data.len()];
        for o in 0..outer {
            let base = o * rows * cols;
            for i in 0..rows {
                for j in 0..cols {
                    out[base + j * rows + i] = self.data[base + i * cols + j];
                }
            }
        }

        let mut new_shape = self.shape.clone();
        new_shape.swap(ndim - 2, ndim - 1);
        Tensor::new(out, new_shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_2d_identity() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let eye = Tensor::new(
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            vec![3, 3],
        );
        assert_eq!(a.matmul(&eye).data, a.data);
    }

    #[test]
    fn test_matmul_2d_known_values() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let b = Tensor::new(vec![5.0, 6.0, 7.0, 8.0], vec![2, 2]);
        let c = a.matmul(&b);
        assert_eq!(c.data, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_parallel_matches_sequential() {
        // Large enough to cross PAR_MATMUL_THRESHOLD.
        let n = 24;
        let a = Tensor::new((0..n * n).map(|i| (i % 7) as f32).collect(), vec![n, n]);
        let b = Tensor::new((0..n * n).map(|i| (i % 5) as f32).collect(), vec![n, n]);
        let fast = a.matmul(&b);

        let mut slow = vec![0.0f32; n * n];
        for i in 0..n {
            for j in 0..n {
                for l in 0..n {
                    slow[i * n + j] += a.data[i * n + l] * b.data[l * n + j];
                }
            }
        }
        assert_eq!(fast.data, slow);
    }

    #[test]
    fn test_matmul_4d_batched() {
        // Two (batch, head) pairs, each multiplied by the identity.
        let x = Tensor::new((0..8).map(|i| i as f32).collect(), vec![1, 2, 2, 2]);
        let eye = Tensor::new(
            vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
            vec![1, 2, 2, 2],
        );
        assert_eq!(x.matmul(&eye).data, x.data);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0], vec![2, 3]);
        let s = t.softmax_last();
        for row in s.data.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_handles_large_values() {
        let t = Tensor::new(vec![1000.0, 1000.0], vec![1, 2]);
        let s = t.softmax_last();
        assert!((s.data[0] - 0.5).abs() < 1e-6);
        assert!(s.data.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_softmax_neg_infinity_gives_zero_probability() {
        let t = Tensor::new(vec![0.0, f32::NEG_INFINITY, 0.0], vec![1, 3]);
        let s = t.softmax_last();
        assert_eq!(s.data[1], 0.0);
        assert!((s.data[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_add_broadcast_bias() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let bias = Tensor::new(vec![10.0, 20.0], vec![2]);
        assert_eq!(x.add(&bias).data, vec![11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_transpose_last2_roundtrip() {
        let t = Tensor::new((0..24).map(|i| i as f32).collect(), vec![2, 1, 3, 4]);
        let tt = t.transpose_last2();
        assert_eq!(tt.shape, vec![2, 1, 4, 3]);
        assert_eq!(tt.transpose_last2(), t);
    }

    #[test]
    #[should_panic(expected = "matmul inner dimensions differ")]
    fn test_matmul_shape_mismatch_panics() {
        let a = Tensor::zeros(vec![2, 3]);
        let b = Tensor::zeros(vec![2, 3]);
        a.matmul(&b);
    }
}
