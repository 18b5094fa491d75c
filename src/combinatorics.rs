//! Combinatorial indexing helpers
//!
//! Color subsets are handled as sorted, 1-based rank arrays (`[1, 2, 4]` is the subset of
//! colors 0, 1 and 3). [`color_index`] maps such an array onto a dense integer using the
//! combinatorial number system, and the resulting value is used directly as an offset into
//! dynamic-programming rows.

use ndarray::Array2;

/// Largest palette the index arithmetic supports with exact 64-bit factorials
pub const MAX_COLORS: usize = 20;

/// `x!`, with `factorial(0) == 1`
///
/// Exact only for `x <= 20`; larger arguments overflow `u64`.
pub fn factorial(x: usize) -> u64 {
    (2..=x as u64).product()
}

/// Number of `k`-subsets of an `n`-set, `0` when `n < k`
pub fn choose(n: usize, k: usize) -> u64 {
    if n < k {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for i in 0..k as u64 {
        // exact at every step: result * (n - i) is divisible by (i + 1)
        result = result * (n as u64 - i) / (i + 1);
    }
    result
}

/// Precomputed `choose(i, j)` for all `0 <= i, j <= n`
#[derive(Debug, Clone)]
pub struct ChooseTable {
    table: Array2<u64>,
}

impl ChooseTable {
    pub fn new(n: usize) -> Self {
        let table = Array2::from_shape_fn((n + 1, n + 1), |(i, j)| choose(i, j));
        Self { table }
    }

    /// Largest `n` the table was built for
    pub fn size(&self) -> usize {
        self.table.nrows() - 1
    }

    /// `choose(n, k)`, falling back to direct computation outside the table
    pub fn get(&self, n: usize, k: usize) -> u64 {
        self.table
            .get((n, k))
            .copied()
            .unwrap_or_else(|| choose(n, k))
    }
}

/// The first `k`-subset in odometer order: `[1, 2, ..., k]`
pub fn init_permutation(k: usize) -> Vec<u32> {
    (1..=k as u32).collect()
}

/// Advance `set` to the next `set.len()`-subset of `{1..=universe}` in lexicographic order
///
/// The last subset is left unchanged; callers know the number of subsets up front and stop
/// after `choose(universe, set.len())` steps.
pub fn next_set(set: &mut [u32], universe: u32) {
    let length = set.len();
    for i in (0..length).rev() {
        let limit = universe - (length - i - 1) as u32;
        if set[i] < limit {
            set[i] += 1;
            for j in i + 1..length {
                set[j] = set[j - 1] + 1;
            }
            break;
        }
    }
}

/// Combinatorial-number-system rank of a sorted 1-based subset
///
/// `sum(choose(set[i] - 1, i + 1))`, a bijection from the `k`-subsets of `{1..=n}` onto
/// `0..choose(n, k)`.
pub fn color_index(set: &[u32]) -> usize {
    set.iter()
        .enumerate()
        .map(|(i, &c)| choose(c as usize - 1, i + 1) as usize)
        .sum()
}

/// Iterator over all `k`-subsets of `{1..=universe}` in odometer order
pub struct Combinations {
    current: Vec<u32>,
    universe: u32,
    remaining: u64,
}

impl Combinations {
    pub fn new(universe: usize, k: usize) -> Self {
        Self {
            current: init_permutation(k),
            universe: universe as u32,
            remaining: choose(universe, k),
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = self.current.clone();
        if self.remaining > 0 {
            next_set(&mut self.current, self.universe);
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

/// Probability that `k` given vertices receive pairwise distinct colors out of `num_colors`
pub fn colorful_probability(num_colors: usize, k: usize) -> f64 {
    if k > num_colors {
        return 0.0;
    }
    let falling: f64 = (num_colors - k + 1..=num_colors).map(|c| c as f64).product();
    falling / (num_colors as f64).powi(k as i32)
}
