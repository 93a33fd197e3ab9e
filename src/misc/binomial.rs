use nalgebra::DMatrix;

use super::FloatingPoint;

/// Returns the binomial coefficient of `n` and `k`.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k == 0 || k == n {
        return 1.;
    } else if n == 0 || k > n {
        return 0.;
    }

    let k = k.min(n - k);
    let mut r = 1.;
    for i in 0..k {
        r = r * (n - i) as f64 / (i + 1) as f64;
    }
    r
}

/// Pascal's triangle grown on demand.
/// Rows already built are reused by later lookups.
#[derive(Clone, Debug)]
pub struct Binomial<T> {
    rows: Vec<Vec<T>>,
}

impl<T: FloatingPoint> Default for Binomial<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FloatingPoint> Binomial<T> {
    pub fn new() -> Self {
        Self {
            rows: vec![vec![T::one()]],
        }
    }

    /// Returns the binomial coefficient of `n` and `k`.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }

        while self.rows.len() <= n {
            let prev = &self.rows[self.rows.len() - 1];
            let mut row = Vec::with_capacity(prev.len() + 1);
            row.push(T::one());
            for w in prev.windows(2) {
                row.push(w[0] + w[1]);
            }
            row.push(T::one());
            self.rows.push(row);
        }

        self.rows[n][k]
    }

    /// Coefficients raising a Bezier segment of `degree` by `increment`.
    ///
    /// The returned matrix has `degree + increment + 1` rows and `degree + 1` columns,
    /// row `i` holding the blend of the original control points producing the `i`th elevated one.
    ///
    /// # Example
    /// ```
    /// use isopatch::prelude::Binomial;
    /// let coefficients = Binomial::<f64>::new().bezier_elevation(1, 1);
    /// assert_eq!(coefficients[(1, 0)], 0.5);
    /// assert_eq!(coefficients[(1, 1)], 0.5);
    /// ```
    pub fn bezier_elevation(&mut self, degree: usize, increment: usize) -> DMatrix<T> {
        let elevated = degree + increment;
        let mut coefficients = DMatrix::zeros(elevated + 1, degree + 1);
        for i in 0..=elevated {
            let denominator = self.get(elevated, i);
            let start = i.saturating_sub(increment);
            let end = degree.min(i);
            for j in start..=end {
                coefficients[(i, j)] =
                    self.get(degree, j) * self.get(increment, i - j) / denominator;
            }
        }
        coefficients
    }
}
