use argmin::{argmin_error_closure, core::*};
use nalgebra::{DMatrix, DVector};

use crate::misc::FloatingPoint;

type NewtonState<F> = IterState<DVector<F>, DVector<F>, (), DMatrix<F>, (), F>;

/// Projected Newton's method for finding the closest parameter on a patch.
///
/// Coordinates sitting on a bound of the domain with the gradient pointing outward are
/// held fixed, and the Newton step is solved on the remaining ones. Steps are clamped to
/// the domain and halved until the cost decreases. When the reduced Hessian is singular
/// or gives no descent direction, or its step never decreases the cost, the projected
/// gradient is tried before the parameter is taken as a minimum.
/// Original source: https://argmin-rs.github.io/argmin/argmin/solver/newton/struct.Newton.html
#[derive(Clone, Debug)]
pub struct PatchClosestParameterNewton<F> {
    /// domain of the parameter in every direction
    domain: Vec<(F, F)>,
    /// convergence threshold on the step, relative to the domain size
    tolerance: F,
    /// number of step halvings before giving up on a step
    max_bisections: usize,
}

impl<F: FloatingPoint + ArgminFloat> PatchClosestParameterNewton<F> {
    pub fn new(domain: Vec<(F, F)>, tolerance: F, max_bisections: usize) -> Self {
        Self {
            domain,
            tolerance,
            max_bisections,
        }
    }

    fn constrain(&self, param: DVector<F>) -> DVector<F> {
        DVector::from_iterator(
            param.len(),
            param.iter().zip(self.domain.iter()).map(|(x, (a, b))| {
                if *x < *a {
                    *a
                } else if *x > *b {
                    *b
                } else {
                    *x
                }
            }),
        )
    }

    /// Coordinates allowed to move: those not held on a bound by a gradient pointing outward
    fn free_coordinates(&self, param: &DVector<F>, grad: &DVector<F>) -> Vec<usize> {
        (0..param.len())
            .filter(|&i| {
                let (a, b) = self.domain[i];
                let at_lower = param[i] <= a && grad[i] >= F::zero();
                let at_upper = param[i] >= b && grad[i] <= F::zero();
                !(at_lower || at_upper)
            })
            .collect()
    }

    /// Halve the step along `delta` until the clamped parameter lowers the cost
    fn line_search<O>(
        &self,
        problem: &mut Problem<O>,
        param: &DVector<F>,
        cost: F,
        delta: &DVector<F>,
    ) -> Result<Option<(DVector<F>, F)>, Error>
    where
        O: CostFunction<Param = DVector<F>, Output = F>,
    {
        let mut step = F::one();
        let half = F::one() / (F::one() + F::one());
        for _ in 0..=self.max_bisections {
            let candidate = self.constrain(param + delta * step);
            let candidate_cost = problem.cost(&candidate)?;
            if candidate_cost < cost {
                return Ok(Some((candidate, candidate_cost)));
            }
            step = step * half;
        }
        Ok(None)
    }

    /// Largest step component relative to the size of the domain
    fn relative_step(&self, from: &DVector<F>, to: &DVector<F>) -> F {
        from.iter()
            .zip(to.iter())
            .zip(self.domain.iter())
            .map(|((x, y), (a, b))| {
                let d = *y - *x;
                let d = if d < F::zero() { -d } else { d };
                let size = *b - *a;
                if size > F::zero() {
                    d / size
                } else {
                    d
                }
            })
            .fold(F::zero(), |acc, d| if d > acc { d } else { acc })
    }
}

impl<O, F> Solver<O, NewtonState<F>> for PatchClosestParameterNewton<F>
where
    F: FloatingPoint + ArgminFloat,
    O: CostFunction<Param = DVector<F>, Output = F>
        + Gradient<Param = DVector<F>, Gradient = DVector<F>>
        + Hessian<Param = DVector<F>, Hessian = DMatrix<F>>,
{
    const NAME: &'static str = "Patch closest parameter newton method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState<F>,
    ) -> Result<(NewtonState<F>, Option<KV>), Error> {
        let x0 = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`Newton` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let x0 = self.constrain(x0.clone());
        let cost = problem.cost(&x0)?;
        Ok((state.param(x0).cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState<F>,
    ) -> Result<(NewtonState<F>, Option<KV>), Error> {
        let param = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`Newton` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let param = param.clone();
        let cost = state.get_cost();

        let grad = problem.gradient(&param)?;
        let free = self.free_coordinates(&param, &grad);
        if free.is_empty() {
            // every coordinate is pinned against the domain
            return Ok((state.param(param).cost(cost), None));
        }

        let hessian = problem.hessian(&param)?;
        let directions = reduced_newton_step(&hessian, &grad, &free)
            .into_iter()
            .chain(std::iter::once(projected_gradient(&grad, &free)));
        for delta in directions {
            let found = self.line_search(problem, &param, cost, &delta)?;
            if let Some((candidate, candidate_cost)) = found {
                return Ok((state.param(candidate).cost(candidate_cost), None));
            }
        }

        // no decrease along either direction: a local minimum within the domain
        Ok((state.param(param).cost(cost), None))
    }

    fn terminate(&mut self, state: &NewtonState<F>) -> TerminationStatus {
        if state.iter >= state.max_iters {
            return TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        }

        match (state.get_param(), state.get_prev_param()) {
            (Some(current_param), Some(prev_param)) => {
                if self.relative_step(prev_param, current_param) <= self.tolerance {
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                } else {
                    TerminationStatus::NotTerminated
                }
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}

/// Newton step on the free coordinates, zero on the others.
/// `None` when the reduced Hessian is singular or the step is not a descent direction.
fn reduced_newton_step<F: FloatingPoint>(
    hessian: &DMatrix<F>,
    grad: &DVector<F>,
    free: &[usize],
) -> Option<DVector<F>> {
    let n = free.len();
    let reduced = DMatrix::from_fn(n, n, |i, j| hessian[(free[i], free[j])]);
    let g = DVector::from_iterator(n, free.iter().map(|&i| grad[i]));
    let step = reduced.lu().solve(&-&g)?;
    if step.dot(&g) >= F::zero() {
        return None;
    }
    let mut delta = DVector::zeros(grad.len());
    for (k, &i) in free.iter().enumerate() {
        delta[i] = step[k];
    }
    Some(delta)
}

/// Steepest descent restricted to the free coordinates
fn projected_gradient<F: FloatingPoint>(grad: &DVector<F>, free: &[usize]) -> DVector<F> {
    let mut delta = DVector::zeros(grad.len());
    for &i in free {
        delta[i] = -grad[i];
    }
    delta
}
