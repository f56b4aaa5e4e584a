//! Derivative-free minimisation (Nelder-Mead downhill simplex).

/// Best point found by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

/// Why a minimisation stopped without converging.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// The objective is not finite at the starting point.
    NonFiniteStart,
    /// Iteration cap reached; carries the best vertex seen.
    MaxIterations(Minimum),
}

/// Nelder-Mead settings. Non-finite objective values are treated as `+inf`,
/// which lets an objective reject infeasible points.
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Stop once the spread of vertex values is below
    /// `function_tolerance * (1 + |best|)` ...
    pub function_tolerance: f64,
    /// ... and every vertex lies within this distance of the best one.
    pub parameter_tolerance: f64,
    /// Offset applied to each coordinate to build the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            function_tolerance: 1e-8,
            parameter_tolerance: 1e-6,
            initial_step: 0.25,
        }
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn minimize<F>(&self, mut objective: F, start: &[f64]) -> Result<Minimum, OptimizeError>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let n = start.len();
        let start_value = eval(start);
        if !start_value.is_finite() {
            return Err(OptimizeError::NonFiniteStart);
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), start_value));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        for iteration in 0..self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            let spread = (worst - best).abs();
            let diameter = simplex[1..]
                .iter()
                .map(|(v, _)| distance(v, &simplex[0].0))
                .fold(0.0, f64::max);

            if spread <= self.function_tolerance * (1.0 + best.abs())
                && diameter <= self.parameter_tolerance
            {
                return Ok(Minimum {
                    point: simplex[0].0.clone(),
                    value: best,
                    iterations: iteration,
                });
            }

            let centroid = centroid(&simplex[..n]);
            let worst_point = simplex[n].0.clone();

            let reflected = along(&centroid, &worst_point, -REFLECTION);
            let reflected_value = eval(&reflected);

            if reflected_value < best {
                let expanded = along(&centroid, &worst_point, -EXPANSION);
                let expanded_value = eval(&expanded);
                simplex[n] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }

            if reflected_value < simplex[n - 1].1 {
                simplex[n] = (reflected, reflected_value);
                continue;
            }

            // contraction, outside when the reflection improved on the worst
            let contracted = if reflected_value < worst {
                along(&centroid, &reflected, CONTRACTION)
            } else {
                along(&centroid, &worst_point, CONTRACTION)
            };
            let contracted_value = eval(&contracted);

            if contracted_value < reflected_value.min(worst) {
                simplex[n] = (contracted, contracted_value);
                continue;
            }

            // shrink toward the best vertex
            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = along(&anchor, &vertex.0, SHRINK);
                let value = eval(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (point, value) = simplex.swap_remove(0);
        Err(OptimizeError::MaxIterations(Minimum {
            point,
            value,
            iterations: self.max_iterations,
        }))
    }
}

/// `from + t * (to - from)`
fn along(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dim = vertices[0].0.len();
    let mut c = vec![0.0; dim];
    for (v, _) in vertices {
        for (ci, vi) in c.iter_mut().zip(v) {
            *ci += vi;
        }
    }
    let k = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= k);
    c
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}
