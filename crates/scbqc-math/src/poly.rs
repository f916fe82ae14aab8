//! Real-coefficient polynomial evaluation and root finding.
//!
//! Coefficients are ordered highest degree first, the same convention as
//! `numpy.roots` / `numpy.polyval`.
//!
//! Degrees 1 and 2 use closed forms; higher degrees use Aberth–Ehrlich
//! simultaneous iteration in complex arithmetic, followed by Newton
//! polishing of the roots that land on the real axis.

use num_complex::Complex64;

/// Iteration cap for Aberth–Ehrlich.
const MAX_ITERATIONS: usize = 500;

/// Relative correction below which a root estimate is considered converged.
const CONVERGENCE_TOL: f64 = 1e-14;

/// Newton polishing steps applied to real roots.
const POLISH_STEPS: usize = 4;

/// Default relative tolerance on the imaginary part for a root to count as real.
pub const REAL_ROOT_TOL: f64 = 1e-8;

/// Evaluate at a real point. Returns `(p(x), p'(x))`.
pub fn eval_with_derivative(coeffs: &[f64], x: f64) -> (f64, f64) {
    let mut p = 0.0;
    let mut dp = 0.0;
    for &c in coeffs {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

/// Evaluate at a real point.
pub fn eval(coeffs: &[f64], x: f64) -> f64 {
    eval_with_derivative(coeffs, x).0
}

fn eval_complex(coeffs: &[f64], z: Complex64) -> (Complex64, Complex64) {
    let mut p = Complex64::new(0.0, 0.0);
    let mut dp = Complex64::new(0.0, 0.0);
    for &c in coeffs {
        dp = dp * z + p;
        p = p * z + c;
    }
    (p, dp)
}

/// All complex roots, with multiplicity.
///
/// Leading zero coefficients are ignored. Returns an empty vector for
/// constant polynomials or when any coefficient is non-finite.
pub fn roots(coeffs: &[f64]) -> Vec<Complex64> {
    if coeffs.iter().any(|c| !c.is_finite()) {
        return Vec::new();
    }
    let Some(lead) = coeffs.iter().position(|&c| c != 0.0) else {
        return Vec::new();
    };
    let mut poly = &coeffs[lead..];

    // Trailing zeros are roots at the origin
    let mut found = Vec::with_capacity(poly.len().saturating_sub(1));
    while poly.len() > 1 && poly[poly.len() - 1] == 0.0 {
        found.push(Complex64::new(0.0, 0.0));
        poly = &poly[..poly.len() - 1];
    }

    match poly.len() {
        0 | 1 => {}
        2 => found.push(Complex64::new(-poly[1] / poly[0], 0.0)),
        3 => found.extend(quadratic_roots(poly[0], poly[1], poly[2])),
        _ => found.extend(aberth_roots(poly)),
    }
    found
}

/// Roots of `a·x² + b·x + c` with `a != 0`, avoiding cancellation.
fn quadratic_roots(a: f64, b: f64, c: f64) -> [Complex64; 2] {
    let disc = b * b - 4.0 * a * c;
    if disc >= 0.0 {
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        if q == 0.0 {
            return [Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)];
        }
        [Complex64::new(q / a, 0.0), Complex64::new(c / q, 0.0)]
    } else {
        let re = -b / (2.0 * a);
        let im = (-disc).sqrt() / (2.0 * a).abs();
        [Complex64::new(re, im), Complex64::new(re, -im)]
    }
}

/// Fujiwara upper bound on root magnitude.
fn root_radius(monic: &[f64]) -> f64 {
    let n = monic.len() - 1;
    let mut bound: f64 = 0.0;
    for k in 1..=n {
        let mut mag = monic[k].abs();
        if k == n {
            mag /= 2.0;
        }
        bound = bound.max(mag.powf(1.0 / k as f64));
    }
    2.0 * bound
}

fn aberth_roots(poly: &[f64]) -> Vec<Complex64> {
    let n = poly.len() - 1;
    let monic: Vec<f64> = poly.iter().map(|c| c / poly[0]).collect();
    let radius = root_radius(&monic).max(f64::MIN_POSITIVE);

    // Start on a circle, rotated off the real axis so conjugate pairs can separate
    let mut z: Vec<Complex64> = (0..n)
        .map(|k| {
            let theta = 2.0 * std::f64::consts::PI * k as f64 / n as f64 + 0.4;
            Complex64::from_polar(radius, theta)
        })
        .collect();

    for _ in 0..MAX_ITERATIONS {
        let mut max_step: f64 = 0.0;
        for k in 0..n {
            let (p, dp) = eval_complex(&monic, z[k]);
            if p.norm() == 0.0 {
                continue;
            }
            if dp.norm() == 0.0 {
                z[k] += Complex64::new(1e-6 * radius, 1e-6 * radius);
                max_step = f64::INFINITY;
                continue;
            }
            let ratio = p / dp;
            let repulsion: Complex64 = (0..n)
                .filter(|&j| j != k)
                .map(|j| (z[k] - z[j]).inv())
                .sum();
            let step = ratio / (Complex64::new(1.0, 0.0) - ratio * repulsion);
            if !step.re.is_finite() || !step.im.is_finite() {
                continue;
            }
            z[k] -= step;
            max_step = max_step.max(step.norm() / (1.0 + z[k].norm()));
        }
        if max_step < CONVERGENCE_TOL {
            break;
        }
    }
    z
}

/// Refine a real root estimate with Newton steps, keeping the best residual.
fn polish_real(coeffs: &[f64], x0: f64) -> f64 {
    let mut best = x0;
    let mut best_residual = eval(coeffs, x0).abs();
    let mut x = x0;
    for _ in 0..POLISH_STEPS {
        let (p, dp) = eval_with_derivative(coeffs, x);
        if dp == 0.0 || !dp.is_finite() {
            break;
        }
        x -= p / dp;
        let residual = eval(coeffs, x).abs();
        if residual < best_residual {
            best = x;
            best_residual = residual;
        }
    }
    best
}

/// Real roots in ascending order.
///
/// A root counts as real when `|im| <= tol · max(1, |re|)`.
pub fn real_roots(coeffs: &[f64], tol: f64) -> Vec<f64> {
    let mut real: Vec<f64> = roots(coeffs)
        .into_iter()
        .filter(|z| z.im.abs() <= tol * z.re.abs().max(1.0))
        .map(|z| polish_real(coeffs, z.re))
        .collect();
    real.sort_by(|a, b| a.total_cmp(b));
    real
}
