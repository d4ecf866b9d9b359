//! Smooth response curves for the curve-based check-in formula
//!
//! All inputs are normalized first; every curve returns a value in [0, 1]
//! except [`soft_clip`], which stays inside `[lo, hi]`.

/// Logistic curve equal to 0.5 at `center`
pub fn sigmoid(x: f64, center: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (x - center)).exp())
}

fn unit(x: f64, edge0: f64, edge1: f64) -> f64 {
    ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0)
}

/// Hermite S-curve between two edges: 3t^2 - 2t^3
pub fn smoothstep(x: f64, edge0: f64, edge1: f64) -> f64 {
    let t = unit(x, edge0, edge1);
    t * t * (3.0 - 2.0 * t)
}

/// Flatter-ended S-curve: 6t^5 - 15t^4 + 10t^3
pub fn smootherstep(x: f64, edge0: f64, edge1: f64) -> f64 {
    let t = unit(x, edge0, edge1);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Rises fast and reaches 90% at `saturation_point`
pub fn saturating_curve(x: f64, saturation_point: f64) -> f64 {
    let k = -(0.1f64).ln() / saturation_point;
    1.0 - (-k * x).exp()
}

/// tanh squash into `[lo, hi]`; a non-positive softness is a hard clamp
pub fn soft_clip(x: f64, lo: f64, hi: f64, softness: f64) -> f64 {
    if softness <= 0.0 {
        return x.clamp(lo, hi);
    }
    let mid = (lo + hi) / 2.0;
    let half_range = (hi - lo) / 2.0;
    mid + half_range * ((x - mid) / (half_range + softness)).tanh()
}
