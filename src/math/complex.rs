//! Complex hyperbolic helpers.
//!
//! The thermal wavenumbers in the loss models grow like `sqrt(f)`, so at high
//! frequency `cosh`/`sinh` of `γ·L` overflow long before their ratios do. The
//! models are written in terms of `coth` instead, evaluated here without ever
//! forming the large exponentials.

use num_complex::Complex64;

/// Beyond this real part `coth(z)` equals `±1` to double precision.
const COTH_SATURATION: f64 = 20.0;

/// Below this modulus the Laurent series is more accurate than the exponential form.
const COTH_SERIES_RADIUS: f64 = 1e-2;

/// Hyperbolic cotangent, stable for large `|Re z|` and small `|z|`.
pub fn coth(z: Complex64) -> Complex64 {
    if z.re < 0.0 {
        return -coth(-z);
    }
    if z.re > COTH_SATURATION {
        return Complex64::new(1.0, 0.0);
    }
    if z.norm() < COTH_SERIES_RADIUS {
        // coth z = 1/z + z/3 - z^3/45 + 2 z^5/945 - ...
        let z2 = z * z;
        return z.inv() + z / 3.0 - z * z2 / 45.0 + 2.0 * z * z2 * z2 / 945.0;
    }
    let e = (-2.0 * z).exp();
    (1.0 + e) / (1.0 - e)
}

/// `(1 + i)·sqrt(x)`, the diffusive wavenumber prefactor.
pub fn diffusive(x: f64) -> Complex64 {
    let r = x.sqrt();
    Complex64::new(r, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(z: Complex64) -> Complex64 {
        z.cosh() / z.sinh()
    }

    #[test]
    fn matches_direct_form_at_moderate_arguments() {
        for &(re, im) in &[(0.3, 0.3), (1.0, -2.0), (4.0, 4.0), (-2.5, 0.7), (0.02, 0.02), (15.0, 15.0)] {
            let z = Complex64::new(re, im);
            let diff = (coth(z) - direct(z)).norm();
            assert!(diff < 1e-12 * direct(z).norm(), "z={z}: {} vs {}", coth(z), direct(z));
        }
    }

    #[test]
    fn small_arguments_use_series() {
        let z = Complex64::new(1e-4, 1e-4);
        let expected = z.inv() + z / 3.0;
        assert!((coth(z) - expected).norm() < 1e-12 * expected.norm());
    }

    #[test]
    fn saturates_without_overflow() {
        let z = Complex64::new(1e4, 1e4);
        assert_eq!(coth(z), Complex64::new(1.0, 0.0));
        assert_eq!(coth(-z), Complex64::new(-1.0, 0.0));
    }
}
