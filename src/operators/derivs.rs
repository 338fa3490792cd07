//! Central-difference derivatives in x and z.
//!
//! Derivatives are evaluated on the interior x range, every y and every z; the
//! remaining cells of the result are zero. z is periodic.

use crate::field::{CellLoc, Field3D};
use crate::mesh::Mesh;

use super::DiffMethod;

fn check_location(f: &Field3D, loc: CellLoc) {
    assert_eq!(
        f.location(),
        loc,
        "derivative output location must match the input: staggered interpolation is not available"
    );
}

/// Apply `stencil(i, j, k)` at every interior x point.
fn interior_x<F: Fn(usize, usize, usize) -> f64>(f: &Field3D, mesh: &Mesh, stencil: F) -> Field3D {
    let mut out = Field3D::zeros_like(f);
    for i in mesh.xstart..=mesh.xend {
        for j in 0..mesh.local_ny {
            for k in 0..mesh.local_nz {
                out[(i, j, k)] = stencil(i, j, k);
            }
        }
    }
    out
}

#[inline]
fn kp(k: usize, s: usize, nz: usize) -> usize {
    (k + s) % nz
}

#[inline]
fn km(k: usize, s: usize, nz: usize) -> usize {
    (k + nz - s % nz) % nz
}

pub fn ddx(f: &Field3D, mesh: &Mesh, loc: CellLoc, method: DiffMethod) -> Field3D {
    check_location(f, loc);
    let dx = mesh.coordinates().dx;
    match method {
        DiffMethod::C2 => interior_x(f, mesh, |i, j, k| {
            (f[(i + 1, j, k)] - f[(i - 1, j, k)]) / (2.0 * dx)
        }),
        DiffMethod::C4 => {
            assert!(mesh.mxg >= 2, "C4 x derivatives need at least two guard cells");
            interior_x(f, mesh, |i, j, k| {
                (8.0 * (f[(i + 1, j, k)] - f[(i - 1, j, k)]) - (f[(i + 2, j, k)] - f[(i - 2, j, k)]))
                    / (12.0 * dx)
            })
        }
    }
}

pub fn ddz(f: &Field3D, mesh: &Mesh, loc: CellLoc, method: DiffMethod) -> Field3D {
    check_location(f, loc);
    let dz = mesh.coordinates().dz;
    let nz = mesh.local_nz;
    match method {
        DiffMethod::C2 => interior_x(f, mesh, |i, j, k| {
            (f[(i, j, kp(k, 1, nz))] - f[(i, j, km(k, 1, nz))]) / (2.0 * dz)
        }),
        DiffMethod::C4 => interior_x(f, mesh, |i, j, k| {
            (8.0 * (f[(i, j, kp(k, 1, nz))] - f[(i, j, km(k, 1, nz))])
                - (f[(i, j, kp(k, 2, nz))] - f[(i, j, km(k, 2, nz))]))
                / (12.0 * dz)
        }),
    }
}

pub fn d2dx2(f: &Field3D, mesh: &Mesh) -> Field3D {
    let dx = mesh.coordinates().dx;
    interior_x(f, mesh, |i, j, k| {
        (f[(i + 1, j, k)] - 2.0 * f[(i, j, k)] + f[(i - 1, j, k)]) / (dx * dx)
    })
}

pub fn d2dz2(f: &Field3D, mesh: &Mesh) -> Field3D {
    let dz = mesh.coordinates().dz;
    let nz = mesh.local_nz;
    interior_x(f, mesh, |i, j, k| {
        (f[(i, j, kp(k, 1, nz))] - 2.0 * f[(i, j, k)] + f[(i, j, km(k, 1, nz))]) / (dz * dz)
    })
}

pub fn d2dxdz(f: &Field3D, mesh: &Mesh) -> Field3D {
    let coords = mesh.coordinates();
    let (dx, dz) = (coords.dx, coords.dz);
    let nz = mesh.local_nz;
    interior_x(f, mesh, |i, j, k| {
        let (up, dn) = (kp(k, 1, nz), km(k, 1, nz));
        (f[(i + 1, j, up)] - f[(i + 1, j, dn)] - f[(i - 1, j, up)] + f[(i - 1, j, dn)])
            / (4.0 * dx * dz)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn mesh() -> Mesh {
        Mesh::builder(6, 1, 8).guards(2, 0).build().unwrap()
    }

    #[test]
    fn ddx_is_exact_for_polynomials() {
        let mesh = mesh();
        let dx = mesh.coordinates().dx;
        let line = Field3D::from_fn(&mesh, |i, _, _| 3.0 * i as f64 * dx);
        let cubic = Field3D::from_fn(&mesh, |i, _, _| (i as f64 * dx).powi(3));
        let d_line = ddx(&line, &mesh, CellLoc::Centre, DiffMethod::C2);
        let d_cubic = ddx(&cubic, &mesh, CellLoc::Centre, DiffMethod::C4);
        for i in mesh.xstart..=mesh.xend {
            assert_abs_diff_eq!(d_line[(i, 0, 3)], 3.0, epsilon = 1e-12);
            let x = i as f64 * dx;
            assert_abs_diff_eq!(d_cubic[(i, 0, 3)], 3.0 * x * x, epsilon = 1e-12);
        }
        assert_eq!(d_line[(0, 0, 0)], 0.0);
    }

    #[test]
    fn ddz_wraps_periodically() {
        let mesh = mesh();
        let nz = mesh.local_nz;
        let dz = mesh.coordinates().dz;
        let f = Field3D::from_fn(&mesh, |_, _, k| k as f64);
        let d = ddz(&f, &mesh, CellLoc::Centre, DiffMethod::C2);
        assert_abs_diff_eq!(d[(2, 0, 3)], 1.0 / dz, epsilon = 1e-12);
        // k = 0 sees the jump from nz - 1
        assert_abs_diff_eq!(d[(2, 0, 0)], (1.0 - (nz - 1) as f64) / (2.0 * dz), epsilon = 1e-12);
    }

    #[test]
    fn second_derivatives_of_quadratics() {
        let mesh = mesh();
        let c = mesh.coordinates();
        let (dx, dz) = (c.dx, c.dz);
        let fx = Field3D::from_fn(&mesh, |i, _, _| (i as f64 * dx).powi(2));
        let fxz = Field3D::from_fn(&mesh, |i, _, k| i as f64 * dx * (2.0 * std::f64::consts::PI * k as f64 * dz).sin());
        let d2 = d2dx2(&fx, &mesh);
        let dxz = d2dxdz(&fxz, &mesh);
        let dz_only = d2dz2(&fx, &mesh);
        for i in mesh.xstart..=mesh.xend {
            assert_abs_diff_eq!(d2[(i, 0, 1)], 2.0, epsilon = 1e-9);
            assert_abs_diff_eq!(dz_only[(i, 0, 1)], 0.0, epsilon = 1e-12);
        }
        // exact in x, second order in z: central difference of sin(2 pi z) at z = 0
        let expected = (2.0 * std::f64::consts::PI * dz).sin() / dz;
        assert_abs_diff_eq!(dxz[(3, 0, 0)], expected, epsilon = 1e-9);
    }

    #[test]
    #[should_panic(expected = "staggered interpolation")]
    fn staggered_output_is_rejected() {
        let mesh = mesh();
        let f = Field3D::zeros(&mesh);
        let _ = ddx(&f, &mesh, CellLoc::XLow, DiffMethod::C2);
    }
}
