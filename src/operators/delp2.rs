//! Perpendicular Laplacian and metric-weighted gradient products.

use crate::field::Field3D;
use crate::mesh::{Coordinates, Mesh};

use super::DiffMethod;
use super::derivs::{ddx, ddz};

/// Weights of the second-order `delp2` stencil at `(i, j)`.
///
/// `w[di + 1][dk + 1]` multiplies `f(i + di, j, k + dk)`. The direct solver
/// assembles its matrix from these same weights, so that its inverse and
/// [`delp2`] agree to rounding.
pub fn delp2_stencil(coords: &Coordinates, i: usize, j: usize) -> [[f64; 3]; 3] {
    let (dx, dz) = (coords.dx, coords.dz);
    let cx2 = coords.g11[(i, j)] / (dx * dx);
    let cz2 = coords.g33[(i, j)] / (dz * dz);
    let cxz = 2.0 * coords.g13[(i, j)] / (4.0 * dx * dz);
    let cx1 = coords.g1[(i, j)] / (2.0 * dx);
    let cz1 = coords.g3[(i, j)] / (2.0 * dz);

    let mut w = [[0.0; 3]; 3];
    w[1][1] = -2.0 * cx2 - 2.0 * cz2;
    w[2][1] = cx2 + cx1;
    w[0][1] = cx2 - cx1;
    w[1][2] = cz2 + cz1;
    w[1][0] = cz2 - cz1;
    w[2][2] = cxz;
    w[0][0] = cxz;
    w[2][0] = -cxz;
    w[0][2] = -cxz;
    w
}

/// `G1 ddx + G3 ddz + g11 d2dx2 + g33 d2dz2 + 2 g13 d2dxdz`, second order.
pub fn delp2(f: &Field3D, mesh: &Mesh) -> Field3D {
    let coords = mesh.coordinates();
    let nz = mesh.local_nz;
    let mut out = Field3D::zeros_like(f);
    for i in mesh.xstart..=mesh.xend {
        for j in 0..mesh.local_ny {
            let w = delp2_stencil(coords, i, j);
            for k in 0..nz {
                let mut acc = 0.0;
                for (di, row) in w.iter().enumerate() {
                    let ii = i + di - 1;
                    for (dk, &wt) in row.iter().enumerate() {
                        let kk = (k + nz + dk - 1) % nz;
                        acc += wt * f[(ii, j, kk)];
                    }
                }
                out[(i, j, k)] = acc;
            }
        }
    }
    out
}

/// `g11 fx gx + g33 fz gz + g13 (fx gz + fz gx)` from precomputed gradients.
pub fn metric_dot(coords: &Coordinates, grad_f: (&Field3D, &Field3D), grad_g: (&Field3D, &Field3D)) -> Field3D {
    let (fx, fz) = grad_f;
    let (gx, gz) = grad_g;
    let xx = &(fx * gx) * &coords.g11;
    let zz = &(fz * gz) * &coords.g33;
    let cross = &(&(fx * gz) + &(fz * gx)) * &coords.g13;
    &(&xx + &zz) + &cross
}

/// Perpendicular gradient dot product `grad_perp(f) . grad_perp(g)`.
pub fn grad_perp_dot_grad_perp(f: &Field3D, g: &Field3D, mesh: &Mesh, method: DiffMethod) -> Field3D {
    let loc = f.location();
    let fx = ddx(f, mesh, loc, method);
    let fz = ddz(f, mesh, loc, method);
    let gx = ddx(g, mesh, loc, method);
    let gz = ddz(g, mesh, loc, method);
    metric_dot(mesh.coordinates(), (&fx, &fz), (&gx, &gz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{CellLoc, Field2D};
    use crate::operators::{d2dx2, d2dxdz, d2dz2};
    use approx::assert_abs_diff_eq;

    #[test]
    fn delp2_matches_separate_derivatives() {
        let mesh = Mesh::builder(6, 2, 8).guards(1, 0).metric(1.3, 0.7, 0.2).build().unwrap();
        let f = Field3D::from_fn(&mesh, |i, j, k| ((i * 7 + j * 3 + k * 5) % 11) as f64 * 0.1);
        let c = mesh.coordinates();
        let expected = d2dx2(&f, &mesh) * 1.3 + &(d2dz2(&f, &mesh) * 0.7) + &(d2dxdz(&f, &mesh) * 0.4);
        let got = delp2(&f, &mesh);
        assert_eq!(c.g13[(0, 0)], 0.2);
        for (a, b) in got.as_slice().iter().zip(expected.as_slice()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn gradient_product_of_linear_fields() {
        let mesh = Mesh::builder(4, 1, 4).guards(1, 0).build().unwrap();
        let dx = mesh.coordinates().dx;
        let f = Field3D::from_fn(&mesh, |i, _, _| 2.0 * i as f64 * dx);
        let g = Field3D::from_fn(&mesh, |i, _, _| -0.5 * i as f64 * dx);
        let dot = grad_perp_dot_grad_perp(&f, &g, &mesh, DiffMethod::C2);
        assert_eq!(dot.location(), CellLoc::Centre);
        assert_abs_diff_eq!(dot[(2, 0, 1)], -1.0, epsilon = 1e-12);
        assert_eq!(dot[(0, 0, 1)], 0.0);
    }

    #[test]
    fn metric_dot_weights_each_column_by_its_metric() {
        let mesh = Mesh::builder(3, 2, 4).guards(1, 0).build().unwrap();
        let shape = (mesh.local_nx, mesh.local_ny);
        let mut coords = mesh.coordinates().clone();
        coords.g11 = Field2D::from_fn(shape, |i, j| 1.0 + 0.5 * i as f64 + j as f64);
        coords.g33 = Field2D::from_fn(shape, |i, _| 2.0 - 0.1 * i as f64);
        coords.g13 = Field2D::from_fn(shape, |_, j| 0.3 * j as f64);
        let mesh = mesh.with_coordinates(coords).unwrap();
        let c = mesh.coordinates();

        let fx = Field3D::from_fn(&mesh, |i, _, k| (i + k) as f64);
        let fz = Field3D::from_fn(&mesh, |_, j, k| 1.0 - (j * k) as f64);
        let gx = Field3D::filled(&mesh, 0.5);
        let gz = Field3D::from_fn(&mesh, |i, j, _| (i * j) as f64 - 2.0);
        let dot = metric_dot(c, (&fx, &fz), (&gx, &gz));
        for (i, j, k) in [(0, 0, 0), (2, 1, 3), (4, 1, 2)] {
            let p = (i, j, k);
            let expected = c.g11[(i, j)] * fx[p] * gx[p]
                + c.g33[(i, j)] * fz[p] * gz[p]
                + c.g13[(i, j)] * (fx[p] * gz[p] + fz[p] * gx[p]);
            assert_abs_diff_eq!(dot[p], expected, epsilon = 1e-12);
        }
    }
}
