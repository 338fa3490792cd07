//! Convergence behaviour of the iterative variable-coefficient solver.
//!
//! Every test builds a manufactured solution `x_true`, computes its right-hand side
//! with `multiply_ax`, and inverts it with `LaplaceNaulin` around a dense inner
//! solver. Boundary data is passed through the guard cells of the initial guess.

use std::f64::consts::PI;
use std::rc::Rc;

use perpinv::config::Options;
use perpinv::error::LapError;
use perpinv::field::{CellLoc, Field3D, Region, max_abs};
use perpinv::mesh::Mesh;
use perpinv::solver::{DenseDelp2, LaplaceNaulin, Laplacian};
use perpinv::utils::DiagnosticsRegistry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mesh() -> Rc<Mesh> {
    Rc::new(Mesh::builder(8, 1, 8).guards(2, 0).build().unwrap())
}

/// x coordinate of cell `i`, zero at the inner boundary.
fn xcoord(mesh: &Mesh, i: usize) -> f64 {
    (i as f64 - mesh.xstart as f64 + 0.5) * mesh.coordinates().dx
}

fn manufactured(mesh: &Mesh) -> Field3D {
    let dz = mesh.coordinates().dz;
    Field3D::from_fn(mesh, |i, _, k| {
        let x = xcoord(mesh, i);
        (PI * x).sin() * (2.0 * PI * k as f64 * dz).cos() + 0.5 * x
    })
}

/// Guard cells from `x_true`, interior from `interior(i, j, k)`.
fn guess_from(mesh: &Mesh, x_true: &Field3D, interior: impl Fn(usize, usize, usize) -> f64) -> Field3D {
    Field3D::from_fn(mesh, |i, j, k| {
        if i < mesh.xstart || i > mesh.xend {
            x_true[(i, j, k)]
        } else {
            interior(i, j, k)
        }
    })
}

fn solver(opt: Options, mesh: &Rc<Mesh>, registry: &DiagnosticsRegistry) -> LaplaceNaulin {
    let inner = Box::new(DenseDelp2::new(Rc::clone(mesh)));
    LaplaceNaulin::with_inner_solver(&opt.with("global_flags", "SET"), Rc::clone(mesh), inner, registry).unwrap()
}

/// Smoothly varying D, C2 and a constant A: the fixed point is still reached.
fn set_varying_coefficients(solver: &mut LaplaceNaulin, mesh: &Mesh) {
    solver
        .set_coef_c2(Field3D::from_fn(mesh, |i, _, _| 1.0 + 0.2 * xcoord(mesh, i)))
        .unwrap();
    solver
        .set_coef_d(Field3D::from_fn(mesh, |i, _, _| 1.0 + 0.1 * xcoord(mesh, i)))
        .unwrap();
    solver.set_coef_a_const(0.3);
}

/// Uniform C2 removes the gradient coupling: one outer iteration is exact.
#[test]
fn uniform_c2_recovers_in_one_iteration() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new(), &mesh, &registry);
    solver.set_coef_c1_const(2.0);
    solver.set_coef_c2_const(2.0);

    let x_true = manufactured(&mesh);
    let rhs = solver.multiply_ax(&x_true).unwrap();
    let guess = guess_from(&mesh, &x_true, |_, _, _| 0.0);
    let x = solver.solve(&rhs, &guess).unwrap();

    assert!(max_abs(&(&x - &x_true), &mesh, Region::NoBndry) < 1e-9);
    assert_eq!(solver.last_stats().unwrap().iterations, 1);
}

/// Varying coefficients and a random interior guess still converge to `x_true`.
#[test]
fn varying_coefficients_recover_solution() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new().with("rtol", 1e-10), &mesh, &registry);
    set_varying_coefficients(&mut solver, &mesh);

    let x_true = manufactured(&mesh);
    let rhs = solver.multiply_ax(&x_true).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let noise: Vec<f64> = (0..mesh.local_nx * mesh.local_nz).map(|_| rng.r#gen::<f64>()).collect();
    let guess = guess_from(&mesh, &x_true, |i, _, k| noise[i * mesh.local_nz + k]);

    let x = solver.solve(&rhs, &guess).unwrap();
    let stats = solver.last_stats().unwrap();
    assert!(stats.iterations > 1);
    assert!(stats.error_rel <= 1e-10);
    assert!(max_abs(&(&x - &x_true), &mesh, Region::NoBndry) < 1e-7);

    // the forward operator reproduces the right-hand side
    let back = solver.multiply_ax(&x).unwrap();
    assert!(max_abs(&(&back - &rhs), &mesh, Region::NoBndry) < 1e-6);
}

/// A tighter rtol never needs fewer iterations, and both runs approach the same
/// fixed point.
#[test]
fn tighter_tolerance_needs_at_least_as_many_iterations() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let x_true = manufactured(&mesh);
    let guess = guess_from(&mesh, &x_true, |_, _, _| 0.0);

    let mut iterations = Vec::new();
    let mut solutions = Vec::new();
    for rtol in [1e-3, 1e-10] {
        let mut solver = solver(Options::new().with("rtol", rtol), &mesh, &registry);
        set_varying_coefficients(&mut solver, &mesh);
        let rhs = solver.multiply_ax(&x_true).unwrap();
        solutions.push(solver.solve(&rhs, &guess).unwrap());
        let stats = solver.last_stats().unwrap();
        assert!(stats.error_rel <= rtol);
        iterations.push(stats.iterations);
    }
    assert!(iterations[0] <= iterations[1], "{iterations:?}");

    let (loose, tight) = (&solutions[0], &solutions[1]);
    let scale = max_abs(tight, &mesh, Region::NoBndry);
    let gap = max_abs(&(loose - tight), &mesh, Region::NoBndry);
    assert!(gap <= 2e-2 * scale, "loose and tight solutions differ by {gap:e}");
    assert!(max_abs(&(tight - &x_true), &mesh, Region::NoBndry) < 1e-7);
}

/// With `maxits = 0` the first outer iteration already exceeds the ceiling.
#[test]
fn zero_maxits_always_fails() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new().with("maxits", 0), &mesh, &registry);
    let x_true = manufactured(&mesh);
    let rhs = solver.multiply_ax(&x_true).unwrap();
    let err = solver.solve(&rhs, &x_true).unwrap_err();
    assert!(matches!(err, LapError::NotConverged { maxits: 0 }));
    assert_eq!(
        err.to_string(),
        "LaplaceNaulin error: took more than maxits=0 iterations to converge"
    );
    assert_eq!(solver.tracker().ncalls(), 0);
    assert!(solver.last_stats().is_none());
}

/// A zero D makes the residual non-finite; the solver must run to the ceiling.
#[test]
fn zero_d_never_converges() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new().with("maxits", 3), &mesh, &registry);
    let rhs = Field3D::filled(&mesh, 1.0);
    solver.set_coef_d_const(0.0);
    let err = solver.solve(&rhs, &Field3D::zeros(&mesh)).unwrap_err();
    assert!(matches!(err, LapError::NotConverged { maxits: 3 }));
}

/// Coefficients and guess must share the right-hand side's location.
#[test]
fn mismatched_locations_are_rejected() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new(), &mesh, &registry);
    let rhs = Field3D::filled(&mesh, 1.0);

    let staggered_guess = Field3D::zeros(&mesh).with_location(CellLoc::XLow);
    assert!(matches!(
        solver.solve(&rhs, &staggered_guess),
        Err(LapError::LocationMismatch { what: "x0", .. })
    ));

    solver
        .set_coef_d(Field3D::filled(&mesh, 1.0).with_location(CellLoc::XLow))
        .unwrap();
    let err = solver.solve(&rhs, &Field3D::zeros(&mesh)).unwrap_err();
    assert!(matches!(
        err,
        LapError::LocationMismatch { what: "coefficient D", expected: CellLoc::Centre, found: CellLoc::XLow }
    ));
}

/// The registered diagnostic is the running mean over all successful solves.
#[test]
fn diagnostic_tracks_mean_iterations() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let mut solver = solver(Options::new().with("diagnostic_name", "its"), &mesh, &registry);
    set_varying_coefficients(&mut solver, &mesh);
    let x_true = manufactured(&mesh);
    let rhs = solver.multiply_ax(&x_true).unwrap();

    let mut counts = Vec::new();
    for scale in [0.0, 0.5, 1.0] {
        let guess = guess_from(&mesh, &x_true, |i, j, k| scale * x_true[(i, j, k)]);
        solver.solve(&rhs, &guess).unwrap();
        counts.push(solver.last_stats().unwrap().iterations as f64);
    }
    let expected = counts.iter().sum::<f64>() / counts.len() as f64;
    approx::assert_abs_diff_eq!(registry.value("its").unwrap(), expected, epsilon = 1e-12);
    assert_eq!(solver.tracker().ncalls(), 3);
}

/// A second solver under the same diagnostic name does not replace the first.
#[test]
fn duplicate_registration_keeps_first_accessor() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let first = solver(Options::new(), &mesh, &registry);
    let mut second = solver(Options::new(), &mesh, &registry);
    let x_true = manufactured(&mesh);
    let rhs = second.multiply_ax(&x_true).unwrap();
    second.solve(&rhs, &x_true).unwrap();

    assert!(second.mean_iterations() >= 1.0);
    assert_eq!(first.mean_iterations(), 0.0);
    assert_eq!(registry.value("naulinsolver_mean_its"), Some(0.0));
    assert_eq!(registry.sample().len(), 1);
}

/// Zero-Dirichlet boundaries with a zero guess.
#[test]
fn zero_guess_with_zero_dirichlet() {
    init_logging();
    let mesh = mesh();
    let registry = DiagnosticsRegistry::new();
    let inner = Box::new(DenseDelp2::new(Rc::clone(&mesh)));
    let mut solver = LaplaceNaulin::with_inner_solver(&Options::new(), Rc::clone(&mesh), inner, &registry).unwrap();
    set_varying_coefficients(&mut solver, &mesh);
    let rhs = Field3D::from_fn(&mesh, |i, _, k| xcoord(&mesh, i) + (k as f64).cos());
    let x = solver.solve_zero_guess(&rhs).unwrap();
    for k in 0..mesh.local_nz {
        assert_eq!(x[(0, 0, k)], 0.0);
    }
    let back = solver.multiply_ax(&x).unwrap();
    let rel = max_abs(&(&back - &rhs), &mesh, Region::NoBndry) / max_abs(&rhs, &mesh, Region::NoBndry);
    assert!(rel < 1e-5, "relative residual {rel}");
}
