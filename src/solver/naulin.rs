//! Iterative inversion of the variable-coefficient perpendicular Laplacian.
//!
//! Solves
//!
//! ```text
//! D delp2(x) + (1/C1) grad_perp(C2) . grad_perp(x) + A x = rhs
//! ```
//!
//! by fixed-point iteration around a constant-coefficient inner solver. The
//! equation is rewritten as
//!
//! ```text
//! delp2(x) = rhs/D - (1/(C1 D)) grad_perp(C2) . grad_perp(x) - (A/D) x
//! ```
//!
//! and each outer iteration inverts `delp2` with the current iterate on the right
//! hand side. Gradient terms are evaluated from the latest iterate after a halo
//! exchange. The iteration converges as long as the variation of `C2` and the
//! size of `A/D` are small compared with `delp2`.
//!
//! # References
//! - Naulin, V. (2003). Turbulent transport and the plasma edge. Phys. Plasmas 10, 4016.
//! - Dudson, B. D. et al. (2009). BOUT++: A framework for parallel plasma fluid simulations. CPC 180, 1467.

use std::rc::Rc;
use std::time::Instant;

use log::{debug, error, info, trace, warn};

use crate::config::{NaulinOptions, Options};
use crate::context::LaplaceFactory;
use crate::error::LapError;
use crate::field::{Field3D, Region, max_abs, mean};
use crate::mesh::Mesh;
use crate::operators::{DiffMethod, ddx, ddz, delp2, grad_perp_dot_grad_perp, metric_dot};
use crate::solver::{InvertFlags, Laplacian};
use crate::utils::{Convergence, ConvergenceTracker, DiagnosticsRegistry, SolveStats};

/// Overwrite the x guard cells of `x` on physical boundaries with those of `x0`.
///
/// Only interior y indices are touched. A subdomain that owns neither x boundary
/// returns `x` unchanged.
pub fn copy_x_boundaries(mut x: Field3D, x0: &Field3D, mesh: &Mesh) -> Field3D {
    let mut copy_columns = |xs: std::ops::Range<usize>| {
        for i in xs {
            for j in mesh.ystart..=mesh.yend {
                for k in 0..mesh.local_nz {
                    x[(i, j, k)] = x0[(i, j, k)];
                }
            }
        }
    };
    if mesh.first_x() {
        copy_columns(0..mesh.xstart);
    }
    if mesh.last_x() {
        copy_columns(mesh.xend + 1..mesh.local_nx);
    }
    x
}

/// Per-solve quantities that do not depend on the iterate.
struct SourceTerms {
    rhs_over_d: Field3D,
    ddx_c: Field3D,
    ddz_c: Field3D,
    one_over_c1d: Field3D,
    a_over_d: Field3D,
}

impl SourceTerms {
    fn new(rhs: &Field3D, coefs: [&Field3D; 4], mesh: &Mesh, method: DiffMethod) -> Self {
        let [a, c1, c2, d] = coefs;
        let loc = rhs.location();
        let c1d = c1 * d;
        SourceTerms {
            rhs_over_d: rhs / d,
            ddx_c: ddx(c2, mesh, loc, method),
            ddz_c: ddz(c2, mesh, loc, method),
            one_over_c1d: 1.0 / &c1d,
            a_over_d: a / d,
        }
    }

    /// Right-hand side handed to the inner solver for iterate `x`.
    fn inner_rhs(&self, x: &Field3D, mesh: &Mesh, method: DiffMethod) -> Field3D {
        let loc = x.location();
        let ddx_x = ddx(x, mesh, loc, method);
        let ddz_x = ddz(x, mesh, loc, method);
        let coupling = metric_dot(mesh.coordinates(), (&self.ddx_c, &self.ddz_c), (&ddx_x, &ddz_x));
        &(&self.rhs_over_d - &(&coupling * &self.one_over_c1d)) - &(&self.a_over_d * x)
    }
}

/// Variable-coefficient Laplacian inversion by fixed-point iteration.
pub struct LaplaceNaulin {
    mesh: Rc<Mesh>,
    coef_a: Field3D,
    coef_c1: Field3D,
    coef_c2: Field3D,
    coef_d: Field3D,
    delp2solver: Box<dyn Laplacian>,
    conv: Convergence<f64>,
    method: DiffMethod,
    global_flags: InvertFlags,
    inner_flags: InvertFlags,
    outer_flags: InvertFlags,
    tracker: ConvergenceTracker,
    last_stats: Option<SolveStats<f64>>,
}

impl LaplaceNaulin {
    /// Build from an options section, creating the inner solver from its
    /// `delp2solver` subsection. The mean iteration count is registered in the
    /// process-wide [`DiagnosticsRegistry`].
    pub fn new(opt: Option<&Options>, mesh: Rc<Mesh>) -> Result<Self, LapError> {
        let opt = opt.ok_or_else(|| LapError::Config("LaplaceNaulin requires an options section".into()))?;
        let inner = LaplaceFactory::create(Some(&opt.get_section("delp2solver")?), Rc::clone(&mesh))?;
        Self::with_inner_solver(opt, mesh, inner, DiagnosticsRegistry::global())
    }

    /// Build around an existing inner solver, registering diagnostics in `registry`.
    ///
    /// The boundary flags read from `opt` are pushed down to `inner`.
    pub fn with_inner_solver(
        opt: &Options,
        mesh: Rc<Mesh>,
        mut inner: Box<dyn Laplacian>,
        registry: &DiagnosticsRegistry,
    ) -> Result<Self, LapError> {
        let settings = NaulinOptions::from_options(opt)?;
        if settings.diff_method == DiffMethod::C4 && mesh.mxg < 2 {
            return Err(LapError::Config(format!(
                "diff_method C4 needs two x guard cells, the mesh has {}",
                mesh.mxg
            )));
        }
        inner.set_global_flags(settings.global_flags);
        inner.set_inner_boundary_flags(settings.inner_boundary_flags);
        inner.set_outer_boundary_flags(settings.outer_boundary_flags);

        let tracker = ConvergenceTracker::new();
        let reader = tracker.clone();
        if registry.register(&settings.diagnostic_name, move || reader.mean_iterations()) {
            info!("LaplaceNaulin: registered diagnostic '{}'", settings.diagnostic_name);
        } else {
            debug!(
                "LaplaceNaulin: diagnostic '{}' already registered, keeping the existing one",
                settings.diagnostic_name
            );
        }
        info!(
            "LaplaceNaulin: rtol={:e}, atol={:e}, maxits={}, diff_method={:?}",
            settings.rtol, settings.atol, settings.maxits, settings.diff_method
        );

        Ok(LaplaceNaulin {
            coef_a: Field3D::zeros(&mesh),
            coef_c1: Field3D::filled(&mesh, 1.0),
            coef_c2: Field3D::zeros(&mesh),
            coef_d: Field3D::filled(&mesh, 1.0),
            mesh,
            delp2solver: inner,
            conv: Convergence {
                rtol: settings.rtol,
                atol: settings.atol,
                max_iters: settings.maxits,
            },
            method: settings.diff_method,
            global_flags: settings.global_flags,
            inner_flags: settings.inner_boundary_flags,
            outer_flags: settings.outer_boundary_flags,
            tracker,
            last_stats: None,
        })
    }

    fn check_shape(&self, what: &'static str, f: &Field3D) -> Result<(), LapError> {
        let expected = self.mesh.field_shape();
        if f.shape() == expected {
            Ok(())
        } else {
            Err(LapError::ShapeMismatch { what, expected, found: f.shape() })
        }
    }

    fn check_inputs(&self, rhs: &Field3D, x0: &Field3D) -> Result<(), LapError> {
        self.check_shape("rhs", rhs)?;
        self.check_shape("x0", x0)?;
        let expected = rhs.location();
        for (what, f) in [
            ("x0", x0),
            ("coefficient D", &self.coef_d),
            ("coefficient C1", &self.coef_c1),
            ("coefficient C2", &self.coef_c2),
            ("coefficient A", &self.coef_a),
        ] {
            if f.location() != expected {
                return Err(LapError::LocationMismatch { what, expected, found: f.location() });
            }
        }
        Ok(())
    }

    /// Set both `C1` and `C2` to `c`.
    pub fn set_coef_c(&mut self, c: Field3D) -> Result<(), LapError> {
        self.check_shape("coefficient C", &c)?;
        self.coef_c1 = c.clone();
        self.coef_c2 = c;
        Ok(())
    }

    pub fn set_coef_a_const(&mut self, value: f64) {
        self.coef_a = Field3D::filled(&self.mesh, value).with_location(self.coef_a.location());
    }

    pub fn set_coef_c1_const(&mut self, value: f64) {
        self.coef_c1 = Field3D::filled(&self.mesh, value).with_location(self.coef_c1.location());
    }

    pub fn set_coef_c2_const(&mut self, value: f64) {
        self.coef_c2 = Field3D::filled(&self.mesh, value).with_location(self.coef_c2.location());
    }

    pub fn set_coef_d_const(&mut self, value: f64) {
        self.coef_d = Field3D::filled(&self.mesh, value).with_location(self.coef_d.location());
    }

    /// Apply the forward operator `D delp2(x) + grad_perp(C2) . grad_perp(x) / C1 + A x`.
    ///
    /// Uses the same discretization as [`Laplacian::solve`], so a converged
    /// solution reproduces the right-hand side on interior cells.
    pub fn multiply_ax(&self, x: &Field3D) -> Result<Field3D, LapError> {
        self.check_inputs(x, x)?;
        let mesh = self.mesh.as_ref();
        let lap = &self.coef_d * &delp2(x, mesh);
        let coupling = &grad_perp_dot_grad_perp(&self.coef_c2, x, mesh, self.method) / &self.coef_c1;
        Ok(&(&lap + &coupling) + &(&self.coef_a * x))
    }

    /// Statistics of the last successful solve.
    pub fn last_stats(&self) -> Option<&SolveStats<f64>> {
        self.last_stats.as_ref()
    }

    pub fn tracker(&self) -> &ConvergenceTracker {
        &self.tracker
    }

    /// Mean number of outer iterations over all successful solves so far.
    pub fn mean_iterations(&self) -> f64 {
        self.tracker.mean_iterations()
    }
}

impl Laplacian for LaplaceNaulin {
    /// Solve for `x` starting from `x0`.
    ///
    /// The x guard cells of `x0` on physical boundaries are re-imposed before
    /// every inner solve, so boundary data given there (for `SET` flags) is never
    /// lost between iterations.
    ///
    /// # Errors
    /// * `ShapeMismatch` / `LocationMismatch` if `rhs`, `x0` and the coefficients disagree.
    /// * `NotConverged` once more than `maxits` outer iterations were needed.
    /// * Any error of the inner solver, unchanged.
    fn solve(&mut self, rhs: &Field3D, x0: &Field3D) -> Result<Field3D, LapError> {
        let timer = Instant::now();
        self.check_inputs(rhs, x0)?;
        let mesh = Rc::clone(&self.mesh);
        let method = self.method;

        let terms = SourceTerms::new(
            rhs,
            [&self.coef_a, &self.coef_c1, &self.coef_c2, &self.coef_d],
            &mesh,
            method,
        );
        let rms_rhs = mean(&(&terms.rhs_over_d * &terms.rhs_over_d), &mesh, Region::NoBndry).sqrt();

        let mut x = x0.clone();
        let mut b = terms.inner_rhs(&x, &mesh, method);
        let mut count = 0usize;
        let mut warned = false;
        loop {
            x = copy_x_boundaries(x, x0, &mesh);
            x = self.delp2solver.solve(&b, &x)?;
            mesh.communicate(&mut x);

            b = terms.inner_rhs(&x, &mesh, method);
            let error_abs = max_abs(&(&b - &delp2(&x, &mesh)), &mesh, Region::NoBndry);
            let error_rel = error_abs / rms_rhs;
            count += 1;
            trace!("LaplaceNaulin: iteration {count}, error_rel = {error_rel:e}, error_abs = {error_abs:e}");

            if !error_abs.is_finite() && !warned {
                warn!("LaplaceNaulin: non-finite residual at iteration {count}, check D and C1 for zeros");
                warned = true;
            }
            if count > self.conv.max_iters {
                error!(
                    "LaplaceNaulin: no convergence after {count} iterations (error_rel = {error_rel:e}, error_abs = {error_abs:e})"
                );
                return Err(LapError::NotConverged { maxits: self.conv.max_iters });
            }
            if self.conv.is_converged(error_abs, error_rel) {
                self.tracker.record(count);
                let elapsed = timer.elapsed();
                debug!("LaplaceNaulin: converged in {count} iterations, error_rel = {error_rel:e}, {elapsed:?}");
                self.last_stats = Some(SolveStats {
                    iterations: count,
                    error_abs,
                    error_rel,
                    elapsed,
                });
                return Ok(x);
            }
        }
    }

    fn global_flags(&self) -> InvertFlags {
        self.global_flags
    }
    fn inner_boundary_flags(&self) -> InvertFlags {
        self.inner_flags
    }
    fn outer_boundary_flags(&self) -> InvertFlags {
        self.outer_flags
    }

    fn set_global_flags(&mut self, flags: InvertFlags) {
        self.global_flags = flags;
        self.delp2solver.set_global_flags(flags);
    }
    fn set_inner_boundary_flags(&mut self, flags: InvertFlags) {
        self.inner_flags = flags;
        self.delp2solver.set_inner_boundary_flags(flags);
    }
    fn set_outer_boundary_flags(&mut self, flags: InvertFlags) {
        self.outer_flags = flags;
        self.delp2solver.set_outer_boundary_flags(flags);
    }

    fn set_coef_a(&mut self, a: Field3D) -> Result<(), LapError> {
        self.check_shape("coefficient A", &a)?;
        self.coef_a = a;
        Ok(())
    }
    fn set_coef_c1(&mut self, c1: Field3D) -> Result<(), LapError> {
        self.check_shape("coefficient C1", &c1)?;
        self.coef_c1 = c1;
        Ok(())
    }
    fn set_coef_c2(&mut self, c2: Field3D) -> Result<(), LapError> {
        self.check_shape("coefficient C2", &c2)?;
        self.coef_c2 = c2;
        Ok(())
    }
    fn set_coef_d(&mut self, d: Field3D) -> Result<(), LapError> {
        self.check_shape("coefficient D", &d)?;
        self.coef_d = d;
        Ok(())
    }
}
