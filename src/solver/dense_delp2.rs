//! Direct inversion of the constant-coefficient perpendicular Laplacian using Faer.
//!
//! For every interior y index the second-order `delp2` stencil is assembled on the
//! global (interior x) × (periodic z) plane into a dense matrix, factorized with
//! partially pivoted LU, and the factorization is cached until the boundary flags
//! change.
//!
//! On an x-decomposed grid every rank gathers the right-hand side, the guess and
//! the stencil weights of all subdomains, solves the whole plane, and keeps its own
//! columns together with the neighbouring columns its guard cells overlap. The
//! result does not depend on the decomposition.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs

use std::rc::Rc;

use faer::linalg::solvers::{PartialPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};
use log::{debug, trace};

use crate::config::Options;
use crate::error::LapError;
use crate::field::Field3D;
use crate::mesh::Mesh;
use crate::operators::delp2_stencil;
use crate::parallel::Comm;
use crate::solver::{BoundaryKind, InvertFlags, Laplacian};

/// Dense direct solver for `delp2(x) = b`.
pub struct DenseDelp2 {
    mesh: Rc<Mesh>,
    global_flags: InvertFlags,
    inner_flags: InvertFlags,
    outer_flags: InvertFlags,
    /// Stencil weights of every interior column of every subdomain, 9 per `(g, j)`
    stencils: Option<Vec<f64>>,
    /// Cached factorization per interior y index
    factors: Vec<Option<PartialPivLu<f64>>>,
}

/// A local field gathered from every subdomain, addressed by global x column.
struct Gathered<'a> {
    mesh: &'a Mesh,
    nxi: usize,
    nx_global: usize,
    data: Vec<f64>,
}

impl<'a> Gathered<'a> {
    fn new(mesh: &'a Mesh, local: &Field3D) -> Self {
        let nxi = mesh.xend - mesh.xstart + 1;
        let chunk = local.as_slice().len();
        let mut data = vec![0.0; chunk * mesh.nxpe()];
        mesh.comm().all_gather(local.as_slice(), &mut data);
        Gathered { mesh, nxi, nx_global: nxi * mesh.nxpe(), data }
    }

    /// Value in global column `g`. `-1` and `nx_global` are the guard columns
    /// just outside the inner and outer physical boundaries.
    fn at(&self, g: isize, j: usize, k: usize) -> f64 {
        let m = self.mesh;
        let n = self.nx_global as isize;
        let (rank, i) = if g < 0 {
            (0, (m.xstart as isize + g) as usize)
        } else if g >= n {
            (m.nxpe() - 1, m.xend + 1 + (g - n) as usize)
        } else {
            let g = g as usize;
            (g / self.nxi, m.xstart + g % self.nxi)
        };
        let chunk = m.local_nx * m.local_ny * m.local_nz;
        self.data[rank * chunk + (i * m.local_ny + j) * m.local_nz + k]
    }
}

/// Known value of a guard cell beyond a physical boundary, or `None` when the
/// guard is tied to the adjacent interior column.
fn known_guard(kind: BoundaryKind, b: &Gathered, x0: &Gathered, g: isize, j: usize, k: usize) -> Option<f64> {
    match kind {
        BoundaryKind::ZeroGradient => None,
        BoundaryKind::DirichletZero => Some(0.0),
        BoundaryKind::DirichletGuess => Some(x0.at(g, j, k)),
        BoundaryKind::DirichletRhs => Some(b.at(g, j, k)),
    }
}

fn stencil_at(stencils: &[f64], ny: usize, g: usize, j: usize) -> [[f64; 3]; 3] {
    let o = (g * ny + j) * 9;
    let s = &stencils[o..o + 9];
    [[s[0], s[1], s[2]], [s[3], s[4], s[5]], [s[6], s[7], s[8]]]
}

fn same_on_all_ranks(comm: &dyn Comm, v: usize) -> bool {
    let v = v as f64;
    comm.all_reduce_max(v) == v && comm.all_reduce_max(-v) == -v
}

impl DenseDelp2 {
    /// Create a solver with zero Dirichlet boundaries (no factorization yet).
    pub fn new(mesh: Rc<Mesh>) -> Self {
        let ny = mesh.yend - mesh.ystart + 1;
        DenseDelp2 {
            mesh,
            global_flags: InvertFlags::empty(),
            inner_flags: InvertFlags::empty(),
            outer_flags: InvertFlags::empty(),
            stencils: None,
            factors: (0..ny).map(|_| None).collect(),
        }
    }

    /// Read `global_flags`, `inner_boundary_flags` and `outer_boundary_flags`.
    pub fn from_options(opt: &Options, mesh: Rc<Mesh>) -> Result<Self, LapError> {
        let mut solver = Self::new(mesh);
        solver.global_flags = opt.get_flags("global_flags")?;
        solver.inner_flags = opt.get_flags("inner_boundary_flags")?;
        solver.outer_flags = opt.get_flags("outer_boundary_flags")?;
        Ok(solver)
    }

    fn inner_kind(&self) -> BoundaryKind {
        (self.global_flags | self.inner_flags).boundary_kind()
    }

    fn outer_kind(&self) -> BoundaryKind {
        (self.global_flags | self.outer_flags).boundary_kind()
    }

    fn invalidate(&mut self) {
        self.factors.iter_mut().for_each(|f| *f = None);
    }

    fn check_fields(&self, b: &Field3D, x0: &Field3D) -> Result<(), LapError> {
        let expected = self.mesh.field_shape();
        for (what, f) in [("b", b), ("x0", x0)] {
            if f.shape() != expected {
                return Err(LapError::ShapeMismatch { what, expected, found: f.shape() });
            }
        }
        if b.location() != x0.location() {
            return Err(LapError::LocationMismatch {
                what: "x0",
                expected: b.location(),
                found: x0.location(),
            });
        }
        if self.inner_kind() == BoundaryKind::ZeroGradient && self.outer_kind() == BoundaryKind::ZeroGradient {
            return Err(LapError::Unsupported(
                "zero-gradient conditions on both x boundaries leave the inversion singular",
            ));
        }
        Ok(())
    }

    /// Gather the stencil weights of all subdomains. Collective; done once.
    fn gather_stencils(&mut self) -> Result<(), LapError> {
        if self.stencils.is_some() {
            return Ok(());
        }
        let mesh = Rc::clone(&self.mesh);
        let comm = mesh.comm();
        if comm.size() != mesh.nxpe() {
            return Err(LapError::Config(format!(
                "DenseDelp2 needs one rank per x subdomain: {} ranks for {} subdomains",
                comm.size(),
                mesh.nxpe()
            )));
        }
        let uniform = [mesh.local_nx, mesh.local_ny, mesh.local_nz, mesh.xstart]
            .into_iter()
            .fold(true, |ok, v| same_on_all_ranks(comm, v) && ok);
        if !uniform {
            return Err(LapError::Unsupported("DenseDelp2 needs x subdomains of equal size"));
        }

        let ny = mesh.local_ny;
        let mut local = Vec::with_capacity((mesh.xend - mesh.xstart + 1) * ny * 9);
        for i in mesh.xstart..=mesh.xend {
            for j in 0..ny {
                let w = delp2_stencil(mesh.coordinates(), i, j);
                local.extend(w.iter().flatten());
            }
        }
        let mut all = vec![0.0; local.len() * mesh.nxpe()];
        comm.all_gather(&local, &mut all);
        debug!("DenseDelp2: gathered stencils of {} subdomains", mesh.nxpe());
        self.stencils = Some(all);
        Ok(())
    }
}

/// Assemble the `delp2` matrix of y index `j` over all `nx_global` interior
/// columns. Unknowns are ordered `g * nz + k`.
fn assemble(
    stencils: &[f64],
    ny: usize,
    nx_global: usize,
    nz: usize,
    j: usize,
    inner: BoundaryKind,
    outer: BoundaryKind,
) -> Mat<f64> {
    let n = nx_global * nz;
    let mut a = Mat::from_fn(n, n, |_, _| 0.0);
    for g in 0..nx_global {
        let w = stencil_at(stencils, ny, g, j);
        for k in 0..nz {
            let row = g * nz + k;
            for (di, wrow) in w.iter().enumerate() {
                // column in interior numbering, None when it falls on a Dirichlet guard
                let col = if g + di == 0 {
                    (inner == BoundaryKind::ZeroGradient).then_some(0)
                } else if g + di > nx_global {
                    (outer == BoundaryKind::ZeroGradient).then_some(nx_global - 1)
                } else {
                    Some(g + di - 1)
                };
                let Some(c) = col else { continue };
                for (dk, &wt) in wrow.iter().enumerate() {
                    let kk = (k + nz + dk - 1) % nz;
                    a[(row, c * nz + kk)] += wt;
                }
            }
        }
    }
    a
}

impl Laplacian for DenseDelp2 {
    /// Solve `delp2(x) = b` on every interior y index.
    ///
    /// Collective over the mesh communicator.
    ///
    /// # Returns
    /// * `Ok(x)` with interior values from the factorized solve, guard cells shared
    ///   with a neighbouring subdomain holding the neighbour's solution, guard cells
    ///   on a physical boundary filled according to the flags, and y guard cells
    ///   copied from `x0`.
    fn solve(&mut self, b: &Field3D, x0: &Field3D) -> Result<Field3D, LapError> {
        self.check_fields(b, x0)?;
        self.gather_stencils()?;
        let mesh = Rc::clone(&self.mesh);
        let (inner, outer) = (self.inner_kind(), self.outer_kind());
        let nxi = mesh.xend - mesh.xstart + 1;
        let nx_global = nxi * mesh.nxpe();
        let (ny, nz) = (mesh.local_ny, mesh.local_nz);
        let n = nx_global * nz;
        // global column of local index 0
        let first = (mesh.x_proc() * nxi) as isize - mesh.xstart as isize;

        let b_all = Gathered::new(&mesh, b);
        let x0_all = Gathered::new(&mesh, x0);
        let mut x = x0.clone();
        for j in mesh.ystart..=mesh.yend {
            let jj = j - mesh.ystart;
            let stencils = self
                .stencils
                .as_deref()
                .ok_or_else(|| LapError::FactorError("stencil weights were not gathered".into()))?;
            if self.factors[jj].is_none() {
                trace!("DenseDelp2: factorizing {n}x{n} system for y index {j}");
                let a = assemble(stencils, ny, nx_global, nz, j, inner, outer);
                self.factors[jj] = Some(PartialPivLu::new(a.as_ref()));
            }
            let factor = self.factors[jj]
                .as_ref()
                .ok_or_else(|| LapError::FactorError(format!("no factorization for y index {j}")))?;

            let mut rhs = vec![0.0; n];
            for g in 0..nx_global {
                let w = stencil_at(stencils, ny, g, j);
                let edges = [
                    (g == 0, inner, -1, w[0]),
                    (g + 1 == nx_global, outer, nx_global as isize, w[2]),
                ];
                for k in 0..nz {
                    let mut v = b_all.at(g as isize, j, k);
                    for &(touches, kind, guard, wrow) in &edges {
                        if !touches {
                            continue;
                        }
                        for (dk, &wt) in wrow.iter().enumerate() {
                            let kk = (k + nz + dk - 1) % nz;
                            if let Some(value) = known_guard(kind, &b_all, &x0_all, guard, j, kk) {
                                v -= wt * value;
                            }
                        }
                    }
                    rhs[g * nz + k] = v;
                }
            }

            let x_mat = MatMut::from_column_major_slice_mut(&mut rhs, n, 1);
            factor.solve_in_place_with_conj(Conj::No, x_mat);

            for i in 0..mesh.local_nx {
                let g = first + i as isize;
                for k in 0..nz {
                    x[(i, j, k)] = if g >= 0 && g < nx_global as isize {
                        rhs[g as usize * nz + k]
                    } else {
                        let (kind, adjacent) = if g < 0 { (inner, 0) } else { (outer, nx_global - 1) };
                        match kind {
                            BoundaryKind::ZeroGradient => rhs[adjacent * nz + k],
                            BoundaryKind::DirichletZero => 0.0,
                            BoundaryKind::DirichletGuess => x0[(i, j, k)],
                            BoundaryKind::DirichletRhs => b[(i, j, k)],
                        }
                    };
                }
            }
        }
        x.set_location(b.location());
        Ok(x)
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
        self.invalidate();
    }
    fn set_inner_boundary_flags(&mut self, flags: InvertFlags) {
        self.inner_flags = flags;
        self.invalidate();
    }
    fn set_outer_boundary_flags(&mut self, flags: InvertFlags) {
        self.outer_flags = flags;
        self.invalidate();
    }
}
