//! Local view of a structured grid decomposed in x.
//!
//! A [`Mesh`] describes one subdomain: its local sizes including guard cells,
//! the interior index ranges, where it sits in the x decomposition, its
//! [`Coordinates`] and the [`Comm`] used to talk to neighbouring subdomains.
//! z is periodic and carries no guard cells.

pub mod coordinates;
pub use coordinates::Coordinates;

use log::debug;

use crate::error::LapError;
use crate::field::Field3D;
use crate::parallel::{Comm, SerialComm};

pub struct Mesh {
    /// Local x size, guard cells included
    pub local_nx: usize,
    /// Local y size, guard cells included
    pub local_ny: usize,
    pub local_nz: usize,
    pub mxg: usize,
    pub myg: usize,
    /// First and last interior x index
    pub xstart: usize,
    pub xend: usize,
    /// First and last interior y index
    pub ystart: usize,
    pub yend: usize,
    x_proc: usize,
    nxpe: usize,
    coords: Coordinates,
    comm: Box<dyn Comm>,
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("local_nx", &self.local_nx)
            .field("local_ny", &self.local_ny)
            .field("local_nz", &self.local_nz)
            .field("mxg", &self.mxg)
            .field("myg", &self.myg)
            .field("x_proc", &self.x_proc)
            .field("nxpe", &self.nxpe)
            .finish_non_exhaustive()
    }
}

impl Mesh {
    pub fn builder(nx: usize, ny: usize, nz: usize) -> MeshBuilder {
        MeshBuilder::new(nx, ny, nz)
    }

    pub fn field_shape(&self) -> (usize, usize, usize) {
        (self.local_nx, self.local_ny, self.local_nz)
    }

    /// Does this subdomain own the inner x boundary?
    pub fn first_x(&self) -> bool {
        self.x_proc == 0
    }

    /// Does this subdomain own the outer x boundary?
    pub fn last_x(&self) -> bool {
        self.x_proc + 1 == self.nxpe
    }

    pub fn x_proc(&self) -> usize {
        self.x_proc
    }

    pub fn nxpe(&self) -> usize {
        self.nxpe
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coords
    }

    pub fn comm(&self) -> &dyn Comm {
        self.comm.as_ref()
    }

    /// Replace the metric. Its (x, y) shape must match the local grid.
    pub fn with_coordinates(mut self, coords: Coordinates) -> Result<Self, LapError> {
        if coords.shape() != (self.local_nx, self.local_ny) {
            return Err(LapError::Config(format!(
                "metric shape {:?} does not match local grid ({}, {})",
                coords.shape(),
                self.local_nx,
                self.local_ny
            )));
        }
        self.coords = coords;
        Ok(self)
    }

    /// Exchange x guard cells with the neighbouring subdomains.
    ///
    /// Two shift phases: interior planes next to the upper edge go right while the
    /// lower guards are filled from the left, then the reverse. Guards on a physical
    /// boundary are left as they are, and so are the y guard cells.
    pub fn communicate(&self, f: &mut Field3D) {
        assert_eq!(f.shape(), self.field_shape(), "field does not belong to this mesh");
        let left = (!self.first_x()).then(|| self.x_proc - 1);
        let right = (!self.last_x()).then(|| self.x_proc + 1);
        let mxg = self.mxg;

        let lower_guards = 0..self.xstart;
        let upper_guards = self.xend + 1..self.local_nx;

        let send = f.x_planes(self.xend + 1 - mxg..self.xend + 1).to_vec();
        let mut recv = f.x_planes(lower_guards.clone()).to_vec();
        self.comm.send_recv(&send, right, &mut recv, left);
        f.x_planes_mut(lower_guards).copy_from_slice(&recv);

        let send = f.x_planes(self.xstart..self.xstart + mxg).to_vec();
        let mut recv = f.x_planes(upper_guards.clone()).to_vec();
        self.comm.send_recv(&send, left, &mut recv, right);
        f.x_planes_mut(upper_guards).copy_from_slice(&recv);
    }
}

/// Builder for a [`Mesh`].
///
/// Sizes are interior sizes; guard cells are added on top. Defaults: `mxg = 2`,
/// `myg = 0`, a unit box in x and z, a Cartesian metric, and a serial
/// communicator placing this subdomain at the position given by its rank.
pub struct MeshBuilder {
    nx: usize,
    ny: usize,
    nz: usize,
    mxg: usize,
    myg: usize,
    lx: f64,
    lz: f64,
    metric: (f64, f64, f64),
    x_position: Option<(usize, usize)>,
    comm: Option<Box<dyn Comm>>,
}

impl MeshBuilder {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            mxg: 2,
            myg: 0,
            lx: 1.0,
            lz: 1.0,
            metric: (1.0, 1.0, 0.0),
            x_position: None,
            comm: None,
        }
    }

    pub fn guards(mut self, mxg: usize, myg: usize) -> Self {
        self.mxg = mxg;
        self.myg = myg;
        self
    }

    /// Physical length of this subdomain's interior in x, and of the periodic z domain.
    pub fn lengths(mut self, lx: f64, lz: f64) -> Self {
        self.lx = lx;
        self.lz = lz;
        self
    }

    /// Uniform metric components `g11`, `g33`, `g13`.
    pub fn metric(mut self, g11: f64, g33: f64, g13: f64) -> Self {
        self.metric = (g11, g33, g13);
        self
    }

    /// Place this subdomain at `x_proc` of `nxpe` instead of deriving it from the rank.
    pub fn x_position(mut self, x_proc: usize, nxpe: usize) -> Self {
        self.x_position = Some((x_proc, nxpe));
        self
    }

    pub fn comm<C: Comm + 'static>(mut self, comm: C) -> Self {
        self.comm = Some(Box::new(comm));
        self
    }

    pub fn build(self) -> Result<Mesh, LapError> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(LapError::Config(format!(
                "mesh sizes must be non-zero, got ({}, {}, {})",
                self.nx, self.ny, self.nz
            )));
        }
        if self.mxg == 0 {
            return Err(LapError::Config("at least one x guard cell is required".into()));
        }
        if self.nx < self.mxg {
            return Err(LapError::Config(format!(
                "nx = {} interior points cannot fill mxg = {} guard planes",
                self.nx, self.mxg
            )));
        }
        if !(self.lx > 0.0 && self.lz > 0.0) {
            return Err(LapError::Config("domain lengths must be positive".into()));
        }
        let comm = self.comm.unwrap_or_else(|| Box::new(SerialComm));
        let (x_proc, nxpe) = self.x_position.unwrap_or((comm.rank(), comm.size()));
        if x_proc >= nxpe {
            return Err(LapError::Config(format!(
                "x_proc = {} is outside a decomposition of {} subdomains",
                x_proc, nxpe
            )));
        }

        let local_nx = self.nx + 2 * self.mxg;
        let local_ny = self.ny + 2 * self.myg;
        let (g11, g33, g13) = self.metric;
        let coords = Coordinates::with_metric(
            (local_nx, local_ny),
            self.lx / self.nx as f64,
            self.lz / self.nz as f64,
            g11,
            g33,
            g13,
        );
        debug!(
            "mesh: {}x{}x{} local cells, subdomain {} of {}",
            local_nx, local_ny, self.nz, x_proc, nxpe
        );
        Ok(Mesh {
            local_nx,
            local_ny,
            local_nz: self.nz,
            mxg: self.mxg,
            myg: self.myg,
            xstart: self.mxg,
            xend: self.mxg + self.nx - 1,
            ystart: self.myg,
            yend: self.myg + self.ny - 1,
            x_proc,
            nxpe,
            coords,
            comm,
        })
    }
}
