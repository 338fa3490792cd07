//! Index regions and global reductions over them.

use super::field3d::Field3D;
use crate::mesh::Mesh;

/// Which cells of a subdomain a reduction runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Every local cell, guards included.
    All,
    /// Interior cells only: no x or y guard cells.
    NoBndry,
}

impl Region {
    pub fn x_range(self, mesh: &Mesh) -> std::ops::Range<usize> {
        match self {
            Region::All => 0..mesh.local_nx,
            Region::NoBndry => mesh.xstart..mesh.xend + 1,
        }
    }

    pub fn y_range(self, mesh: &Mesh) -> std::ops::Range<usize> {
        match self {
            Region::All => 0..mesh.local_ny,
            Region::NoBndry => mesh.ystart..mesh.yend + 1,
        }
    }

    /// Visit every `(i, j, k)` of the region on this subdomain.
    pub fn for_each<F: FnMut(usize, usize, usize)>(self, mesh: &Mesh, mut f: F) {
        for i in self.x_range(mesh) {
            for j in self.y_range(mesh) {
                for k in 0..mesh.local_nz {
                    f(i, j, k);
                }
            }
        }
    }
}

/// Largest `|f|` over `region` on all subdomains. NaN wins over any number.
pub fn max_abs(f: &Field3D, mesh: &Mesh, region: Region) -> f64 {
    let mut local = 0.0_f64;
    region.for_each(mesh, |i, j, k| {
        let v = f[(i, j, k)].abs();
        if !local.is_nan() && (v.is_nan() || v > local) {
            local = v;
        }
    });
    mesh.comm().all_reduce_max(local)
}

/// Mean of `f` over `region` on all subdomains.
pub fn mean(f: &Field3D, mesh: &Mesh, region: Region) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    region.for_each(mesh, |i, j, k| {
        sum += f[(i, j, k)];
        count += 1;
    });
    let comm = mesh.comm();
    comm.all_reduce_sum(sum) / comm.all_reduce_sum(count as f64)
}
