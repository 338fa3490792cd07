use std::f64::consts::PI;
use std::rc::Rc;

use perpinv::config::Options;
use perpinv::context::LaplaceFactory;
use perpinv::field::{Field3D, Region, max_abs};
use perpinv::mesh::Mesh;
use perpinv::parallel::UniverseComm;
use perpinv::solver::{LaplaceNaulin, Laplacian};
use perpinv::utils::DiagnosticsRegistry;

fn main() -> Result<(), perpinv::error::LapError> {
    env_logger::init();
    let comm = UniverseComm::world()?;
    let mesh = Rc::new(Mesh::builder(32, 1, 32).guards(2, 0).comm(comm).build()?);
    let dx = mesh.coordinates().dx;
    let dz = mesh.coordinates().dz;
    let xcoord = |i: usize| (i as f64 - mesh.xstart as f64 + 0.5) * dx;

    // manufactured solution on a slab with a density-like C2 profile
    let x_true = Field3D::from_fn(&mesh, |i, _, k| {
        (PI * xcoord(i)).sin() * (2.0 * PI * k as f64 * dz).cos()
    });
    let c2 = Field3D::from_fn(&mesh, |i, _, _| (-0.5 * xcoord(i)).exp());

    let opt = Options::new()
        .with("type", "naulin")
        .with("rtol", 1e-10)
        .with("global_flags", "SET")
        .with("delp2solver", Options::new().with("type", "dense"));
    let mut solver = LaplaceNaulin::new(Some(&opt), Rc::clone(&mesh))?;
    solver.set_coef_c1(c2.clone())?;
    solver.set_coef_c2(c2)?;
    solver.set_coef_a_const(0.5);

    let rhs = solver.multiply_ax(&x_true)?;
    let guess = Field3D::from_fn(&mesh, |i, j, k| {
        if i < mesh.xstart || i > mesh.xend { x_true[(i, j, k)] } else { 0.0 }
    });
    let x = solver.solve(&rhs, &guess)?;

    let err = max_abs(&(&x - &x_true), &mesh, Region::NoBndry);
    if let Some(stats) = solver.last_stats() {
        println!(
            "naulin: {} iterations, error_rel = {:e}, elapsed = {:?}",
            stats.iterations, stats.error_rel, stats.elapsed
        );
    }
    println!("max |x - x_true| = {err:e}");

    // constant-coefficient answer from the default solver type, for comparison
    let mut dense = LaplaceFactory::create(Some(&Options::new().with("global_flags", "SET")), Rc::clone(&mesh))?;
    let x_dense = dense.solve(&rhs, &guess)?;
    println!(
        "dense delp2 alone: max |x - x_true| = {:e}",
        max_abs(&(&x_dense - &x_true), &mesh, Region::NoBndry)
    );
    DiagnosticsRegistry::global().write_sample(0.0, std::io::stdout())?;
    Ok(())
}
