use std::rc::Rc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use perpinv::config::Options;
use perpinv::field::Field3D;
use perpinv::mesh::Mesh;
use perpinv::solver::{DenseDelp2, InvertFlags, LaplaceNaulin, Laplacian};
use perpinv::utils::DiagnosticsRegistry;

fn bench_naulin_vs_dense(c: &mut Criterion) {
    let mesh = Rc::new(Mesh::builder(16, 1, 16).guards(2, 0).build().unwrap());
    let rhs = Field3D::from_fn(&mesh, |i, _, k| (0.3 * i as f64).sin() * (0.4 * k as f64).cos());
    let x0 = Field3D::zeros(&mesh);

    c.bench_function("dense delp2 (cached LU)", |ben| {
        let mut solver = DenseDelp2::new(Rc::clone(&mesh));
        solver.set_global_flags(InvertFlags::SET);
        ben.iter(|| solver.solve(black_box(&rhs), black_box(&x0)).unwrap())
    });

    c.bench_function("naulin, varying C2", |ben| {
        let registry = DiagnosticsRegistry::new();
        let inner = Box::new(DenseDelp2::new(Rc::clone(&mesh)));
        let opt = Options::new().with("global_flags", "SET");
        let mut solver = LaplaceNaulin::with_inner_solver(&opt, Rc::clone(&mesh), inner, &registry).unwrap();
        solver
            .set_coef_c2(Field3D::from_fn(&mesh, |i, _, _| 1.0 + 0.02 * i as f64))
            .unwrap();
        ben.iter(|| solver.solve(black_box(&rhs), black_box(&x0)).unwrap())
    });
}

criterion_group!(benches, bench_naulin_vs_dense);
criterion_main!(benches);
