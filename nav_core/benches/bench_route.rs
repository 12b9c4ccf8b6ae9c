//! Benchmarks for the polygon graph search and corridor synthesis.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;

use nav_core::mesh::{ArcKind, NavArc, NavModel, Polygon, PolygonKind};
use nav_core::search::{corridor, polygon_route, NullObserver};

/// A strip of `n` CV squares connected in a line along +X, each 1000 mm wide.
fn strip_model(n: i32) -> NavModel {
    let mut polygons = Vec::new();
    let mut arcs = Vec::new();

    for i in 0..n {
        let ox = 1000.0 * i as f64;
        polygons.push(Polygon::new(
            i,
            PolygonKind::Cv,
            vec![
                Vector3::new(ox, 0.0, 0.0),
                Vector3::new(ox + 1000.0, 0.0, 0.0),
                Vector3::new(ox + 1000.0, 0.0, 1000.0),
                Vector3::new(ox, 0.0, 1000.0),
            ],
        ));
    }

    for i in 0..(n - 1) {
        let x = 1000.0 * (i + 1) as f64;
        let start = Vector3::new(x, 0.0, 0.0);
        let end = Vector3::new(x, 0.0, 1000.0);
        arcs.push(NavArc {
            from: i,
            to: i + 1,
            start,
            end,
            kind: ArcKind::CvToCv,
        });
        arcs.push(NavArc {
            from: i + 1,
            to: i,
            start,
            end,
            kind: ArcKind::CvToCv,
        });
    }

    let bounding = Polygon::new(
        1000,
        PolygonKind::Bounding,
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1000.0 * n as f64, 0.0, 0.0),
            Vector3::new(1000.0 * n as f64, 0.0, 1000.0),
            Vector3::new(0.0, 0.0, 1000.0),
        ],
    );

    NavModel::new("strip", "bench", polygons, arcs, bounding)
}

fn bench_route(c: &mut Criterion) {
    let model = strip_model(64);
    let start = Vector3::new(500.0, 0.0, 500.0);
    let goal = Vector3::new(63_500.0, 0.0, 500.0);

    c.bench_function("polygon_route_strip_64", |b| {
        b.iter(|| polygon_route(black_box(&model), start, 0, goal, 63, &mut NullObserver))
    });

    let trace = match polygon_route(&model, start, 0, goal, 63, &mut NullObserver) {
        Some(t) => t,
        None => panic!("strip search failed"),
    };
    c.bench_function("corridor_strip_64", |b| {
        b.iter(|| corridor::synthesise(black_box(&model), &trace, goal, 150.0))
    });
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
