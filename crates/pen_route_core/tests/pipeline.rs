use pen_route_core::{
    GreedyRouter, PathGraph, Point, Polyline, RouterOptions,
    io::input::parse_paths,
    pipeline, route,
};

fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
    Polyline::segment(Point::new(x0, y0), Point::new(x1, y1))
}

fn three_unit_paths() -> Vec<Polyline> {
    vec![
        seg(0.0, 0.0, 1.0, 0.0),
        seg(2.0, 0.0, 3.0, 0.0),
        seg(1.0, 0.0, 2.0, 0.0),
    ]
}

#[test]
fn greedy_chains_three_unit_paths_without_gaps() {
    let graph = PathGraph::build(three_unit_paths(), Point::ORIGIN).expect("graph");
    let tour = GreedyRouter::new(&graph).route().expect("greedy tour");
    let oriented = route::to_oriented_paths(&tour, &graph).expect("valid tour");

    for pair in oriented.windows(2) {
        assert_eq!(pair[0].end().dist(pair[1].start()), 0.0);
    }

    // Origin to (0,0) is 0, the three gaps are 0, and (3,0) back to the
    // origin is 3.
    let cost = route::tour_cost(&oriented, graph.origin());
    assert_eq!(cost, 0.0 + 0.0 + 0.0 + 3.0);
}

#[test]
fn pipeline_reports_each_stage_on_the_three_path_scenario() {
    let options = RouterOptions {
        greedy: true,
        merge_paths: Some(f64::INFINITY),
        ..RouterOptions::default()
    };
    let report = pipeline::run(three_unit_paths(), &options).expect("run");

    // Input order: 0 + 1 (from (1,0) to (2,0)) + 2 (from (3,0) to (1,0))
    // + 2 back from (2,0).
    assert_eq!(report.initial_cost, 5.0);
    assert_eq!(report.greedy_cost, Some(3.0));
    assert_eq!(report.paths_before_merge, 3);
    assert_eq!(report.paths_after_merge, 1);
    assert_eq!(
        report.route[0].points,
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ]
    );
}

#[test]
fn optimized_pipeline_is_never_worse_than_greedy() {
    let text = "\
        # zig-zag hatching drawn in alternating directions\n\
        0,0 10,0\n\
        10,1 0,1\n\
        10,2 0,2\n\
        0,3 10,3\n\
        10,4 0,4\n\
        0,5 10,5\n\
        30,30 31,31 32,30\n\
        5,20\n";
    let paths = parse_paths(text).expect("paths");
    let options = RouterOptions::parse_from_iter(["--runtime=1", "--seed=3"]).expect("options");

    let report = pipeline::run(paths, &options).expect("run");

    let greedy = report.greedy_cost.expect("greedy ran");
    let optimized = report.optimized_cost.expect("optimizer ran");
    assert!(optimized <= greedy + 1e-9);
    assert_eq!(report.route.len(), 8);
    assert!((report.final_cost() - optimized).abs() < 1e-12);
}

#[test]
fn invalid_paths_surface_as_input_errors() {
    let options = RouterOptions::default();
    let bad = vec![seg(0.0, 0.0, f64::NAN, 1.0)];
    let err = pipeline::run(bad, &options).expect_err("nan coordinate");
    assert!(matches!(err, pen_route_core::Error::InvalidInput(_)));
}
