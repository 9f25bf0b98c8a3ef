use crate::{
    split_data_filter, Agg, Basis, CmpOp, Filter, ObsOp, Operand, Point, Query, Region,
};
use serde_json::json;
use test_log::test;

fn pt(x: f64, y: f64) -> Point {
    Point { x, y, z: None }
}

#[test]
fn test_parse_and_of_obs_and_x() {
    let q: Query = serde_json::from_value(json!({
        "selection": {"filter": {"op": "AND", "children": [
            {"type": "obs", "key": "group", "op": "=", "value": "a"},
            {"type": "X", "key": "expr", "op": ">", "value": 0}
        ]}}
    }))
    .unwrap();
    let filter = q.selection.unwrap().filter.unwrap();
    assert_eq!(
        filter,
        Filter::And(vec![
            Filter::obs("group", ObsOp::Eq, json!("a")),
            Filter::x("expr", CmpOp::Gt, Operand::Scalar(0.0)),
        ])
    );
}

#[test]
fn test_split_data_filter_walks_whole_tree() {
    let umap = Basis::new("X_umap");
    let f = Filter::Or(vec![
        Filter::Not(Box::new(Filter::obs("leiden", ObsOp::In, json!(["1", "2"])))),
        Filter::And(vec![
            Filter::x("CD14", CmpOp::Between, Operand::Range([1.0, 2.0])),
            Filter::basis(
                umap,
                Region::Rect {
                    min: vec![0.0, 0.0],
                    max: vec![1.0, 1.0],
                },
            ),
            Filter::x("CD3E", CmpOp::Le, Operand::Scalar(0.5)),
        ]),
    ]);
    let keys = split_data_filter(&f);
    assert_eq!(keys.obs.iter().collect::<Vec<_>>(), vec!["leiden"]);
    assert_eq!(keys.x.iter().collect::<Vec<_>>(), vec!["CD14", "CD3E"]);
    assert_eq!(keys.basis.iter().collect::<Vec<_>>(), vec!["X_umap_2"]);
    assert_eq!(keys.all().count(), 4);
}

#[test]
fn test_filter_wire_shape_survives_serialization() {
    let f = Filter::Not(Box::new(Filter::basis(
        Basis::new("X_tsne"),
        Region::Polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
    )));
    let v = serde_json::to_value(&f).unwrap();
    assert_eq!(v["op"], "NOT");
    assert_eq!(v["children"][0]["type"], "basis");
    let back: Filter = serde_json::from_value(v).unwrap();
    assert_eq!(back, f);
}

#[test]
fn test_malformed_filters_rejected() {
    let not_two = json!({"op": "NOT", "children": [
        {"type": "obs", "key": "a", "op": "=", "value": 1},
        {"type": "obs", "key": "b", "op": "=", "value": 1}
    ]});
    assert!(serde_json::from_value::<Filter>(not_two).is_err());

    let between_scalar = json!({"type": "X", "key": "a", "op": "between", "value": 3});
    assert!(serde_json::from_value::<Filter>(between_scalar).is_err());

    let in_scalar = json!({"type": "obs", "key": "a", "op": "in", "value": "x"});
    assert!(serde_json::from_value::<Filter>(in_scalar).is_err());

    let unknown_type = json!({"type": "var", "key": "a", "op": "=", "value": 1});
    assert!(serde_json::from_value::<Filter>(unknown_type).is_err());
}

#[test]
fn test_rect_and_radius_include_boundary() {
    let rect = Region::Rect {
        min: vec![0.0, 0.0],
        max: vec![2.0, 1.0],
    };
    assert!(rect.contains(&pt(0.0, 0.0)));
    assert!(rect.contains(&pt(2.0, 1.0)));
    assert!(rect.contains(&pt(1.0, 0.5)));
    assert!(!rect.contains(&pt(2.0001, 0.5)));

    let ball = Region::Radius {
        center: vec![0.0, 0.0, 0.0],
        r: 1.0,
    };
    assert!(ball.contains(&Point { x: 0.0, y: 0.0, z: Some(1.0) }));
    assert!(!ball.contains(&Point { x: 0.8, y: 0.8, z: Some(0.0) }));
    // A 3D region cannot contain a 2D point.
    assert!(!ball.contains(&pt(0.0, 0.0)));
}

#[test]
fn test_polygon_edges_and_vertices_are_inside() {
    let square = Region::Polygon(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]);
    assert!(square.contains(&pt(2.0, 2.0)));
    assert!(square.contains(&pt(0.0, 2.0)));
    assert!(square.contains(&pt(4.0, 4.0)));
    assert!(square.contains(&pt(2.0, 0.0)));
    assert!(!square.contains(&pt(4.5, 2.0)));
    assert!(!square.contains(&pt(-0.1, -0.1)));

    let concave = Region::Polygon(vec![
        [0.0, 0.0],
        [4.0, 0.0],
        [4.0, 4.0],
        [2.0, 1.0],
        [0.0, 4.0],
    ]);
    assert!(!concave.contains(&pt(2.0, 3.0)));
    assert!(concave.contains(&pt(1.0, 0.5)));
    assert!(!Region::Polygon(vec![[0.0, 0.0], [1.0, 1.0]]).contains(&pt(0.5, 0.5)));
}

#[test]
fn test_basis_keys() {
    let mut b = Basis::new("X_umap");
    assert_eq!(b.key(), "X_umap_2");
    assert_eq!(b.client_bins(), None);
    b.nbins = Some(100);
    assert_eq!(b.key(), "X_umap_2");
    assert_eq!(b.client_bins(), Some(100));
    b.precomputed = true;
    b.agg = Agg::Mean;
    assert_eq!(b.key(), "X_umap_2_100_mean");
    assert_eq!(b.client_bins(), None);

    let parsed: Basis = serde_json::from_value(json!({"name": "X_pca", "ndim": 3})).unwrap();
    assert_eq!(parsed.key(), "X_pca_3");
    assert_eq!(parsed.agg, Agg::Max);
}

#[test]
fn test_degenerate_regions_rejected() {
    let leaf = |region: serde_json::Value| {
        json!({"type": "basis", "basis": {"name": "umap"}, "region": region})
    };
    let ok = leaf(json!({"rect": {"min": [0.0, 0.0], "max": [1.0, 1.0]}}));
    assert!(serde_json::from_value::<Filter>(ok).is_ok());

    for bad in [
        json!({"rect": {"min": [], "max": []}}),
        json!({"rect": {"min": [0.0, 0.0], "max": [1.0]}}),
        json!({"radius": {"center": [0.0], "r": 1.0}}),
        json!({"radius": {"center": [0.0, 0.0], "r": -1.0}}),
    ] {
        assert!(serde_json::from_value::<Filter>(leaf(bad)).is_err());
    }

    // Built directly, an empty rect still matches nothing.
    let empty = Region::Rect {
        min: vec![],
        max: vec![],
    };
    assert!(empty.validate().is_err());
    assert!(!empty.contains(&pt(0.0, 0.0)));
}
