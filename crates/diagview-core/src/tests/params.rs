use crate::params::{MAX_LENGTH, NadLayout, SldStyleProvider, StyleParameters};
use crate::*;
use serde_json::json;

#[test]
fn render_parameters_defaults_are_valid() {
    let params = RenderParameters::default();
    params.validate().unwrap();
    assert_eq!(params.depth, 1);
    assert!(params.id_displayed());
    assert_eq!(params.svg.size(), SvgSize::Natural);
}

#[test]
fn parameter_patch_sets_nested_dotted_paths() {
    let patch = ParameterPatch::empty_object()
        .with("layout.scale_factor", json!(2.5))
        .with("layout.nad_layout", json!("GEOGRAPHICAL"))
        .with("depth", json!(3));
    assert_eq!(
        patch.as_value(),
        &json!({
            "layout": { "scale_factor": 2.5, "nad_layout": "GEOGRAPHICAL" },
            "depth": 3
        })
    );

    let params = RenderParameters::default().merged(&patch).unwrap();
    assert_eq!(params.depth, 3);
    assert_eq!(params.layout.scale_factor, 2.5);
    assert_eq!(params.layout.nad_layout, NadLayout::Geographical);
    // Untouched siblings keep their values.
    assert_eq!(params.layout.cell_width, 50.0);
}

#[test]
fn parameter_patch_overwrites_non_object_intermediate_values() {
    let mut patch = ParameterPatch::from_value(json!({ "layout": 1 }));
    patch.set_value("layout.cell_width", json!(80.0));
    assert_eq!(patch.as_value(), &json!({ "layout": { "cell_width": 80.0 } }));
    assert!(!patch.is_empty());
    assert!(ParameterPatch::default().is_empty());
}

#[test]
fn merged_rejects_unknown_fields() {
    let patch = ParameterPatch::empty_object().with("layout.no_such_field", json!(true));
    let err = RenderParameters::default().merged(&patch).unwrap_err();
    assert!(matches!(err, Error::InvalidParameters { .. }));
}

#[test]
fn merged_rejects_wrong_types_and_bad_values() {
    let params = RenderParameters::default();

    let wrong_type = ParameterPatch::empty_object().with("show_names", json!("yes"));
    assert!(params.merged(&wrong_type).is_err());

    let zero_scale = ParameterPatch::empty_object().with("layout.scale_factor", json!(0.0));
    let err = params.merged(&zero_scale).unwrap_err();
    assert!(err.to_string().contains("layout.scale_factor"));

    let thresholds = ParameterPatch::empty_object()
        .with("style.animation_threshold1", json!(0.95))
        .with("style.animation_threshold2", json!(0.5));
    assert!(params.merged(&thresholds).is_err());
}

#[test]
fn id_displayed_follows_show_names() {
    let patch = ParameterPatch::empty_object().with("show_names", json!(true));
    let params = RenderParameters::default().merged(&patch).unwrap();
    assert!(!params.id_displayed());
}

#[test]
fn svg_size_requires_width_and_height_flag() {
    let mut params = RenderParameters::default();
    params.svg.size_constraint = SizeConstraint::FixedWidth;
    params.svg.fixed_size = 640.4;
    assert_eq!(params.svg.size(), SvgSize::Natural);

    params.svg.svg_width_and_height_added = true;
    assert_eq!(params.svg.size(), SvgSize::Width(640));

    params.svg.size_constraint = SizeConstraint::FixedHeight;
    assert_eq!(params.svg.size(), SvgSize::Height(640));

    params.svg.size_constraint = SizeConstraint::FixedScale;
    assert_eq!(params.svg.size(), SvgSize::Scale(0.2));
}

#[test]
fn sld_style_providers_fall_back_to_empty() {
    let style = StyleParameters {
        nominal_voltage_style: false,
        ..StyleParameters::default()
    };
    assert_eq!(style.sld_style_providers(), vec![SldStyleProvider::Empty]);

    let style = StyleParameters {
        basic_style: true,
        topological_style: true,
        ..StyleParameters::default()
    };
    assert_eq!(
        style.sld_style_providers(),
        vec![
            SldStyleProvider::Basic,
            SldStyleProvider::NominalVoltage,
            SldStyleProvider::Topological
        ]
    );
}

#[test]
fn render_parameters_deserialize_partial_documents() {
    let params: RenderParameters =
        serde_json::from_value(json!({ "svg": { "show_grid": true } })).unwrap();
    assert!(params.svg.show_grid);
    assert_eq!(params.depth, 1);
    assert_eq!(params.style.component_library, "Convergence");
}

#[test]
fn validate_rejects_non_finite_values_in_every_section() {
    let cases: [fn(&mut RenderParameters); 5] = [
        |p| p.layout.stack_height = f64::NAN,
        |p| p.layout.busbar_vertical_space = f64::INFINITY,
        |p| p.svg.feeder_infos_intra_margin = f64::NAN,
        |p| p.style.animation_threshold1 = f64::NEG_INFINITY,
        |p| p.style.animation_threshold2 = f64::NAN,
    ];
    for set in cases {
        let mut params = RenderParameters::default();
        set(&mut params);
        assert!(params.validate().is_err(), "{params:?}");
    }
}

#[test]
fn validate_bounds_lengths() {
    let defaults = RenderParameters::default();

    let huge = ParameterPatch::empty_object()
        .with("layout.diagram_padding_left_right", json!(1e18));
    let err = defaults.merged(&huge).unwrap_err();
    assert!(err.to_string().contains("layout.diagram_padding_left_right"));

    let negative = ParameterPatch::empty_object().with("layout.intern_cell_height", json!(-1.0));
    assert!(defaults.merged(&negative).is_err());

    let at_limit =
        ParameterPatch::empty_object().with("layout.stack_height", json!(MAX_LENGTH));
    assert_eq!(
        defaults.merged(&at_limit).unwrap().layout.stack_height,
        MAX_LENGTH
    );
}
