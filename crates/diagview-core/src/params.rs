//! Rendering parameters.
//!
//! [`RenderParameters`] is an immutable value: changes are expressed as a [`ParameterPatch`]
//! (a partial JSON object) merged onto the serialized current value, producing a new value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderParameters {
    /// Number of branch hops of neighbouring voltage levels included in partial diagrams.
    pub depth: u32,
    /// Label containers by name instead of by id.
    pub show_names: bool,
    pub layout: LayoutParameters,
    pub svg: SvgParameters,
    pub style: StyleParameters,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            depth: 1,
            show_names: false,
            layout: LayoutParameters::default(),
            svg: SvgParameters::default(),
            style: StyleParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusbarAlignment {
    First,
    Last,
    Middle,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NadLayout {
    #[default]
    Basic,
    Geographical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutParameters {
    pub diagram_padding_top_bottom: f64,
    pub diagram_padding_left_right: f64,
    pub voltage_padding_top_bottom: f64,
    pub voltage_padding_left_right: f64,
    pub busbar_vertical_space: f64,
    pub busbar_horizontal_space: f64,
    pub cell_width: f64,
    pub extern_cell_height: f64,
    pub intern_cell_height: f64,
    pub stack_height: f64,
    pub scale_factor: f64,
    pub disconnectors_on_bus: bool,
    pub adapt_cell_height_to_content: bool,
    pub min_space_between_components: f64,
    pub minimum_extern_cell_height: f64,
    pub busbar_alignment: BusbarAlignment,
    pub space_for_feeder_infos: f64,
    pub nad_layout: NadLayout,
    pub spring_repulsion_factor: f64,
    pub text_nodes_included: bool,
    pub max_steps: u32,
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            diagram_padding_top_bottom: 20.0,
            diagram_padding_left_right: 20.0,
            voltage_padding_top_bottom: 20.0,
            voltage_padding_left_right: 20.0,
            busbar_vertical_space: 25.0,
            busbar_horizontal_space: 25.0,
            cell_width: 50.0,
            extern_cell_height: 250.0,
            intern_cell_height: 40.0,
            stack_height: 30.0,
            scale_factor: 1.0,
            disconnectors_on_bus: false,
            adapt_cell_height_to_content: true,
            min_space_between_components: 15.0,
            minimum_extern_cell_height: 80.0,
            busbar_alignment: BusbarAlignment::None,
            space_for_feeder_infos: 50.0,
            nad_layout: NadLayout::Basic,
            spring_repulsion_factor: 0.0,
            text_nodes_included: false,
            max_steps: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeConstraint {
    #[default]
    None,
    FixedWidth,
    FixedHeight,
    FixedScale,
}

/// Size requested from the renderer once `svg_width_and_height_added` is taken into account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SvgSize {
    Natural,
    Width(u32),
    Height(u32),
    Scale(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgParameters {
    pub edge_info_along_edge: bool,
    pub edge_name_displayed: bool,
    pub insert_name_desc: bool,
    pub substation_description_displayed: bool,
    pub bus_legend: bool,
    pub voltage_level_details: bool,
    pub show_grid: bool,
    pub show_internal_nodes: bool,
    pub draw_straight_wires: bool,
    pub avoid_svg_components_duplication: bool,
    pub center_label: bool,
    pub label_diagonal: bool,
    pub angle_label: f64,
    pub display_equipment_nodes_label: bool,
    pub display_connectivity_nodes_id: bool,
    pub feeder_info_symmetry: bool,
    pub feeder_infos_outer_margin: f64,
    pub feeder_infos_intra_margin: f64,
    pub svg_width_and_height_added: bool,
    pub size_constraint: SizeConstraint,
    pub fixed_size: f64,
    pub fixed_scale: f64,
}

impl Default for SvgParameters {
    fn default() -> Self {
        Self {
            edge_info_along_edge: true,
            edge_name_displayed: false,
            insert_name_desc: false,
            substation_description_displayed: false,
            bus_legend: true,
            voltage_level_details: false,
            show_grid: false,
            show_internal_nodes: false,
            draw_straight_wires: false,
            avoid_svg_components_duplication: false,
            center_label: false,
            label_diagonal: false,
            angle_label: -60.0,
            display_equipment_nodes_label: false,
            display_connectivity_nodes_id: false,
            feeder_info_symmetry: false,
            feeder_infos_outer_margin: 20.0,
            feeder_infos_intra_margin: 10.0,
            svg_width_and_height_added: false,
            size_constraint: SizeConstraint::None,
            fixed_size: 800.0,
            fixed_scale: 0.2,
        }
    }
}

impl SvgParameters {
    pub fn size(&self) -> SvgSize {
        if !self.svg_width_and_height_added {
            return SvgSize::Natural;
        }
        match self.size_constraint {
            SizeConstraint::None => SvgSize::Natural,
            SizeConstraint::FixedWidth => SvgSize::Width(self.fixed_size.round() as u32),
            SizeConstraint::FixedHeight => SvgSize::Height(self.fixed_size.round() as u32),
            SizeConstraint::FixedScale => SvgSize::Scale(self.fixed_scale),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelProvider {
    #[default]
    Default,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NadStyleProvider {
    Topological,
    #[default]
    NominalVoltage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SldStyleProvider {
    Basic,
    NominalVoltage,
    AnimatedFeederInfo,
    HighlightLineState,
    Topological,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstationLayout {
    #[default]
    Horizontal,
    Vertical,
    Cgmes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoltageLevelLayout {
    #[default]
    Smart,
    PositionWithExtensions,
    PositionByClustering,
    Cgmes,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleParameters {
    pub label_provider: LabelProvider,
    pub nad_style_provider: NadStyleProvider,
    pub basic_style: bool,
    pub nominal_voltage_style: bool,
    pub animated_style: bool,
    pub animation_threshold1: f64,
    pub animation_threshold2: f64,
    pub highlight_style: bool,
    pub topological_style: bool,
    pub component_library: String,
    pub substation_layout: SubstationLayout,
    pub voltage_level_layout: VoltageLevelLayout,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            label_provider: LabelProvider::Default,
            nad_style_provider: NadStyleProvider::NominalVoltage,
            basic_style: false,
            nominal_voltage_style: true,
            animated_style: false,
            animation_threshold1: 0.7,
            animation_threshold2: 0.9,
            highlight_style: false,
            topological_style: false,
            component_library: "Convergence".to_string(),
            substation_layout: SubstationLayout::Horizontal,
            voltage_level_layout: VoltageLevelLayout::Smart,
        }
    }
}

impl StyleParameters {
    /// Single-line style providers to stack, in application order. Never empty.
    pub fn sld_style_providers(&self) -> Vec<SldStyleProvider> {
        let mut out = Vec::new();
        if self.basic_style {
            out.push(SldStyleProvider::Basic);
        }
        if self.nominal_voltage_style {
            out.push(SldStyleProvider::NominalVoltage);
        }
        if self.animated_style {
            out.push(SldStyleProvider::AnimatedFeederInfo);
        }
        if self.highlight_style {
            out.push(SldStyleProvider::HighlightLineState);
        }
        if self.topological_style {
            out.push(SldStyleProvider::Topological);
        }
        if out.is_empty() {
            out.push(SldStyleProvider::Empty);
        }
        out
    }
}

impl RenderParameters {
    /// Ids are displayed whenever names are not.
    pub fn id_displayed(&self) -> bool {
        !self.show_names
    }

    /// Rejects any non-finite number. Lengths must also lie within `0..=MAX_LENGTH`.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        let svg = &self.svg;
        let style = &self.style;

        let positive = [
            ("layout.scale_factor", layout.scale_factor, MAX_SCALE),
            ("layout.cell_width", layout.cell_width, MAX_LENGTH),
            ("svg.fixed_size", svg.fixed_size, MAX_LENGTH),
            ("svg.fixed_scale", svg.fixed_scale, MAX_SCALE),
        ];
        for (path, value, max) in positive {
            if !(value.is_finite() && value > 0.0 && value <= max) {
                return Err(invalid(format!(
                    "{path} must be a positive number no greater than {max}, got {value}"
                )));
            }
        }

        let lengths = [
            ("layout.diagram_padding_top_bottom", layout.diagram_padding_top_bottom),
            ("layout.diagram_padding_left_right", layout.diagram_padding_left_right),
            ("layout.voltage_padding_top_bottom", layout.voltage_padding_top_bottom),
            ("layout.voltage_padding_left_right", layout.voltage_padding_left_right),
            ("layout.busbar_vertical_space", layout.busbar_vertical_space),
            ("layout.busbar_horizontal_space", layout.busbar_horizontal_space),
            ("layout.extern_cell_height", layout.extern_cell_height),
            ("layout.intern_cell_height", layout.intern_cell_height),
            ("layout.stack_height", layout.stack_height),
            ("layout.min_space_between_components", layout.min_space_between_components),
            ("layout.minimum_extern_cell_height", layout.minimum_extern_cell_height),
            ("layout.space_for_feeder_infos", layout.space_for_feeder_infos),
            ("svg.feeder_infos_outer_margin", svg.feeder_infos_outer_margin),
            ("svg.feeder_infos_intra_margin", svg.feeder_infos_intra_margin),
        ];
        for (path, value) in lengths {
            if !(value.is_finite() && (0.0..=MAX_LENGTH).contains(&value)) {
                return Err(invalid(format!(
                    "{path} must be between 0 and {MAX_LENGTH}, got {value}"
                )));
            }
        }

        let finite = [
            ("layout.spring_repulsion_factor", layout.spring_repulsion_factor),
            ("svg.angle_label", svg.angle_label),
            ("style.animation_threshold1", style.animation_threshold1),
            ("style.animation_threshold2", style.animation_threshold2),
        ];
        for (path, value) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{path} must be finite, got {value}")));
            }
        }

        if style.animation_threshold1 > style.animation_threshold2 {
            return Err(invalid(format!(
                "style.animation_threshold1 ({}) exceeds style.animation_threshold2 ({})",
                style.animation_threshold1, style.animation_threshold2
            )));
        }
        Ok(())
    }

    /// Returns a new value with `patch` deep-merged onto `self`.
    pub fn merged(&self, patch: &ParameterPatch) -> Result<Self> {
        let mut value =
            serde_json::to_value(self).map_err(|err| invalid(err.to_string()))?;
        deep_merge_value(&mut value, patch.as_value());
        let next: Self = serde_json::from_value(value).map_err(|err| invalid(err.to_string()))?;
        next.validate()?;
        Ok(next)
    }
}

/// Upper bound for paddings, spacings and other lengths, in diagram units.
pub const MAX_LENGTH: f64 = 1.0e6;
/// Upper bound for scale factors.
pub const MAX_SCALE: f64 = 1.0e3;

fn invalid(message: String) -> Error {
    Error::InvalidParameters { message }
}

/// Partial update of [`RenderParameters`], expressed as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPatch(Value);

impl Default for ParameterPatch {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl ParameterPatch {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_some_and(Map::is_empty)
    }

    /// Sets `value` at a dotted path such as `layout.scale_factor`, mirroring the nesting of
    /// [`RenderParameters`] (`layout`, `svg`, `style` sections). Intermediate non-object values
    /// are replaced by objects, so the patch always deserializes section by section.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        let segments: Vec<&str> = dotted_path.split('.').collect();
        insert_at(&mut self.0, &segments, value);
    }

    pub fn with(mut self, dotted_path: &str, value: Value) -> Self {
        self.set_value(dotted_path, value);
        self
    }
}

fn insert_at(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    let Value::Object(section) = slot else {
        return;
    };
    let child = section.entry(*head).or_insert(Value::Null);
    insert_at(child, rest, value);
}

/// Merges a patch onto serialized parameters: objects merge key by key, any other patch value
/// replaces the parameter outright.
fn deep_merge_value(base: &mut Value, patch: &Value) {
    if let (Value::Object(fields), Value::Object(updates)) = (&mut *base, patch) {
        for (key, update) in updates {
            if let Some(field) = fields.get_mut(key) {
                deep_merge_value(field, update);
            } else {
                fields.insert(key.clone(), update.clone());
            }
        }
        return;
    }
    *base = patch.clone();
}
