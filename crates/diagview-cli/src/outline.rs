//! Schematic built-in renderer.
//!
//! Network-area diagrams place the voltage levels in view on a grid and join them with straight
//! branch lines. Single-line diagrams draw one busbar per voltage level with its switches below and
//! its feeders above. Output is deterministic for a given request.

use diagview::session::{
    DiagramDocument, DiagramRenderer, RenderError, RenderRequest, sanitize_svg_id,
};
use diagview::{
    ContainerId, ContainerKind, DiagramMetadata, MetadataNode, MetadataNodeKind, Network,
    RenderParameters, SvgSize,
};
use diagview::params::SubstationLayout;
use serde_json::{Value, json};
use std::fmt::Write as _;

const NODE_RADIUS: f64 = 20.0;
const SWITCH_SIZE: f64 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum DiagramKind {
    #[default]
    Nad,
    Sld,
}

impl DiagramKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Nad => "nad",
            Self::Sld => "sld",
        }
    }
}

impl std::str::FromStr for DiagramKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nad" => Ok(Self::Nad),
            "sld" => Ok(Self::Sld),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OutlineRenderer {
    kind: DiagramKind,
}

impl OutlineRenderer {
    pub(crate) fn new(kind: DiagramKind) -> Self {
        Self { kind }
    }
}

impl DiagramRenderer for OutlineRenderer {
    fn render(&self, request: &RenderRequest) -> Result<DiagramDocument, RenderError> {
        let mut canvas = Canvas::new(request);
        match self.kind {
            DiagramKind::Nad => draw_nad(&mut canvas, request),
            DiagramKind::Sld => {
                if request.scope.kind == ContainerKind::Network {
                    return Err(RenderError::Unsupported {
                        kind: ContainerKind::Network,
                    });
                }
                draw_sld(&mut canvas, request);
            }
        }
        canvas.finish(self.kind, request)
    }
}

struct Canvas<'a> {
    params: &'a RenderParameters,
    network: &'a Network,
    prefix: String,
    body: String,
    width: f64,
    height: f64,
    nodes: Vec<MetadataNode>,
    graph_nodes: Vec<Value>,
    graph_edges: Vec<Value>,
}

impl<'a> Canvas<'a> {
    fn new(request: &'a RenderRequest) -> Self {
        Self {
            params: &request.parameters,
            network: &request.network,
            prefix: sanitize_svg_id(request.container.as_str()),
            body: String::new(),
            width: 0.0,
            height: 0.0,
            nodes: Vec::new(),
            graph_nodes: Vec::new(),
            graph_edges: Vec::new(),
        }
    }

    fn scale(&self) -> f64 {
        self.params.layout.scale_factor
    }

    fn element_id(&self, id: &str) -> String {
        format!("{}-{}", self.prefix, sanitize_svg_id(id))
    }

    fn label(&self, id: &ContainerId) -> String {
        let Some(container) = self.network.container(id.as_str()) else {
            return id.to_string();
        };
        if self.params.id_displayed() {
            id.to_string()
        } else {
            container.name_or_id().to_string()
        }
    }

    fn grow(&mut self, x: f64, y: f64) {
        self.width = self.width.max(x);
        self.height = self.height.max(y);
    }

    fn text(&mut self, x: f64, y: f64, class: &str, text: &str) {
        let _ = write!(
            &mut self.body,
            r#"<text class="{class}" x="{}" y="{}">{}</text>"#,
            fmt(x),
            fmt(y),
            escape_xml(text)
        );
    }

    fn finish(
        self,
        kind: DiagramKind,
        request: &RenderRequest,
    ) -> Result<DiagramDocument, RenderError> {
        let layout = &self.params.layout;
        let width = self.width + layout.diagram_padding_left_right;
        let height = self.height + layout.diagram_padding_top_bottom;

        let mut svg = String::new();
        let _ = write!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" class="diagview-{}" viewBox="0 0 {} {}""#,
            self.prefix,
            kind.as_str(),
            fmt(width),
            fmt(height)
        );
        match self.params.svg.size() {
            SvgSize::Natural => {}
            SvgSize::Width(w) => {
                let h = f64::from(w) * height / width.max(1.0);
                let _ = write!(&mut svg, r#" width="{w}" height="{}""#, fmt(h));
            }
            SvgSize::Height(h) => {
                let w = f64::from(h) * width / height.max(1.0);
                let _ = write!(&mut svg, r#" width="{}" height="{h}""#, fmt(w));
            }
            SvgSize::Scale(s) => {
                let _ = write!(
                    &mut svg,
                    r#" width="{}" height="{}""#,
                    fmt(width * s),
                    fmt(height * s)
                );
            }
        }
        svg.push('>');
        if self.params.svg.show_grid {
            draw_grid(&mut svg, width, height, layout.cell_width * self.scale());
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");

        let metadata = DiagramMetadata { nodes: self.nodes }
            .to_json_string()
            .map_err(RenderError::failed)?;
        let graph = json!({
            "kind": kind.as_str(),
            "container": request.container,
            "nodes": self.graph_nodes,
            "edges": self.graph_edges,
        });
        Ok(DiagramDocument {
            svg,
            metadata,
            graph: graph.to_string(),
        })
    }
}

fn draw_nad(canvas: &mut Canvas<'_>, request: &RenderRequest) {
    let in_view = request.voltage_levels_in_view();
    let params = canvas.params;
    let layout = &params.layout;
    let scale = canvas.scale();
    let spacing = layout.cell_width * 3.0 * scale;
    let (pad_x, pad_y) = (
        layout.diagram_padding_left_right + NODE_RADIUS,
        layout.diagram_padding_top_bottom + NODE_RADIUS,
    );
    let columns = (in_view.len() as f64).sqrt().ceil().max(1.0) as usize;

    let mut positions: Vec<(ContainerId, f64, f64)> = Vec::with_capacity(in_view.len());
    for (i, vl) in in_view.iter().enumerate() {
        let x = pad_x + (i % columns) as f64 * spacing;
        let y = pad_y + (i / columns) as f64 * spacing;
        positions.push((vl.clone(), x, y));
    }
    let position = |id: &ContainerId| {
        positions
            .iter()
            .find(|(vl, _, _)| vl == id)
            .map(|(_, x, y)| (*x, *y))
    };

    for branch in request.network.branches() {
        let (Some((x1, y1)), Some((x2, y2))) = (
            position(&branch.voltage_level1),
            position(&branch.voltage_level2),
        ) else {
            continue;
        };
        let element = canvas.element_id(&branch.id);
        let _ = write!(
            &mut canvas.body,
            r#"<line id="{element}" class="branch" x1="{}" y1="{}" x2="{}" y2="{}"/>"#,
            fmt(x1),
            fmt(y1),
            fmt(x2),
            fmt(y2)
        );
        if canvas.params.svg.edge_name_displayed {
            let name = branch.name.as_deref().unwrap_or(&branch.id).to_string();
            canvas.text((x1 + x2) / 2.0, (y1 + y2) / 2.0, "branch-label", &name);
        }
        canvas.nodes.push(MetadataNode {
            id: element,
            kind: MetadataNodeKind::Feeder,
            equipment_id: Some(branch.id.clone()),
            next_voltage_level_id: None,
        });
        canvas.graph_edges.push(json!({
            "id": branch.id,
            "from": branch.voltage_level1,
            "to": branch.voltage_level2,
        }));
    }

    for (vl, x, y) in &positions {
        let element = canvas.element_id(vl.as_str());
        let _ = write!(
            &mut canvas.body,
            r#"<circle id="{element}" class="voltage-level" cx="{}" cy="{}" r="{}"/>"#,
            fmt(*x),
            fmt(*y),
            fmt(NODE_RADIUS * scale)
        );
        let label = canvas.label(vl);
        canvas.text(x + NODE_RADIUS * scale + 4.0, *y, "label", &label);
        if canvas.params.svg.voltage_level_details {
            if let Some(nominal_v) = canvas.network.nominal_v(vl.as_str()) {
                let details = format!("{nominal_v} kV");
                canvas.text(x + NODE_RADIUS * scale + 4.0, y + 14.0, "details", &details);
            }
        }
        canvas.grow(x + spacing / 2.0, y + NODE_RADIUS * scale);

        let navigable = vl != &request.container;
        canvas.nodes.push(MetadataNode {
            id: element,
            kind: MetadataNodeKind::VoltageLevel,
            equipment_id: Some(vl.to_string()),
            next_voltage_level_id: navigable.then(|| vl.to_string()),
        });
        canvas.graph_nodes.push(json!({
            "id": vl,
            "label": label,
            "x": round2(*x),
            "y": round2(*y),
        }));
    }
}

fn draw_sld(canvas: &mut Canvas<'_>, request: &RenderRequest) {
    let params = canvas.params;
    let layout = &params.layout;
    let scale = canvas.scale();
    let cell = layout.cell_width * scale;
    let stack = layout.busbar_vertical_space.max(SWITCH_SIZE) * scale;
    let feeder_height = layout.intern_cell_height * scale;
    let vertical = params.style.substation_layout == SubstationLayout::Vertical;

    let mut origin_x = layout.diagram_padding_left_right + layout.voltage_padding_left_right;
    let mut origin_y = layout.diagram_padding_top_bottom + layout.voltage_padding_top_bottom;

    for vl in &request.scope.voltage_levels {
        let switches: Vec<(String, bool)> = canvas
            .network
            .switches_of(vl.as_str())
            .map(|sw| (sw.id.clone(), sw.open))
            .collect();
        let feeders: Vec<(String, ContainerId)> = canvas
            .network
            .branches()
            .iter()
            .filter_map(|b| {
                if &b.voltage_level1 == vl {
                    Some((b.id.clone(), b.voltage_level2.clone()))
                } else if &b.voltage_level2 == vl {
                    Some((b.id.clone(), b.voltage_level1.clone()))
                } else {
                    None
                }
            })
            .collect();

        let slots = switches.len().max(feeders.len()).max(1);
        let busbar_len = slots as f64 * cell;
        let bus_y = origin_y + feeder_height + 16.0;

        let label = canvas.label(vl);
        canvas.text(origin_x, origin_y + 12.0, "label", &label);

        let bus_id = canvas.element_id(&format!("{vl}-bus"));
        let _ = write!(
            &mut canvas.body,
            r#"<line id="{bus_id}" class="busbar" x1="{}" y1="{}" x2="{}" y2="{}"/>"#,
            fmt(origin_x),
            fmt(bus_y),
            fmt(origin_x + busbar_len),
            fmt(bus_y)
        );
        canvas.nodes.push(MetadataNode {
            id: bus_id,
            kind: MetadataNodeKind::Bus,
            equipment_id: Some(vl.to_string()),
            next_voltage_level_id: None,
        });
        canvas.graph_nodes.push(json!({ "id": vl, "label": label }));

        for (i, (branch, other)) in feeders.iter().enumerate() {
            let x = origin_x + (i as f64 + 0.5) * cell;
            let element = canvas.element_id(&format!("{vl}-{branch}"));
            let _ = write!(
                &mut canvas.body,
                r#"<line id="{element}" class="feeder" x1="{}" y1="{}" x2="{}" y2="{}"/>"#,
                fmt(x),
                fmt(bus_y),
                fmt(x),
                fmt(bus_y - feeder_height)
            );
            let other_label = canvas.label(other);
            canvas.text(x + 2.0, bus_y - feeder_height - 2.0, "feeder-label", &other_label);
            canvas.nodes.push(MetadataNode {
                id: element,
                kind: MetadataNodeKind::Feeder,
                equipment_id: Some(branch.clone()),
                next_voltage_level_id: Some(other.to_string()),
            });
            canvas.graph_edges.push(json!({ "id": branch, "from": vl, "to": other }));
        }

        for (i, (switch, open)) in switches.iter().enumerate() {
            let x = origin_x + (i as f64 + 0.5) * cell - SWITCH_SIZE / 2.0;
            let y = bus_y + stack;
            let element = canvas.element_id(switch);
            let state = if *open { "open" } else { "closed" };
            let _ = write!(
                &mut canvas.body,
                r#"<rect id="{element}" class="switch {state}" x="{}" y="{}" width="{}" height="{}"/>"#,
                fmt(x),
                fmt(y),
                fmt(SWITCH_SIZE),
                fmt(SWITCH_SIZE)
            );
            if canvas.params.svg.display_equipment_nodes_label {
                canvas.text(x, y + SWITCH_SIZE + 12.0, "switch-label", switch);
            }
            canvas.nodes.push(MetadataNode {
                id: element,
                kind: MetadataNodeKind::Switch,
                equipment_id: Some(switch.clone()),
                next_voltage_level_id: None,
            });
        }

        let block_width = busbar_len + layout.voltage_padding_left_right;
        let block_height = bus_y + stack + SWITCH_SIZE + 16.0 - origin_y;
        canvas.grow(origin_x + block_width, origin_y + block_height);
        if vertical {
            origin_y += block_height + layout.voltage_padding_top_bottom;
        } else {
            origin_x += block_width + layout.voltage_padding_left_right;
        }
    }
}

/// Grid lines drawn per axis, at most.
const MAX_GRID_LINES: usize = 512;

fn grid_lines(extent: f64, step: f64) -> usize {
    if !(extent.is_finite() && step.is_finite() && step > 0.0 && extent >= 0.0) {
        return 0;
    }
    ((extent / step).floor() as usize).min(MAX_GRID_LINES) + 1
}

fn draw_grid(out: &mut String, width: f64, height: f64, step: f64) {
    let columns = grid_lines(width, step);
    let rows = grid_lines(height, step);
    if columns == 0 || rows == 0 {
        return;
    }
    out.push_str(r#"<g class="grid">"#);
    for i in 0..columns {
        let x = fmt(i as f64 * step);
        let _ = write!(
            out,
            r#"<line x1="{x}" y1="0" x2="{x}" y2="{}"/>"#,
            fmt(height)
        );
    }
    for i in 0..rows {
        let y = fmt(i as f64 * step);
        let _ = write!(
            out,
            r#"<line x1="0" y1="{y}" x2="{}" y2="{y}"/>"#,
            fmt(width)
        );
    }
    out.push_str("</g>");
}

fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 { 0.0 } else { r }
}

fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    format!("{}", round2(v))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagview::session::RenderScope;
    use diagview::{ContainerId, ParameterPatch};
    use std::sync::Arc;

    fn network() -> Arc<Network> {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/networks/sample.json");
        Arc::new(Network::from_path(path).unwrap())
    }

    fn request(container: &str, depth: u32, patch: ParameterPatch) -> RenderRequest {
        let network = network();
        let parameters = RenderParameters::default().merged(&patch).unwrap();
        let node = network.container(container).unwrap();
        let scope = RenderScope::for_container(&network, node, depth);
        RenderRequest {
            network: Arc::clone(&network),
            container: ContainerId::from(container),
            scope,
            parameters: Arc::new(parameters),
        }
    }

    #[test]
    fn nad_contains_every_voltage_level_in_view() {
        let doc = OutlineRenderer::new(DiagramKind::Nad)
            .render(&request("VL1", 1, ParameterPatch::default()))
            .unwrap();
        let svg = roxmltree::Document::parse(&doc.svg).unwrap();
        let circles: Vec<&str> = svg
            .descendants()
            .filter(|n| n.has_tag_name("circle"))
            .filter_map(|n| n.attribute("id"))
            .collect();
        assert_eq!(circles, vec!["VL1-VL1", "VL1-VL3", "VL1-VL2"]);

        let metadata = DiagramMetadata::from_json_str(&doc.metadata).unwrap();
        assert_eq!(
            metadata.resolve("VL1-VL3"),
            Some(diagview::DiagramEvent::ContainerClicked {
                container: ContainerId::from("VL3")
            })
        );
        assert_eq!(metadata.resolve("VL1-VL1"), None);
    }

    #[test]
    fn sld_switches_resolve_to_switch_clicks() {
        let doc = OutlineRenderer::new(DiagramKind::Sld)
            .render(&request("S1", 1, ParameterPatch::default()))
            .unwrap();
        roxmltree::Document::parse(&doc.svg).unwrap();
        assert!(doc.svg.contains(r#"class="switch open""#));

        let metadata = DiagramMetadata::from_json_str(&doc.metadata).unwrap();
        assert_eq!(
            metadata.resolve("S1-BK1"),
            Some(diagview::DiagramEvent::SwitchClicked {
                switch: "BK1".to_string()
            })
        );
    }

    #[test]
    fn sld_of_whole_network_is_unsupported() {
        let err = OutlineRenderer::new(DiagramKind::Sld)
            .render(&request("grid", 0, ParameterPatch::default()))
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::Unsupported {
                kind: ContainerKind::Network
            }
        );
    }

    #[test]
    fn fixed_width_sets_svg_size() {
        let patch = ParameterPatch::default()
            .with("svg.svg_width_and_height_added", json!(true))
            .with("svg.size_constraint", json!("FIXED_WIDTH"))
            .with("svg.fixed_size", json!(300));
        let doc = OutlineRenderer::new(DiagramKind::Nad)
            .render(&request("VL4", 0, patch))
            .unwrap();
        let svg = roxmltree::Document::parse(&doc.svg).unwrap();
        assert_eq!(svg.root_element().attribute("width"), Some("300"));
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(escape_xml("A&B <x>"), "A&amp;B &lt;x&gt;");
        assert_eq!(fmt(2.0), "2");
        assert_eq!(fmt(-0.001), "0");
        assert_eq!(fmt(1.256), "1.26");
    }

    #[test]
    fn grid_line_count_is_capped() {
        let mut parameters = RenderParameters::default();
        parameters.svg.show_grid = true;
        parameters.layout.diagram_padding_left_right = 1e18;
        let request = RenderRequest {
            parameters: Arc::new(parameters),
            ..request("VL4", 0, ParameterPatch::default())
        };
        let doc = OutlineRenderer::new(DiagramKind::Nad)
            .render(&request)
            .unwrap();
        let svg = roxmltree::Document::parse(&doc.svg).unwrap();
        let grid = svg
            .descendants()
            .find(|n| n.attribute("class") == Some("grid"))
            .unwrap();
        let lines = grid.children().filter(|n| n.has_tag_name("line")).count();
        assert!(lines <= 2 * (MAX_GRID_LINES + 1), "{lines} grid lines");

        assert_eq!(grid_lines(100.0, 50.0), 3);
        assert_eq!(grid_lines(100.0, 0.0), 0);
        assert_eq!(grid_lines(f64::INFINITY, 50.0), 0);
    }
}
