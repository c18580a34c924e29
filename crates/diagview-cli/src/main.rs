mod outline;

use diagview::session::{PaneContent, SessionConfig, Viewer, ViewerState, sanitize_svg_id};
use diagview::{DiagramMetadata, Network, ParameterPatch, TreeFilter, build_tree};
use outline::{DiagramKind, OutlineRenderer};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Network(diagview::Error),
    Session(diagview::session::Error),
    Json(serde_json::Error),
    UnknownElement(String),
    Timeout(Duration),
    RenderFailed(usize),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Network(err) => write!(f, "{err}"),
            CliError::Session(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::UnknownElement(id) => {
                write!(f, "diagram element `{id}` is not clickable")
            }
            CliError::Timeout(timeout) => {
                write!(f, "rendering did not finish within {} ms", timeout.as_millis())
            }
            CliError::RenderFailed(count) => write!(f, "{count} diagram(s) failed to render"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<diagview::Error> for CliError {
    fn from(value: diagview::Error) -> Self {
        Self::Network(value)
    }
}

impl From<diagview::session::Error> for CliError {
    fn from(value: diagview::session::Error) -> Self {
        Self::Session(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Tree,
    Params,
    Render,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<PathBuf>,
    pretty: bool,
    filter: TreeFilter,
    kind: DiagramKind,
    select: Option<String>,
    check: Vec<String>,
    uncheck: Vec<String>,
    operate: Vec<String>,
    click: Option<String>,
    patch: ParameterPatch,
    state: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    workers: Option<usize>,
    timeout: Duration,
}

#[derive(Serialize)]
struct PaneOut {
    container: String,
    pane: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    svg: Option<PathBuf>,
}

#[derive(Serialize)]
struct RenderOut<'a> {
    network: &'a str,
    kind: &'static str,
    parameters_version: u64,
    panes: Vec<PaneOut>,
}

fn usage() -> &'static str {
    "diagview-cli\n\
\n\
USAGE:\n\
  diagview-cli tree [--pretty] [--filter <text>] [--names] [--hide-substations] [--hide-voltage-levels] <case.json>\n\
  diagview-cli params [--pretty] [--depth <n>] [--names] [--set <path>=<value>]...\n\
  diagview-cli render [--kind nad|sld] [--select <id>] [--check <id>]... [--uncheck <id>]...\n\
                      [--operate <switch>]... [--click <element-id>] [--depth <n>] [--names]\n\
                      [--set <path>=<value>]... [--state <file>] [--out-dir <dir>]\n\
                      [--workers <n>] [--timeout-ms <n>] [--pretty] [<case.json>]\n\
\n\
NOTES:\n\
  - render prints a JSON summary of the displayed panes; --out-dir also writes <stem>.svg,\n\
    <stem>.metadata.json and <stem>.graph.json per pane. The stem is `selected-<id>` for the\n\
    selected pane and `<n>-<id>` for the n-th tab.\n\
  - --state restores selected/checked containers from <file> when it exists and saves them back.\n\
    The case path is taken from the state file when <case.json> is omitted.\n\
  - --click resolves an element id of the selected diagram and follows it (navigate or switch).\n\
  - --set values are parsed as JSON when possible, otherwise taken as strings.\n\
  - Set DIAGVIEW_LOG (e.g. `debug`) to log to stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        patch: ParameterPatch::empty_object(),
        timeout: Duration::from_secs(30),
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "tree" => args.command = Command::Tree,
            "params" => args.command = Command::Params,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--filter" => args.filter.text = next_value(&mut it)?,
            "--hide-substations" => args.filter.hide_substations = true,
            "--hide-voltage-levels" => args.filter.hide_voltage_levels = true,
            "--names" => {
                args.filter.show_names = true;
                args.patch.set_value("show_names", Value::Bool(true));
            }
            "--kind" => {
                args.kind = next_value(&mut it)?
                    .parse::<DiagramKind>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--select" => args.select = Some(next_value(&mut it)?),
            "--check" => args.check.push(next_value(&mut it)?),
            "--uncheck" => args.uncheck.push(next_value(&mut it)?),
            "--operate" => args.operate.push(next_value(&mut it)?),
            "--click" => args.click = Some(next_value(&mut it)?),
            "--depth" => {
                let depth = next_value(&mut it)?
                    .parse::<u32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                args.patch.set_value("depth", Value::from(depth));
            }
            "--set" => {
                let assignment = next_value(&mut it)?;
                let Some((path, value)) = assignment.split_once('=') else {
                    return Err(CliError::Usage(usage()));
                };
                if path.trim().is_empty() {
                    return Err(CliError::Usage(usage()));
                }
                args.patch.set_value(path.trim(), parse_set_value(value));
            }
            "--state" => args.state = Some(PathBuf::from(next_value(&mut it)?)),
            "--out-dir" => args.out_dir = Some(PathBuf::from(next_value(&mut it)?)),
            "--workers" => {
                let workers = next_value(&mut it)?
                    .parse::<usize>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if workers == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.workers = Some(workers);
            }
            "--timeout-ms" => {
                let ms = next_value(&mut it)?
                    .parse::<u64>()
                    .map_err(|_| CliError::Usage(usage()))?;
                args.timeout = Duration::from_millis(ms);
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(PathBuf::from(path));
            }
        }
    }

    Ok(args)
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<String, CliError> {
    it.next().cloned().ok_or(CliError::Usage(usage()))
}

fn parse_set_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("DIAGVIEW_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// File stem of the `index`-th tab. Sanitized ids may coincide, tab indices never do.
fn tab_stem(index: usize, container: &str) -> String {
    format!("{}-{}", index + 1, sanitize_svg_id(container))
}

fn write_pane(dir: &Path, stem: &str, content: &PaneContent) -> Result<Option<PathBuf>, CliError> {
    let Some(document) = content.document() else {
        return Ok(None);
    };
    std::fs::create_dir_all(dir)?;
    let svg = dir.join(format!("{stem}.svg"));
    std::fs::write(&svg, &document.svg)?;
    std::fs::write(dir.join(format!("{stem}.metadata.json")), &document.metadata)?;
    std::fs::write(dir.join(format!("{stem}.graph.json")), &document.graph)?;
    Ok(Some(svg))
}

fn pane_out(
    container: String,
    pane: &'static str,
    title: Option<String>,
    content: &PaneContent,
    svg: Option<PathBuf>,
) -> PaneOut {
    let (status, error) = match content {
        PaneContent::Empty => ("empty", None),
        PaneContent::Loading => ("loading", None),
        PaneContent::Diagram(_) => ("ready", None),
        PaneContent::Error(message) => ("failed", Some(message.clone())),
    };
    PaneOut {
        container,
        pane,
        status,
        title,
        error,
        svg,
    }
}

fn wait(viewer: &mut Viewer<OutlineRenderer>, timeout: Duration) -> Result<(), CliError> {
    viewer.poll_blocking(timeout);
    if viewer.session().is_idle() {
        Ok(())
    } else {
        Err(CliError::Timeout(timeout))
    }
}

fn require_container(viewer: &Viewer<OutlineRenderer>, id: &str) -> Result<(), CliError> {
    if viewer.network().is_some_and(|network| network.contains(id)) {
        Ok(())
    } else {
        Err(diagview::Error::UnknownContainer { id: id.to_string() }.into())
    }
}

fn run_render(args: Args) -> Result<(), CliError> {
    let mut config = SessionConfig::default();
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    let mut viewer = Viewer::new(OutlineRenderer::new(args.kind), config)?;
    if !args.patch.is_empty() {
        viewer.update_parameters(&args.patch)?;
    }

    let mut state = match args.state.as_deref() {
        Some(path) if path.exists() => ViewerState::load(path)?,
        _ => ViewerState::default(),
    };
    if let Some(input) = &args.input {
        if state.case_path.as_deref() != Some(input.as_path()) {
            // Saved ids belong to another case.
            state = ViewerState {
                case_path: Some(input.clone()),
                ..ViewerState::default()
            };
        }
    }
    if state.case_path.is_none() {
        return Err(CliError::Usage(usage()));
    }
    viewer.restore(&state)?;

    for id in &args.uncheck {
        require_container(&viewer, id)?;
        viewer.set_checked(id, false);
    }
    for id in &args.check {
        require_container(&viewer, id)?;
        viewer.set_checked(id, true);
    }
    if let Some(id) = &args.select {
        require_container(&viewer, id)?;
        viewer.select(Some(id.as_str()));
    }
    for switch in &args.operate {
        viewer.operate_switch(switch)?;
    }
    wait(&mut viewer, args.timeout)?;

    if let Some(element) = &args.click {
        let event = viewer
            .binder()
            .selected_content()
            .document()
            .map(|document| DiagramMetadata::from_json_str(&document.metadata))
            .transpose()?
            .and_then(|metadata| metadata.resolve(element))
            .ok_or_else(|| CliError::UnknownElement(element.clone()))?;
        viewer.handle_diagram_event(event)?;
        wait(&mut viewer, args.timeout)?;
    }

    let binder = viewer.binder();
    let mut panes = Vec::with_capacity(binder.tab_count() + 1);
    if let Some(selected) = binder.selected() {
        let content = binder.selected_content();
        let svg = match &args.out_dir {
            Some(dir) => write_pane(
                dir,
                &format!("selected-{}", sanitize_svg_id(selected.as_str())),
                content,
            )?,
            None => None,
        };
        panes.push(pane_out(selected.to_string(), "selected", None, content, svg));
    }
    for (index, tab) in binder.tabs().enumerate() {
        let svg = match &args.out_dir {
            Some(dir) => write_pane(dir, &tab_stem(index, tab.container.as_str()), &tab.content)?,
            None => None,
        };
        panes.push(pane_out(
            tab.container.to_string(),
            "tab",
            Some(tab.title.clone()),
            &tab.content,
            svg,
        ));
    }
    let failed = panes.iter().filter(|p| p.status == "failed").count();

    let network_id = viewer
        .network()
        .map(|network| network.id().to_string())
        .unwrap_or_default();
    write_json(
        &RenderOut {
            network: &network_id,
            kind: args.kind.as_str(),
            parameters_version: viewer.parameters().version(),
            panes,
        },
        args.pretty,
    )?;

    if let Some(path) = &args.state {
        viewer.state().save(path)?;
    }
    if failed > 0 {
        return Err(CliError::RenderFailed(failed));
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Tree => {
            let Some(input) = &args.input else {
                return Err(CliError::Usage(usage()));
            };
            let network = Network::from_path(input)?;
            write_json(&build_tree(&network, &args.filter), args.pretty)
        }
        Command::Params => {
            let parameters = diagview::RenderParameters::default().merged(&args.patch)?;
            write_json(&parameters, args.pretty)
        }
        Command::Render => run_render(args),
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
