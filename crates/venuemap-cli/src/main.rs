use serde::Serialize;
use std::io::Read;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use venuemap_core::binder::AliasRole;
use venuemap_core::geom::point;
use venuemap_core::strategy::MatchSource;
use venuemap_core::{
    Availability, CatalogDocument, ClickOutcome, ClickResolver, PassSummary, PointerInput,
    ResolutionDiagnostic, ResolvedMap, ResolverConfig, Section, StyleResource, VisualState,
    sanitize_markup,
};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Engine(venuemap_core::Error),
    Json(serde_json::Error),
    UnknownElement(String),
    NoDiagram,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Engine(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::UnknownElement(id) => write!(f, "No element with id '{id}' in the diagram"),
            CliError::NoDiagram => write!(f, "No venue diagram found in input"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<venuemap_core::Error> for CliError {
    fn from(value: venuemap_core::Error) -> Self {
        match value {
            venuemap_core::Error::NoDiagramRoot => Self::NoDiagram,
            other => Self::Engine(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Sanitize,
    Resolve,
    Click,
}

#[derive(Debug, Clone, PartialEq)]
enum ClickTarget {
    At(f64, f64),
    Element(String),
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    catalog: Option<String>,
    config: Option<String>,
    selected: Option<String>,
    target: Option<ClickTarget>,
    pretty: bool,
}

fn usage() -> &'static str {
    "venuemap-cli\n\
\n\
USAGE:\n\
  venuemap-cli [sanitize] [<path>|-]\n\
  venuemap-cli resolve --catalog <json> [--config <json>] [--selected <section-id>] [--pretty] [<path>|-]\n\
  venuemap-cli click --catalog <json> (--at <x>,<y> | --element <id>) [--config <json>] [--pretty] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the diagram is read from stdin.\n\
  - The catalog file holds {\"sections\": [...], \"availability\": [...], \"ticketCounts\": {...}}.\n\
  - resolve prints every binding with its visual state as JSON.\n\
  - click replays one pointer input and prints the outcome and the diagnostics trail.\n\
  - Set VENUEMAP_LOG (e.g. VENUEMAP_LOG=debug) for pipeline logs on stderr.\n\
"
}

fn parse_point(raw: &str) -> Option<(f64, f64)> {
    let (x, y) = raw.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "sanitize" => args.command = Command::Sanitize,
            "resolve" => args.command = Command::Resolve,
            "click" => args.command = Command::Click,
            "--pretty" => args.pretty = true,
            "--catalog" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.catalog = Some(path.clone());
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--selected" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !id.trim().is_empty() {
                    args.selected = Some(id.trim().to_string());
                }
            }
            "--at" => {
                let Some(raw) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let (x, y) = parse_point(raw).ok_or(CliError::Usage(usage()))?;
                args.target = Some(ClickTarget::At(x, y));
            }
            "--element" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.target = Some(ClickTarget::Element(id.clone()));
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    match args.command {
        Command::Sanitize => {}
        Command::Resolve if args.catalog.is_none() => return Err(CliError::Usage(usage())),
        Command::Click if args.catalog.is_none() || args.target.is_none() => {
            return Err(CliError::Usage(usage()));
        }
        Command::Resolve | Command::Click => {}
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
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
    let filter = EnvFilter::try_from_env("VENUEMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(false),
        )
        .try_init();
}

fn load_catalog(path: &str) -> Result<CatalogDocument, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(CatalogDocument::from_json_str(&text)?)
}

fn load_config(path: Option<&str>) -> Result<ResolverConfig, CliError> {
    match path {
        None => Ok(ResolverConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(ResolverConfig::from_json_str(&text)?)
        }
    }
}

fn build_map(args: &Args) -> Result<ResolvedMap, CliError> {
    let raw = read_input(args.input.as_deref())?;
    let catalog_path = args.catalog.as_deref().ok_or(CliError::Usage(usage()))?;
    let catalog = load_catalog(catalog_path)?;
    let config = load_config(args.config.as_deref())?;
    tracing::info!(sections = catalog.sections.len(), "catalog loaded");
    Ok(ResolvedMap::build(
        &raw,
        &catalog.sections,
        &catalog.availability_input(),
        &config,
    )?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ElementOut<'a> {
    slot: u32,
    tag: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

impl<'a> ElementOut<'a> {
    fn new(map: &'a ResolvedMap, el: venuemap_core::ElementId) -> Self {
        let element = map.document().element(el);
        Self {
            slot: el.0,
            tag: element.tag(),
            id: element.raw_id(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BindingOut<'a> {
    element: ElementOut<'a>,
    section_id: &'a str,
    role: AliasRole,
    source: &'a MatchSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<VisualState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOut<'a> {
    view_box: Option<[f64; 4]>,
    summary: &'a PassSummary,
    bindings: Vec<BindingOut<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClickOut<'a> {
    target: Option<ElementOut<'a>>,
    outcome: &'a ClickOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<&'a Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    availability: Option<&'a Availability>,
    diagnostics: Vec<ResolutionDiagnostic>,
}

fn run_resolve(args: &Args) -> Result<(), CliError> {
    let map = build_map(args)?;
    let style = StyleResource::default();
    let states = map.visual_states(args.selected.as_deref());

    let bindings = map
        .table()
        .bindings()
        .iter()
        .map(|b| {
            let state = states
                .iter()
                .find(|(el, _)| *el == b.element)
                .map(|(_, s)| *s);
            BindingOut {
                element: ElementOut::new(&map, b.element),
                section_id: map.index().record(b.record).section.id.as_str(),
                role: b.role,
                source: &b.source,
                state,
                class: state.map(|s| style.class_for(s)),
            }
        })
        .collect();

    let out = ResolveOut {
        view_box: map
            .document()
            .view_box()
            .map(|r| [r.origin.x, r.origin.y, r.size.width, r.size.height]),
        summary: map.summary(),
        bindings,
    };
    write_json(&out, args.pretty)
}

fn run_click(args: &Args) -> Result<(), CliError> {
    let map = build_map(args)?;
    let input = match &args.target {
        Some(ClickTarget::At(x, y)) => PointerInput::at_point(1, map.document(), point(*x, *y)),
        Some(ClickTarget::Element(id)) => {
            let el = map
                .document()
                .find_by_id(id)
                .ok_or_else(|| CliError::UnknownElement(id.clone()))?;
            PointerInput::on_element(1, el)
        }
        None => return Err(CliError::Usage(usage())),
    };

    let mut diagnostics = Vec::new();
    let outcome = ClickResolver::new().dispatch(&map, &input, &mut |d| diagnostics.push(d));
    let record = match &outcome {
        ClickOutcome::Resolved { record, .. } => Some(map.index().record(*record)),
        _ => None,
    };

    let out = ClickOut {
        target: input.target.map(|t| ElementOut::new(&map, t)),
        outcome: &outcome,
        section: record.map(|r| &r.section),
        availability: record.and_then(|r| r.availability.as_ref()),
        diagnostics,
    };
    write_json(&out, args.pretty)
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Sanitize => {
            let raw = read_input(args.input.as_deref())?;
            let sanitized = sanitize_markup(&raw);
            if sanitized.is_empty() {
                return Err(CliError::NoDiagram);
            }
            println!("{sanitized}");
            Ok(())
        }
        Command::Resolve => run_resolve(&args),
        Command::Click => run_click(&args),
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
        Err(CliError::NoDiagram) => {
            eprintln!("{}", CliError::NoDiagram);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
