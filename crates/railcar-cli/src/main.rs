use futures::executor::block_on;
use railcar::render::{HeadlessError, LayoutOptions, SvgRenderOptions};
use railcar::{Engine, ParseOptions};
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Railcar(railcar::Error),
    Render(HeadlessError),
    Json(serde_json::Error),
    NoGrammar,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Railcar(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NoGrammar => write!(f, "No grammar rules found in input"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<railcar::Error> for CliError {
    fn from(value: railcar::Error) -> Self {
        Self::Railcar(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    Parse,
    Layout,
    #[default]
    Render,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    output: Option<String>,
    config: Option<String>,
    diagram_id: Option<String>,
    pretty: bool,
    lenient: bool,
    rail_labels: bool,
}

const USAGE: &str = "Usage: railcar [COMMAND] [OPTIONS] [INPUT]

Commands:
  parse    print the parsed grammar model as JSON
  layout   print the computed grid layout as JSON
  render   write the diagram as SVG (default)

Options:
  -o, --output FILE   write to FILE instead of stdout
      --config FILE   JSON config overrides (scale, fonts, ...)
      --id ID         id attribute for the root <svg> element (render only)
      --pretty        pretty-print JSON output (parse/layout only)
      --lenient       draw unparsable rules as error placeholders
      --rail-labels   include diagnostic data-rail attributes (render only)
  -h, --help          print this help

INPUT is a grammar file, or `-`/omitted for stdin.";

fn parse_args() -> Result<Args, CliError> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from(argv: impl IntoIterator<Item = String>) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut positional: Vec<String> = Vec::new();
    let mut it = argv.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(CliError::Usage(USAGE)),
            "-o" | "--output" => {
                args.output = Some(it.next().ok_or(CliError::Usage("--output needs a value"))?);
            }
            "--config" => {
                args.config = Some(it.next().ok_or(CliError::Usage("--config needs a value"))?);
            }
            "--id" => {
                args.diagram_id = Some(it.next().ok_or(CliError::Usage("--id needs a value"))?);
            }
            "--pretty" => args.pretty = true,
            "--lenient" => args.lenient = true,
            "--rail-labels" => args.rail_labels = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage("unknown option (see --help)"));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    match positional.next() {
        Some(cmd) => match cmd.as_str() {
            "parse" => args.command = Command::Parse,
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            _ => {
                // not a command: treat it as the input path
                args.input = Some(cmd);
            }
        },
        None => {}
    }
    if args.input.is_none() {
        args.input = positional.next();
    }
    if positional.next().is_some() {
        return Err(CliError::Usage("too many arguments (see --help)"));
    }

    // each option belongs to one output mode; reject mismatches loudly
    match args.command {
        Command::Render => {
            if args.pretty {
                return Err(CliError::Usage(
                    "--pretty only applies to `parse` and `layout` JSON output",
                ));
            }
        }
        Command::Parse | Command::Layout => {
            if args.diagram_id.is_some() || args.rail_labels {
                return Err(CliError::Usage(
                    "--id and --rail-labels only apply to `render`",
                ));
            }
        }
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_output(output: Option<&str>, contents: &str) -> Result<(), CliError> {
    match output {
        Some(path) => std::fs::write(path, contents)?,
        None => print!("{contents}"),
    }
    Ok(())
}

fn build_engine(args: &Args) -> Result<Engine, CliError> {
    let mut engine = Engine::new();
    if let Some(path) = &args.config {
        let raw = std::fs::read_to_string(path)?;
        let overrides: serde_json::Value = serde_json::from_str(&raw)?;
        engine = engine.with_site_config(&overrides)?;
    }
    Ok(engine)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let mut out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    out.push('\n');
    Ok(out)
}

fn run() -> Result<(), CliError> {
    let args = parse_args()?;
    let engine = build_engine(&args)?;
    let parse_options = if args.lenient {
        ParseOptions::lenient()
    } else {
        ParseOptions::strict()
    };

    let text = read_input(args.input.as_deref())?;
    let parsed = block_on(engine.parse_grammar(&text, parse_options))?.ok_or(CliError::NoGrammar)?;
    for issue in &parsed.issues {
        match &issue.rule {
            Some(rule) => eprintln!(
                "warning: rule `{rule}` failed to parse (line {}): {}",
                issue.line, issue.message
            ),
            None => eprintln!("warning: line {}: {}", issue.line, issue.message),
        }
    }

    match args.command {
        Command::Parse => {
            let out = to_json(&parsed.grammar, args.pretty)?;
            write_output(args.output.as_deref(), &out)
        }
        Command::Layout => {
            let layout = railcar::render::layout_parsed(&parsed, &LayoutOptions::default())
                .map_err(HeadlessError::Render)?;
            let out = to_json(&layout, args.pretty)?;
            write_output(args.output.as_deref(), &out)
        }
        Command::Render => {
            let layout = railcar::render::layout_parsed(&parsed, &LayoutOptions::default())
                .map_err(HeadlessError::Render)?;
            let svg_options = SvgRenderOptions {
                diagram_id: args.diagram_id.clone(),
                include_rail_labels: args.rail_labels,
                ..SvgRenderOptions::default()
            };
            let svg =
                railcar::render::render_layout_svg(&layout, &parsed.effective_config, &svg_options)?;
            write_output(args.output.as_deref(), &svg)
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(match err {
            CliError::Usage(_) => 2,
            _ => 1,
        });
    }
}
