//! quire command-line front end.
//!
//! Converts one HTML document and prints the resulting element tree, or
//! its JSON form, to stdout. Diagnostics are summarized on stderr.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use quire_common::{CollectingSink, DiagnosticSink, LogSink, Severity, TeeSink};
use quire_convert::css::MediaType;
use quire_convert::{ConvertedDocument, Converter, ConverterProperties, DocumentElement};

/// Convert HTML into quire document elements
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print the element tree of a file
    quire ./index.html

    # Resolve relative links and images against a site
    quire page.html --base-uri https://example.com/docs/

    # Add user stylesheets and dump JSON
    quire page.html --css print.css --css extra.css --json

    # Convert inline HTML for screen media
    quire --html '<h1>Test</h1>' --media screen
"#)]
struct Cli {
    /// Path to the HTML file to convert
    #[arg(value_name = "FILE", required_unless_present = "html")]
    input: Option<PathBuf>,

    /// Convert this HTML string instead of a file
    #[arg(long, value_name = "HTML", conflicts_with = "input")]
    html: Option<String>,

    /// Base for relative references (defaults to the input file's location)
    #[arg(long, value_name = "URI")]
    base_uri: Option<String>,

    /// User stylesheet; may be given more than once
    #[arg(long = "css", value_name = "FILE")]
    css: Vec<PathBuf>,

    /// Media type for @media rules
    #[arg(long, default_value = "print", value_name = "print|screen")]
    media: MediaType,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Do not apply the built-in user-agent stylesheet
    #[arg(long)]
    no_default_css: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let html = match (&cli.html, &cli.input) {
        (Some(html), _) => html.clone(),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => anyhow::bail!("an input file or --html is required"),
    };

    let collected = CollectingSink::shared();
    let sinks: Vec<Arc<dyn DiagnosticSink>> = vec![collected.clone(), Arc::new(LogSink::new())];
    let properties = properties(cli)?.diagnostics(Arc::new(TeeSink::new(sinks)));

    let converter = Converter::new(properties).context("invalid configuration")?;
    let document = converter.convert_html(&html).context("conversion failed")?;

    let mut out = io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &document)?;
        writeln!(out)?;
    } else {
        print_document(&mut out, &document)?;
    }
    print_summary(&collected);
    Ok(())
}

/// Build converter properties from the command line.
fn properties(cli: &Cli) -> Result<ConverterProperties> {
    let mut properties = ConverterProperties::new()
        .media(cli.media)
        .default_stylesheet(!cli.no_default_css);

    if let Some(base) = cli.base_uri.clone().or_else(|| input_directory(cli)) {
        properties = properties.base_uri(base);
    }

    if !cli.css.is_empty() {
        let mut css = String::new();
        for path in &cli.css {
            let sheet = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            css.push_str(&sheet);
            css.push('\n');
        }
        properties = properties.user_stylesheet(css);
    }
    Ok(properties)
}

/// Absolute directory of the input file, with a trailing separator.
fn input_directory(cli: &Cli) -> Option<String> {
    let path = fs::canonicalize(cli.input.as_ref()?).ok()?;
    let dir = path.parent()?;
    Some(format!("{}{}", dir.display(), std::path::MAIN_SEPARATOR))
}

/// Print the element tree, one element per line.
fn print_document(out: &mut impl Write, document: &ConvertedDocument) -> io::Result<()> {
    writeln!(out, "=== {} ===", document.run_id)?;
    for element in &document.elements {
        print_element(out, element, 0)?;
    }
    Ok(())
}

fn print_element(out: &mut impl Write, element: &DocumentElement, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    write!(out, "{indent}{} <{}>", element.kind, element.role)?;
    if let Some(text) = &element.text {
        write!(out, " {text:?}")?;
    }
    if !element.properties.is_empty() {
        let properties: Vec<String> = element.properties.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(out, " {{{}}}", properties.join("; "))?;
    }
    writeln!(out)?;
    for child in &element.children {
        print_element(out, child, depth + 1)?;
    }
    Ok(())
}

/// Per-template diagnostic counts on stderr.
fn print_summary(sink: &CollectingSink) {
    let diagnostics = sink.snapshot();
    if diagnostics.is_empty() {
        eprintln!("{}", "no diagnostics".green());
        return;
    }
    let errors = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    let warnings = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();
    eprintln!(
        "{} diagnostic(s): {} error(s), {} warning(s)",
        diagnostics.len(),
        errors.red(),
        warnings.yellow()
    );

    let mut counts: Vec<(String, usize)> = sink
        .counts()
        .into_iter()
        .map(|(template, count)| (template.to_string(), count))
        .collect();
    counts.sort_unstable();
    for (template, count) in counts {
        eprintln!("  {:>4}  {}", count.bold(), template);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "quire",
            "page.html",
            "--base-uri",
            "https://example.com/",
            "--css",
            "a.css",
            "--css",
            "b.css",
            "--media",
            "screen",
            "--json",
            "--no-default-css",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("page.html")));
        assert_eq!(cli.base_uri.as_deref(), Some("https://example.com/"));
        assert_eq!(cli.css, vec![PathBuf::from("a.css"), PathBuf::from("b.css")]);
        assert_eq!(cli.media, MediaType::Screen);
        assert!(cli.json);
        assert!(cli.no_default_css);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["quire", "--html", "<p>x</p>"]).unwrap();
        assert_eq!(cli.media, MediaType::Print);
        assert!(cli.input.is_none());
        assert!(cli.css.is_empty());
        assert!(!cli.json);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["quire"]).is_err());
        assert!(Cli::try_parse_from(["quire", "--media", "tv", "x.html"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
