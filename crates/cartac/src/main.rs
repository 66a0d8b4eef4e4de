use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use carta_common::manifest;
use carta_compiler::error::AssembleError;
use carta_compiler::parser::{DocumentParser, JsonParser};
use carta_compiler::semantic::Resolver;

/// Carta IDL compiler front-end.
///
/// Resolves parsed .carta declaration documents into a typed schema.
#[derive(Parser)]
#[command(
    name = "cartac",
    version,
    about,
    long_about = "Carta IDL compiler front-end.\n\nResolves parsed .carta declaration documents (and their .cartah headers)\ninto a typed schema of namespaces, data types, and routes.\n\nExamples:\n  cartac                              Resolve the documents listed in Carta.toml\n  cartac files.carta users.carta      Resolve specific documents\n  cartac files.carta --check          Resolve only, report errors\n  cartac --emit-schema                Dump the resolved schema to stdout"
)]
struct Cli {
    /// Input .carta documents. When empty, documents come from Carta.toml.
    inputs: Vec<PathBuf>,

    /// API version stamped onto the resolved schema (overrides Carta.toml).
    #[arg(long = "api-version")]
    api_version: Option<String>,

    /// Resolve only; print nothing on success.
    #[arg(long)]
    check: bool,

    /// Dump the resolved schema to stdout (debug representation).
    #[arg(long = "emit-schema")]
    emit_schema: bool,

    /// Suppress the per-namespace summary.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (version, inputs) = resolve_run_config(&cli);

    let parser = JsonParser;
    let mut resolver = Resolver::new(version, &parser);
    let mut failed = false;

    for path in &inputs {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("error: could not read '{}': {}", path.display(), e);
                failed = true;
                continue;
            }
        };

        let declarations = match parser.parse(&source) {
            Ok(declarations) => declarations,
            Err(e) => {
                eprintln!("{}: error: {}", path.display(), e);
                failed = true;
                continue;
            }
        };

        match resolver.add_document(path, declarations) {
            Ok(()) => {}
            Err(AssembleError::MissingNamespace { path }) => {
                // Nothing to attach the document's contents to; the run
                // cannot produce a usable schema.
                eprintln!(
                    "error: first declaration in '{}' must be a namespace",
                    path.display()
                );
                process::exit(1);
            }
            Err(AssembleError::Resolve(e)) => {
                eprintln!("{}: error: {}", path.display(), e);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }

    let api = resolver.into_api();

    if cli.emit_schema {
        println!("{:#?}", api);
        return;
    }

    if cli.check {
        println!("No errors found.");
        return;
    }

    if !cli.quiet {
        for namespace in &api.namespaces {
            println!(
                "namespace {}: {} types, {} routes",
                namespace.name,
                namespace.types.len(),
                namespace.routes.len()
            );
        }
    }
}

/// Work out the API version and the document list.
///
/// Explicit inputs and --api-version win; anything missing comes from the
/// nearest Carta.toml (next to the first input, or the working directory).
fn resolve_run_config(cli: &Cli) -> (String, Vec<PathBuf>) {
    if let Some(version) = &cli.api_version {
        if !cli.inputs.is_empty() {
            return (version.clone(), cli.inputs.clone());
        }
    }

    let search_dir = cli
        .inputs
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let manifest = match manifest::find_and_load_manifest(&search_dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("   = help: pass input documents with --api-version, or add a Carta.toml");
            process::exit(1);
        }
    };

    let version = cli
        .api_version
        .clone()
        .unwrap_or_else(|| manifest.project.version.clone());
    let inputs = if cli.inputs.is_empty() {
        manifest.documents.clone()
    } else {
        cli.inputs.clone()
    };
    (version, inputs)
}
