//! CLI entry point for srcpkg.
//!
//! Locates one Go package, builds it and prints a single view of it as text
//! or JSON.

use anyhow::{Context, Result};
use clap::{
    Parser, ValueEnum,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use srcpkg::docs::Value;
use srcpkg::{Package, Settings, SourceContext, logging};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Inspect a Go package: documentation, functions and method sets
#[derive(Parser)]
#[command(
    name = "srcpkg",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect a Go package",
    after_help = "Examples:\n  srcpkg fmt\n  srcpkg ./internal/store types\n  srcpkg example.com/mod/pkg methods --type Buffer --json\n  srcpkg . notes --tag BUG",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Import path or directory (`.`, `./sub`) of the package
    package: String,

    /// What to print
    #[arg(value_enum, default_value_t = View::Synopsis)]
    view: View,

    /// Path to custom settings.toml file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory imports are resolved from (defaults to the working directory)
    #[arg(short = 'C', long)]
    dir: Option<PathBuf>,

    /// Restrict `methods` to one type
    #[arg(long = "type")]
    type_name: Option<String>,

    /// Restrict `notes` to one marker (BUG, TODO, ...)
    #[arg(long)]
    tag: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Log pipeline steps to stderr
    #[arg(short, long, env = "SRCPKG_VERBOSE")]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Synopsis,
    Consts,
    Vars,
    Funcs,
    Types,
    Methods,
    Notes,
    Examples,
    Files,
}

#[derive(Serialize)]
struct FunctionOut {
    name: String,
    params: String,
    results: String,
}

#[derive(Serialize)]
struct MethodSetOut {
    name: String,
    methods: Vec<FunctionOut>,
}

#[derive(Serialize)]
struct FilesOut {
    names: Vec<String>,
    source_paths: Vec<PathBuf>,
    test_paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }),
    };
    if let Some(dir) = &cli.dir {
        settings.context.source_dir = Some(dir.clone());
    }
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        logging::parse_level(&settings.logging.level)
    };
    logging::init(level);

    let context = SourceContext::from_settings(&settings);
    tracing::debug!("resolving {} in {context}", cli.package);
    let package = Package::from_settings(&settings, &cli.package)?;
    print_view(&package, &cli)
}

fn print_view(package: &Package, cli: &Cli) -> Result<()> {
    match cli.view {
        View::Synopsis => {
            let synopsis = package.synopsis()?;
            if cli.json {
                emit_json(&serde_json::json!({
                    "package": package.name(),
                    "import_path": package.import_path(),
                    "synopsis": synopsis,
                }))
            } else {
                println!("{package}: {synopsis}");
                Ok(())
            }
        }
        View::Consts => print_values(package.docs()?.constants(), cli.json),
        View::Vars => print_values(package.docs()?.variables(), cli.json),
        View::Funcs => {
            let funcs: Vec<FunctionOut> = package
                .functions()?
                .iter()
                .map(|f| FunctionOut {
                    name: f.name().to_string(),
                    params: f.params(),
                    results: f.results(),
                })
                .collect();
            if cli.json {
                return emit_json(&funcs);
            }
            for f in funcs {
                println!("func {}{} {}", f.name, f.params, f.results);
            }
            Ok(())
        }
        View::Types => {
            let docs = package.docs()?;
            if cli.json {
                return emit_json(docs.types());
            }
            for ty in docs.types() {
                println!("{}", ty.decl);
                for method in &ty.methods {
                    println!("    {}", method.decl);
                }
            }
            Ok(())
        }
        View::Methods => {
            let sets = match &cli.type_name {
                Some(name) => vec![package.method_set(name)?],
                None => package.methods()?.into_values().collect(),
            };
            let out: Vec<MethodSetOut> = sets
                .iter()
                .map(|set| MethodSetOut {
                    name: set.name.clone(),
                    methods: set
                        .iter()
                        .map(|f| FunctionOut {
                            name: f.name().to_string(),
                            params: f.params(),
                            results: f.results(),
                        })
                        .collect(),
                })
                .collect();
            if cli.json {
                return emit_json(&out);
            }
            for set in out {
                println!("{} ({} methods)", set.name, set.methods.len());
                for m in set.methods {
                    println!("    {}{} {}", m.name, m.params, m.results);
                }
            }
            Ok(())
        }
        View::Notes => {
            let docs = package.docs()?;
            let notes: Vec<_> = docs
                .all_notes()
                .iter()
                .filter(|(tag, _)| cli.tag.as_deref().is_none_or(|wanted| wanted == tag.as_str()))
                .collect();
            if cli.json {
                return emit_json(&notes);
            }
            for (tag, list) in notes {
                for note in list {
                    print!("{tag}({}): {}", note.uid, note.body);
                }
            }
            Ok(())
        }
        View::Examples => {
            let docs = package.docs()?;
            if cli.json {
                return emit_json(docs.examples());
            }
            for example in docs.examples() {
                println!("Example{}:", example.name);
                for line in example.code.lines() {
                    println!("    {line}");
                }
                if example.has_output() {
                    println!("  Output:");
                    for line in example.output.lines() {
                        println!("    {line}");
                    }
                }
            }
            Ok(())
        }
        View::Files => {
            let files = package.files();
            let out = FilesOut {
                names: files.names()?,
                source_paths: files.source_paths(),
                test_paths: files.test_paths(),
            };
            if cli.json {
                return emit_json(&out);
            }
            for name in out.names {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn print_values(values: &[Value], json: bool) -> Result<()> {
    if json {
        return emit_json(values);
    }
    for value in values {
        if !value.doc.is_empty() {
            for line in value.doc.lines() {
                println!("// {line}");
            }
        }
        println!("{}\n", value.decl);
    }
    Ok(())
}

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
