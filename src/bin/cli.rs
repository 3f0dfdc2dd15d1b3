use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use sqlassess::config::Config;
use sqlassess::engine::CancellationToken;
use sqlassess::error::AssessError;
use sqlassess::output::{console, OutputFormat};
use sqlassess::provider::SnapshotSource;
use sqlassess::rules::selector::unknown_categories;
use sqlassess::rules::{CatalogSource, CheckMetadata, RuleCatalog};
use sqlassess::target::TargetHandle;
use sqlassess::{AssessOptions, Session};

#[derive(Parser)]
#[command(
    name = "sqlassess",
    about = "Rule-based health assessment for database servers",
    version
)]
struct Cli {
    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log debug detail to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Connection target (server name or snapshot file)
    target: String,

    /// Directory holding `<target>.json` metadata snapshots
    #[arg(long, short = 's', env = "SQLASSESS_SNAPSHOTS", default_value = ".")]
    snapshots: PathBuf,

    /// Rule file or directory (repeatable; replaces configured catalog paths)
    #[arg(long = "catalog", short = 'r')]
    catalogs: Vec<PathBuf>,

    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Seconds to wait for target metadata
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a target, prompting for categories unless given
    Assess {
        #[command(flatten)]
        session: SessionArgs,

        /// Category to assess (repeatable; skips the prompt)
        #[arg(long = "category", short = 'C')]
        categories: Vec<String>,

        /// Assess every category without prompting
        #[arg(long, conflicts_with = "categories")]
        all: bool,

        /// Evaluation worker threads (0 = one per core)
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,

        /// Stop starting new checks after this many seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the categories available for a target
    ListCategories {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// List all checks in a catalog
    ListRules {
        /// Rule file or directory (repeatable)
        #[arg(long = "catalog", short = 'r', required = true)]
        catalogs: Vec<PathBuf>,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .sqlassess.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let result = match cli.command {
        Commands::Assess {
            session,
            categories,
            all,
            concurrency,
            deadline,
            format,
            output,
        } => cmd_assess(session, categories, all, concurrency, deadline, format, output),
        Commands::ListCategories { session } => cmd_list_categories(session),
        Commands::ListRules { catalogs, format } => cmd_list_rules(catalogs, format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_env("SQLASSESS_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn open_session(args: SessionArgs, concurrency: Option<usize>) -> Result<Session, AssessError> {
    let options = AssessOptions {
        config_path: args.config,
        catalog_paths: args.catalogs,
        concurrency,
        timeout: args.timeout.map(Duration::from_secs),
        ..Default::default()
    };
    let source = Arc::new(SnapshotSource::new(args.snapshots));
    Session::open(&TargetHandle::new(args.target), source, &options)
}

/// Read one line of categories. `None` means the user asked to exit.
fn prompt_categories() -> Result<Option<Vec<String>>, AssessError> {
    print!("Enter category (ENTER for all categories, 'exit' to leave) > ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(parse_category_line(&line))
}

/// Interpret a prompt answer: `exit` (any case) leaves, an empty line selects
/// every category, anything else is a whitespace-separated category list.
fn parse_category_line(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("exit") {
        return None;
    }
    Some(line.split_whitespace().map(String::from).collect())
}

fn write_output(rendered: &str, path: Option<&Path>) -> Result<(), AssessError> {
    match path {
        Some(out) => std::fs::write(out, rendered)
            .map_err(|e| AssessError::Output(format!("cannot write {}: {e}", out.display()))),
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn cmd_assess(
    args: SessionArgs,
    categories: Vec<String>,
    all: bool,
    concurrency: Option<usize>,
    deadline: Option<u64>,
    format_str: String,
    output_path: Option<PathBuf>,
) -> Result<i32, AssessError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let session = open_session(args, concurrency)?;
    let available = session.categories();

    let categories = if all {
        Vec::new()
    } else if !categories.is_empty() {
        categories
    } else {
        print!("{}", console::render_categories(&session.target().name, &available));
        match prompt_categories()? {
            Some(categories) => categories,
            None => return Ok(0),
        }
    };

    for unknown in unknown_categories(&categories, &available) {
        match unknown.suggestion {
            Some(s) => eprintln!(
                "Warning: no category '{}' for this target (did you mean '{}'?)",
                unknown.token, s
            ),
            None => eprintln!("Warning: no category '{}' for this target", unknown.token),
        }
    }

    let cancel = CancellationToken::new();
    if let Some(secs) = deadline {
        let token = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            token.cancel();
        });
    }

    let report = session.run(&categories, &cancel);
    let rendered = sqlassess::render_report(&report, format)?;

    write_output(&rendered, output_path.as_deref())?;

    Ok(0)
}

fn cmd_list_categories(args: SessionArgs) -> Result<i32, AssessError> {
    let session = open_session(args, None)?;
    print!(
        "{}",
        console::render_categories(&session.target().name, &session.categories())
    );
    Ok(0)
}

fn cmd_list_rules(catalogs: Vec<PathBuf>, format_str: String) -> Result<i32, AssessError> {
    let sources: Vec<CatalogSource> = catalogs.into_iter().map(CatalogSource::from_path).collect();
    let catalog = RuleCatalog::load(&sources)?;
    let rules: Vec<CheckMetadata> = catalog.checks().map(|c| CheckMetadata::from(c.as_ref())).collect();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<32} {:<12} TAGS", "ID", "LEVEL");
            println!("{}", "-".repeat(72));
            for rule in &rules {
                let tags: Vec<&str> = rule.tags.iter().map(String::as_str).collect();
                println!(
                    "{:<32} {:<12} {}",
                    rule.id,
                    rule.level.to_string(),
                    tags.join(", ")
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, AssessError> {
    let path = PathBuf::from(".sqlassess.toml");

    if path.exists() && !force {
        eprintln!(".sqlassess.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created .sqlassess.toml");

    Ok(0)
}
