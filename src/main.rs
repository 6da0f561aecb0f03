//! AngryLion CLI
//!
//! Usage:
//!   angrylion [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>      Template config document [default: config.xml]
//!   -w, --workspace <DIR>    Output directory [default: workspace]
//!   -t, --template <NAME>    Template to create (asked for if omitted)
//!   -a, --answers <FILE>     Answers file (TOML) with inputs and cases
//!   --log-file <FILE>        Log destination [default: angrylion.log]
//!   -l, --list               List the templates and exit
//!   --dry-run                Print the resolved keys without writing files
//!   -v, --verbose            Mirror log events to stderr
//!   -h, --help               Print help

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use angrylion::{load, resolve, scaffold, Answers, Prompter, ScaffoldError, Severity, Workspace};

#[derive(Parser)]
#[command(name = "angrylion")]
#[command(about = "Create projects from key-driven templates")]
struct Cli {
    /// Template config document
    #[arg(short, long, default_value = "config.xml")]
    config: PathBuf,

    /// Output directory; emptied before the template is written
    #[arg(short, long, default_value = "workspace")]
    workspace: PathBuf,

    /// Template to create (asked for if omitted)
    #[arg(short, long)]
    template: Option<String>,

    /// Answers file (TOML) with the template, inputs and cases
    #[arg(short, long)]
    answers: Option<PathBuf>,

    /// Log destination
    #[arg(long, default_value = "angrylion.log")]
    log_file: PathBuf,

    /// List the templates and exit
    #[arg(short, long)]
    list: bool,

    /// Print the resolved keys and folders without writing files
    #[arg(long)]
    dry_run: bool,

    /// Mirror log events to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_file, cli.verbose) {
        eprintln!("Error opening log file '{}': {}", cli.log_file.display(), e);
        process::exit(1);
    }

    let source = match fs::read_to_string(&cli.config) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "cannot read config");
            eprintln!("Error reading file '{}': {}", cli.config.display(), e);
            exit_fatal(Severity::Error);
        }
    };

    let registry = match load(&source) {
        Ok(registry) => registry,
        Err(e) => {
            let filename = cli.config.display().to_string();
            tracing::error!(error = %e, "invalid config");
            eprintln!("{}", e.format(&source, &filename));
            eprintln!();
            eprintln!("fix the above errors in the config");
            exit_fatal(Severity::Error);
        }
    };

    if cli.list {
        for (name, description) in registry.descriptions() {
            println!("{}: {}", name, description);
        }
        return;
    }

    let mut answers = match &cli.answers {
        Some(path) => match Answers::from_file(path) {
            Ok(answers) => answers,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot load answers");
                eprintln!("Error loading answers '{}': {}", path.display(), e);
                exit_fatal(Severity::Error);
            }
        },
        None => Answers::default(),
    };
    if cli.template.is_some() {
        answers.template = cli.template.clone();
    }

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let answers = match prompter.complete(&registry, answers) {
        Ok(answers) => answers,
        Err(e) => {
            tracing::error!(error = %e, "cannot collect answers");
            eprintln!("Error: {}", e);
            exit_fatal(Severity::Error);
        }
    };

    if cli.dry_run {
        match resolve(&registry, &answers) {
            Ok(resolved) => {
                for (name, value) in resolved.keys.iter() {
                    println!("{} = {}", name, value);
                }
                for folder in &resolved.folders {
                    println!("{} -> {}", folder.source, folder.target);
                }
            }
            Err(e) => fail(&e),
        }
        return;
    }

    let config_dir = cli
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let workspace = Workspace::new(&cli.workspace);
    match scaffold(&registry, &answers, config_dir, &workspace) {
        Ok(outcome) => {
            println!();
            println!(
                "Your template files are inside the '{}' folder ({} files), copy them where you need them.",
                workspace.root().display(),
                outcome.files.len()
            );
        }
        Err(e) => fail(&e),
    }
}

fn init_logging(path: &Path, verbose: bool) -> io::Result<()> {
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "angrylion=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(verbose.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr)))
        .init();
    Ok(())
}

fn fail(err: &ScaffoldError) -> ! {
    let severity = err.severity();
    if let ScaffoldError::Resolve(e) = err {
        angrylion::Diagnostic::from(e).emit();
    } else {
        tracing::error!(error = %err, "scaffold failed");
    }
    eprintln!("Error: {}", err);
    exit_fatal(severity)
}

fn exit_fatal(severity: Severity) -> ! {
    if let Some(notice) = severity.exit_notice() {
        eprintln!("{}", notice);
    }
    let _ = io::stderr().flush();
    process::exit(1)
}
