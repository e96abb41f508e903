use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use brew_audit::audit::{self, Collaborators, Options};
use brew_audit::classify::KnownMisclassified;
use brew_audit::cleanup;
use brew_audit::collector::{AppStore, Homebrew, Mas};
use brew_audit::config::AuditConfig;
use brew_audit::logging;
use brew_audit::output;
use brew_audit::preflight;
use brew_audit::report::Git;
use brew_audit::review::TerminalPrompter;

#[derive(Parser, Debug)]
#[command(
    name = "brew-audit",
    version,
    about = "Reconcile brew.sh with installed Homebrew formulae, casks and App Store apps"
)]
struct Args {
    /// Preview the changes without writing anything (default)
    #[arg(long, overrides_with = "apply")]
    dry_run: bool,

    /// Write accepted changes to the manifest
    #[arg(long, overrides_with = "dry_run")]
    apply: bool,

    /// Also list application bundles that nothing manages
    #[arg(long)]
    scan_apps: bool,

    /// Print per-step diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file (TOML format)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::UnknownArgument => {
            let flag = e
                .get(clap::error::ContextKind::InvalidArg)
                .map(|value| value.to_string())
                .unwrap_or_default();
            output::error(&format!("Unknown option: {}", flag));
            eprintln!("Run with --help for usage.");
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    }
}

fn run(args: Args) -> Result<()> {
    tracing::debug!(
        apply = args.apply,
        dry_run = args.dry_run,
        scan_apps = args.scan_apps,
        "arguments"
    );
    let config = AuditConfig::load(args.config.as_deref())?;
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let environment = preflight::validate(&cwd, &config)?;

    cleanup::install_signal_hook().context("Failed to install signal handler")?;

    if args.apply {
        output::info("Running in apply mode: accepted changes will be written");
    } else {
        output::info("Running in dry-run mode: nothing will be written");
    }

    let brew = Homebrew::new(environment.brew.to_string_lossy());
    let mas = environment.mas.as_ref().map(|path| Mas::new(path.to_string_lossy()));
    let git = Git::new(&environment.root);
    let mut prompter = TerminalPrompter::stdin();
    let known =
        KnownMisclassified::builtin().with_extra(config.known_misclassified.iter().cloned());

    let options = Options {
        apply: args.apply,
        scan_apps: args.scan_apps,
        applications_dir: config.applications_dir.clone(),
        timestamp: None,
    };
    audit::run(
        &environment.manifest_path,
        &known,
        &options,
        Collaborators {
            brew: &brew,
            app_store: mas.as_ref().map(|mas| mas as &dyn AppStore),
            vcs: &git,
            prompter: &mut prompter,
        },
    )?;
    Ok(())
}

fn main() -> ExitCode {
    let args = parse_args();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            cleanup::remove_all();
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
