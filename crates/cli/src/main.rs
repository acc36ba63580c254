use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use permcascade_cli::edit::{run_edit, EditOp};
use permcascade_cli::exit_codes::{
    config_exit_code, engine_exit_code, EXIT_CATALOG_CYCLES, EXIT_ERROR, EXIT_PARSE,
    EXIT_SUCCESS, EXIT_USAGE,
};
use permcascade_cli::report::{
    join_ids, join_notices, render_changes, render_check, ClosureReport, DependentsReport, Notice,
    TemplateSummary,
};
use permcascade_config::{load_catalog, load_templates, ConfigError, Settings};
use permcascade_engine::resolver::{expand_template, grant, sorted_ids};
use permcascade_engine::{
    compute_changes, find_dependents, parse_id_list, plan_bulk, remove_with_cascade, BulkAction,
    Catalog, EngineError, PermissionId, SelectionSet, TemplateSet,
};

/// Env var holding a tracing filter directive (e.g. `permcascade_engine=debug`).
const LOG_ENV: &str = "PERMC_LOG";

#[derive(Parser)]
#[command(name = "permc")]
#[command(about = "Resolve permission dependencies and cascades (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Catalog JSON file (overrides settings.toml)
    #[arg(long, global = true, env = "PERMC_CATALOG", value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Template definitions, TOML or JSON (overrides settings.toml)
    #[arg(long, global = true, env = "PERMC_TEMPLATES", value_name = "PATH")]
    templates: Option<PathBuf>,

    /// Print a single JSON value on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report duplicate ids, dangling references and dependency cycles
    #[command(after_help = "\
Examples:
  permc check --catalog perms.json
  permc check --strict          # exit 3 when the catalog has cycles")]
    Check {
        /// Fail when any dependency cycle exists
        #[arg(long)]
        strict: bool,
    },

    /// Resolve ids to their dependency closure
    #[command(after_help = "\
Examples:
  permc closure 7
  permc closure 7,12 31")]
    Closure {
        /// Permission ids (comma-separated lists allowed)
        #[arg(required = true, value_name = "IDS")]
        ids: Vec<String>,
    },

    /// List what revoking ID would take with it
    Dependents {
        /// Permission id to revoke
        id: String,

        /// Current selection (comma-separated)
        #[arg(long, value_name = "IDS", default_value = "")]
        selection: String,
    },

    /// Run a scripted edit session
    #[command(after_help = "\
Ops (applied in order):
  add:ID          grant ID and its dependencies
  remove:ID       revoke ID and everything that requires it
  category:NAME   select-all / deselect-all for a category
  template:NAME   merge a template

Examples:
  permc edit --seed 1,2 add:7 remove:2
  permc edit template:Operator --json")]
    Edit {
        /// Starting selection (comma-separated)
        #[arg(long, value_name = "IDS", default_value = "")]
        seed: String,

        /// Edit ops
        #[arg(required = true, value_name = "OP")]
        ops: Vec<EditOp>,
    },

    /// Compare two selections
    Diff {
        /// Saved selection (comma-separated)
        #[arg(long, value_name = "IDS", default_value = "")]
        original: String,

        /// Edited selection (comma-separated)
        #[arg(long, value_name = "IDS", default_value = "")]
        current: String,
    },

    /// List templates and the size of their resolved closures
    Templates,

    /// Apply one action to many subjects
    #[command(group(ArgGroup::new("action").required(true).args(["add", "remove", "template"])))]
    #[command(after_help = "\
The subjects file is a JSON object mapping subject to its current ids:
  {\"alice\": [1, 2], \"bob\": []}

Examples:
  permc bulk --subjects users.json --add 7
  permc bulk --subjects users.json --template Auditor --json")]
    Bulk {
        /// JSON file of subject -> permission ids
        #[arg(long, value_name = "FILE")]
        subjects: PathBuf,

        /// Grant these ids to every subject
        #[arg(long, value_name = "IDS")]
        add: Option<String>,

        /// Revoke these ids from every subject
        #[arg(long, value_name = "IDS")]
        remove: Option<String>,

        /// Merge this template into every subject
        #[arg(long, value_name = "NAME")]
        template: Option<String>,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  permcascade-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  permcascade-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries command output only
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load();
    let inputs = Inputs {
        catalog: cli.catalog.or(settings.catalog),
        templates: cli.templates.or(settings.templates),
    };
    let json = cli.json;

    match cli.command {
        Commands::Check { strict } => cmd_check(&inputs, strict, json),
        Commands::Closure { ids } => cmd_closure(&inputs, &ids, json),
        Commands::Dependents { id, selection } => cmd_dependents(&inputs, &id, &selection, json),
        Commands::Edit { seed, ops } => cmd_edit(&inputs, &seed, &ops, json),
        Commands::Diff { original, current } => cmd_diff(&original, &current, json),
        Commands::Templates => cmd_templates(&inputs, json),
        Commands::Bulk { subjects, add, remove, template } => {
            let action = match (add, remove, template) {
                (Some(ids), _, _) => BulkAction::Add(parse_id_list(&ids)),
                (_, Some(ids), _) => BulkAction::Remove(parse_id_list(&ids)),
                (_, _, Some(name)) => BulkAction::Template(name),
                (None, None, None) => {
                    return Err(CliError::usage("one of --add, --remove or --template is required"))
                }
            };
            cmd_bulk(&inputs, &subjects, &action, json)
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Catalog and template paths after flags/env/settings are merged.
struct Inputs {
    catalog: Option<PathBuf>,
    templates: Option<PathBuf>,
}

impl Inputs {
    fn catalog(&self) -> Result<Catalog, CliError> {
        let path = self.catalog.as_deref().ok_or_else(|| {
            CliError::usage("no catalog given")
                .with_hint("pass --catalog PATH, set PERMC_CATALOG, or add `catalog` to settings.toml")
        })?;
        load_catalog(path).map_err(CliError::config)
    }

    /// Templates are optional; no file means an empty set.
    fn templates(&self) -> Result<TemplateSet, CliError> {
        match self.templates.as_deref() {
            Some(path) => load_templates(path).map_err(CliError::config),
            None => Ok(TemplateSet::new()),
        }
    }
}

fn id_set(raw: &str) -> SelectionSet {
    parse_id_list(raw).into_iter().collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("failed to serialize output: {e}")))?;
    println!("{}", body);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_check(inputs: &Inputs, strict: bool, json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let report = catalog.diagnostics();

    if json {
        print_json(&report)?;
    } else {
        print!("{}", render_check(&report));
    }

    if strict && report.has_cycles() {
        return Err(CliError {
            code: EXIT_CATALOG_CYCLES,
            message: format!("catalog has {} dependency cycle group(s)", report.cycles.len()),
            hint: None,
        });
    }
    Ok(())
}

fn cmd_closure(inputs: &Inputs, raw: &[String], json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let requested: Vec<PermissionId> = raw.iter().flat_map(|r| parse_id_list(r)).collect();
    if requested.is_empty() {
        return Err(CliError::usage("no permission ids given"));
    }

    let result = grant(&requested, &SelectionSet::default(), catalog.index());
    let report = ClosureReport {
        requested: sorted_ids(&requested),
        selection: sorted_ids(&result.selection),
        auto_added: Notice::for_ids(&catalog, &result.auto_added),
    };

    if json {
        print_json(&report)
    } else {
        println!("selection:  {}", join_ids(&report.selection));
        println!("auto-added: {}", join_notices(&report.auto_added));
        Ok(())
    }
}

fn cmd_dependents(inputs: &Inputs, id: &str, selection: &str, json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let target = PermissionId::from(id.trim());
    if target.is_blank() {
        return Err(CliError::engine(EngineError::InvalidArgument(
            "permission id is empty".into(),
        )));
    }

    let selection = id_set(selection);
    let dependents = find_dependents(&target, &selection, catalog.index());
    let removal = remove_with_cascade(&target, &selection, catalog.index());
    let report = DependentsReport {
        dependents: Notice::for_ids(&catalog, &dependents),
        remaining: sorted_ids(&removal.selection),
        target,
    };

    if json {
        print_json(&report)
    } else {
        println!("revoking {} also revokes: {}", report.target, join_notices(&report.dependents));
        println!("remaining: {}", join_ids(&report.remaining));
        Ok(())
    }
}

fn cmd_edit(inputs: &Inputs, seed: &str, ops: &[EditOp], json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let templates = inputs.templates()?;
    let report =
        run_edit(&catalog, &templates, parse_id_list(seed), ops).map_err(CliError::engine)?;

    if json {
        return print_json(&report);
    }

    if !report.missing_in_seed.is_empty() {
        println!("seed is missing: {}", join_ids(&report.missing_in_seed));
    }
    for step in &report.steps {
        println!("{}", step.op);
        if !step.auto_added.is_empty() {
            println!("  auto-added: {}", join_notices(&step.auto_added));
        }
        if !step.removed_extra.is_empty() {
            println!("  also removed: {}", join_notices(&step.removed_extra));
        }
    }
    println!("selection: {}", join_ids(&report.selection));
    println!("changes:   {}", render_changes(&report.changes));
    Ok(())
}

fn cmd_diff(original: &str, current: &str, json: bool) -> Result<(), CliError> {
    let changes = compute_changes(&id_set(original), &id_set(current));
    if json {
        print_json(&changes)
    } else {
        println!("{}", render_changes(&changes));
        Ok(())
    }
}

fn cmd_templates(inputs: &Inputs, json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let templates = inputs.templates()?;

    let summaries: Vec<TemplateSummary> = templates
        .iter()
        .map(|t| TemplateSummary {
            name: t.name.clone(),
            description: t.description.clone(),
            permissions: t.permissions.clone(),
            closure_size: expand_template(t, catalog.index()).len(),
        })
        .collect();

    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("no templates defined");
    }
    for summary in &summaries {
        println!(
            "{:<20} {:>3} ids ({} with dependencies)  {}",
            summary.name,
            summary.permissions.len(),
            summary.closure_size,
            summary.description
        );
    }
    Ok(())
}

fn cmd_bulk(inputs: &Inputs, path: &Path, action: &BulkAction, json: bool) -> Result<(), CliError> {
    let catalog = inputs.catalog()?;
    let templates = inputs.templates()?;
    let subjects = read_subjects(path)?;

    let outcomes = plan_bulk(&catalog, &templates, action, subjects).map_err(CliError::engine)?;

    if json {
        return print_json(&outcomes);
    }
    for outcome in &outcomes {
        println!("{}: {}", outcome.subject, render_changes(&outcome.changes));
        if !outcome.auto_added.is_empty() {
            println!("  auto-added: {}", join_ids(&outcome.auto_added));
        }
        if !outcome.removed_extra.is_empty() {
            println!("  also removed: {}", join_ids(&outcome.removed_extra));
        }
    }
    Ok(())
}

/// `{"alice": [1, 2], "bob": []}`, kept in file order.
fn read_subjects(path: &Path) -> Result<Vec<(String, Vec<PermissionId>)>, CliError> {
    let body = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("{}: {}", path.display(), e)))?;
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)
        .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))?;

    map.into_iter()
        .map(|(subject, ids)| {
            let ids: Vec<PermissionId> = serde_json::from_value(ids).map_err(|e| {
                CliError::parse(format!("{}: subject '{}': {}", path.display(), subject, e))
            })?;
            Ok((subject, ids))
        })
        .collect()
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn engine(err: EngineError) -> Self {
        let hint = match &err {
            EngineError::UnknownTemplate(_) => {
                Some("run `permc templates` to list defined templates".to_string())
            }
            _ => None,
        };
        Self { code: engine_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Io { .. } => Some("check the --catalog / --templates paths".to_string()),
            _ => None,
        };
        Self { code: config_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
