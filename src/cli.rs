use crate::{
    config::{self, AppConfig},
    logging::{self, Verbosity},
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ue4ss_modman::{discovery, toggle_all, set_all, ModManager, SaveOptions, Ue4ssMod};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct GlobalOptions {
    format: OutputFormat,
    root: Option<PathBuf>,
    verbosity: Verbosity,
}

#[derive(Debug, PartialEq)]
enum CliCommand {
    List(ListOptions),
    Enable(Vec<String>),
    Disable(Vec<String>),
    Save(SaveArgs),
    Paths,
    Help,
    Version,
}

#[derive(Debug, Default, PartialEq)]
struct ListOptions {
    state: Option<bool>,
    filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkEdit {
    AllOn,
    AllOff,
    Toggle,
}

#[derive(Debug, Default, PartialEq)]
struct SaveArgs {
    on: Vec<String>,
    off: Vec<String>,
    bulk: Option<BulkEdit>,
    markers: Option<bool>,
    json: Option<bool>,
    txt: Option<bool>,
}

impl SaveArgs {
    fn options(&self, defaults: SaveOptions) -> SaveOptions {
        SaveOptions {
            write_marker_files: self.markers.unwrap_or(defaults.write_marker_files),
            write_json_manifest: self.json.unwrap_or(defaults.write_json_manifest),
            write_text_list: self.txt.unwrap_or(defaults.write_text_list),
        }
    }
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, tokens) = parse_global_options(&args)?;
    let command = parse_command(&tokens)?;

    match command {
        CliCommand::Help => {
            print_help();
            return Ok(());
        }
        CliCommand::Version => {
            println!("ue4ss-modman v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let app_config = AppConfig::load_or_create()?;
    let log_file = if app_config.log_to_file {
        Some(config::log_path()?)
    } else {
        None
    };
    logging::init(global.verbosity, log_file.as_deref())?;
    info!("starting ue4ss-modman v{}", env!("CARGO_PKG_VERSION"));

    let root = resolve_root(global.root.as_deref(), &app_config)?;
    debug!(root = %root.display(), "mods folder resolved");

    if command == CliCommand::Paths {
        return print_paths(&root, log_file.as_deref(), global.format);
    }

    let mut manager = ModManager::new(&root)?;
    manager.set_native_names(&app_config.native_mods);
    match command {
        CliCommand::List(options) => list_mods(&manager, &options, global.format),
        CliCommand::Enable(names) => {
            let count = manager.enable_mods(&names)?;
            report_unknown(&manager, &names);
            println!("Enabled {count} mod(s)");
            Ok(())
        }
        CliCommand::Disable(names) => {
            let count = manager.disable_mods(&names)?;
            report_unknown(&manager, &names);
            println!("Disabled {count} mod(s)");
            Ok(())
        }
        CliCommand::Save(args) => save_mods(&mut manager, &args, app_config.save, global.format),
        CliCommand::Paths | CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut format = OutputFormat::Text;
    let mut root = None;
    let mut verbosity = Verbosity::Normal;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            format = parse_format(value)?;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--root=") {
            root = Some(PathBuf::from(value));
            continue;
        }
        match arg.as_str() {
            "--format" => {
                let value = iter.next().context("--format requires a value")?;
                format = parse_format(value)?;
            }
            "--root" => {
                let value = iter.next().context("--root requires a path")?;
                root = Some(PathBuf::from(value));
            }
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            "-v" | "--verbose" => verbosity = Verbosity::Verbose,
            _ => tokens.push(arg.to_string()),
        }
    }

    Ok((
        GlobalOptions {
            format,
            root,
            verbosity,
        },
        tokens,
    ))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {value} (use 'text' or 'json')"))
}

fn parse_command(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::List(ListOptions::default()));
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    match head.as_str() {
        "--help" | "-h" | "help" => Ok(CliCommand::Help),
        "--version" | "-V" | "version" => Ok(CliCommand::Version),
        "list" => Ok(CliCommand::List(parse_list(rest)?)),
        "enable" => Ok(CliCommand::Enable(require_names("enable", rest)?)),
        "disable" => Ok(CliCommand::Disable(require_names("disable", rest)?)),
        "save" => Ok(CliCommand::Save(parse_save(rest)?)),
        "paths" => Ok(CliCommand::Paths),
        other => bail!("Unknown command: {other} (see --help)"),
    }
}

fn parse_list(args: &[String]) -> Result<ListOptions> {
    let mut options = ListOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--enabled" => options.state = Some(true),
            "--disabled" => options.state = Some(false),
            "--filter" => {
                let value = iter.next().context("--filter requires a value")?;
                options.filter = Some(value.to_string());
            }
            value if value.starts_with("--filter=") => {
                options.filter = value.strip_prefix("--filter=").map(str::to_string);
            }
            other => bail!("Unknown list option: {other}"),
        }
    }
    Ok(options)
}

fn require_names(command: &str, args: &[String]) -> Result<Vec<String>> {
    if args.is_empty() {
        bail!("{command} requires one or more mod names");
    }
    Ok(args.to_vec())
}

fn parse_save(args: &[String]) -> Result<SaveArgs> {
    let mut save = SaveArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--on" => {
                let value = iter.next().context("--on requires mod names")?;
                save.on.extend(split_names(value));
            }
            "--off" => {
                let value = iter.next().context("--off requires mod names")?;
                save.off.extend(split_names(value));
            }
            "--all-on" => save.bulk = Some(BulkEdit::AllOn),
            "--all-off" => save.bulk = Some(BulkEdit::AllOff),
            "--toggle-all" => save.bulk = Some(BulkEdit::Toggle),
            "--markers" => save.markers = Some(true),
            "--no-markers" => save.markers = Some(false),
            "--json" => save.json = Some(true),
            "--no-json" => save.json = Some(false),
            "--txt" => save.txt = Some(true),
            "--no-txt" => save.txt = Some(false),
            other => bail!("Unknown save option: {other}"),
        }
    }
    Ok(save)
}

fn split_names(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn resolve_root(explicit: Option<&Path>, app_config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &app_config.mods_root {
        return Ok(path.clone());
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();
    for start in exe_dir.iter().chain(cwd.iter()) {
        if let Some(root) = discovery::locate_root(start) {
            return Ok(root);
        }
    }

    bail!("Could not find the UE4SS Mods folder; pass --root or run from inside UE4SS/Mods")
}

fn report_unknown(manager: &ModManager, names: &[String]) {
    for name in names {
        if manager.get(name).is_none() {
            eprintln!("Unknown mod: {name}");
        }
    }
}

#[derive(Serialize)]
struct ModListItem {
    name: String,
    enabled: bool,
    marker: bool,
    native: bool,
    lang: &'static str,
    scripts: Vec<String>,
    path: String,
}

fn list_mods(manager: &ModManager, options: &ListOptions, format: OutputFormat) -> Result<()> {
    let mut items: Vec<ModListItem> = manager
        .mods()
        .iter()
        .map(|loaded| ModListItem {
            name: loaded.name().to_string(),
            enabled: loaded.enabled(),
            marker: loaded.has_marker(),
            native: loaded.is_native(),
            lang: loaded.lang().label(),
            scripts: loaded.scripts().to_vec(),
            path: loaded.path().display().to_string(),
        })
        .collect();

    if let Some(state) = options.state {
        items.retain(|item| item.enabled == state);
    }
    if let Some(filter) = &options.filter {
        let needle = filter.to_ascii_lowercase();
        items.retain(|item| item.name.to_ascii_lowercase().contains(&needle));
    }
    items.sort_by_key(|item| item.name.to_ascii_lowercase());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            for item in &items {
                let enabled = if item.enabled { "x" } else { " " };
                // '*' marks a mod enabled only through mods.txt / mods.json.
                let source = if item.enabled && !item.marker { "*" } else { " " };
                let origin = if item.native { " (built-in)" } else { "" };
                println!(
                    "[{enabled}]{source} {lang:<4} {count:>2} script(s)  {name}{origin}",
                    lang = item.lang,
                    count = item.scripts.len(),
                    name = item.name
                );
            }
            let enabled = items.iter().filter(|item| item.enabled).count();
            println!("{enabled}/{} mods enabled", items.len());
        }
    }

    Ok(())
}

fn apply_edits(states: &mut [Ue4ssMod], args: &SaveArgs) {
    match args.bulk {
        Some(BulkEdit::AllOn) => set_all(states, true),
        Some(BulkEdit::AllOff) => set_all(states, false),
        Some(BulkEdit::Toggle) => {
            toggle_all(states);
        }
        None => {}
    }
    for state in states.iter_mut() {
        if args.on.iter().any(|name| name == state.name()) {
            state.set_enabled(true);
        }
        if args.off.iter().any(|name| name == state.name()) {
            state.set_enabled(false);
        }
    }
}

fn save_mods(
    manager: &mut ModManager,
    args: &SaveArgs,
    defaults: SaveOptions,
    format: OutputFormat,
) -> Result<()> {
    let options = args.options(defaults);
    if !options.any() {
        bail!("Nothing to save: enable at least one of --markers, --json, --txt");
    }

    let mut states = manager.working_copy();
    apply_edits(&mut states, args);
    for name in args.on.iter().chain(args.off.iter()) {
        if manager.get(name).is_none() {
            eprintln!("Unknown mod: {name}");
        }
    }

    let report = manager
        .apply_and_persist(&states, options)
        .context("save mod states")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => println!(
            "Changes saved. {}/{} mods enabled.",
            report.enabled, report.total
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsOutput {
    mods_root: String,
    config: Option<String>,
    log: Option<String>,
}

fn print_paths(root: &Path, log_file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let output = PathsOutput {
        mods_root: root.display().to_string(),
        config: config::config_path()
            .ok()
            .map(|path| path.display().to_string()),
        log: log_file.map(|path| path.display().to_string()),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Mods root: {}", output.mods_root);
            println!("Config: {}", output.config.as_deref().unwrap_or("-"));
            println!("Log: {}", output.log.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}

fn print_help() {
    println!("ue4ss-modman v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  ue4ss-modman [list]                 List mods");
    println!("  ue4ss-modman enable <names...>      Write enabled.txt for mods");
    println!("  ue4ss-modman disable <names...>     Remove enabled.txt for mods");
    println!("  ue4ss-modman save [options]         Persist the edited state");
    println!("  ue4ss-modman paths                  Show resolved paths");
    println!();
    println!("Global options:");
    println!("  --root <path>                       UE4SS/Mods folder to manage");
    println!("  --format <json|text>                Output format");
    println!("  -v, --verbose                       Debug logging");
    println!("  -q, --quiet                         Errors only");
    println!("  -h, --help                          Show help");
    println!("  -V, --version                       Show version");
    println!();
    println!("List options:");
    println!("  --enabled | --disabled              Filter by state");
    println!("  --filter <text>                     Filter by name");
    println!();
    println!("Save options:");
    println!("  --on <a,b,..> / --off <a,b,..>      Set mods on or off");
    println!("  --all-on | --all-off | --toggle-all Bulk edit before --on/--off");
    println!("  --markers / --no-markers            Write enabled.txt files");
    println!("  --json / --no-json                  Write mods.json");
    println!("  --txt / --no-txt                    Write mods.txt");
}
