//! Purpose: `wpconf` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits results on stdout.
//! Invariants: Commands emit stable stdout formats (human on a terminal, JSON otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All file mutations go through `api::ConfigTransformer` (digest-checked rewrites).
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod config_init;
mod config_paths;
mod entry_json;

use config_paths::{default_config_path, default_php_binary, resolve_config_path};
use entry_json::{
    entry_json, parse_fields, php_truthy, render_csv, render_dotenv, render_yaml, table_rows,
    value_text,
};
use wpconf::api::{
    AnchorSpec, ConfigEntry, ConfigTransformer, DEFAULT_ANCHOR, DEFAULT_SALT_URL,
    DEFAULT_SEPARATOR, DefinitionKind, EntryKind, Error, ErrorKind, Introspector, KindFilter,
    Placement, RemoteSalts, RuntimeChoice, SALT_KEYS, TemplateParams, TransformOptions,
    generate_secret, parse_secret_line, select_runtime, to_exit_code,
};
use wpconf::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }

    /// Exit 0 when `condition` holds, 1 otherwise (`has`, `is-true`).
    fn from_bool(condition: bool) -> Self {
        Self::with_code(if condition { 0 } else { 1 })
    }
}

/// Resolved global options shared by every command.
#[derive(Clone, Debug)]
struct Context {
    config: PathBuf,
    runtime: RuntimeChoice,
    php: Option<PathBuf>,
    color_mode: ColorMode,
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let color_mode = cli.color;
    let context = Context {
        config: resolve_config_path(&cli.config.unwrap_or_else(default_config_path)),
        runtime: cli.runtime.into(),
        php: cli.php.or_else(default_php_binary),
        color_mode,
    };

    let result = command_dispatch::dispatch_command(cli.command, &context);

    result
        .map_err(add_execution_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "wpconf",
    version,
    about = "Inspect and edit wp-config.php files without disturbing their formatting",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Reads report what the file really defines (it is executed in a scratch scope).
Writes edit the file text in place: only the touched statement changes.
"#,
    after_help = r#"EXAMPLES
  $ wpconf list
  $ wpconf get DB_NAME
  $ wpconf set WP_DEBUG true --raw
  $ wpconf delete WP_CACHE
  $ wpconf shuffle-salts

LEARN MORE
  $ wpconf <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file, or a directory holding wp-config.php (default: $WPCONF_CONFIG, else ./wp-config.php)",
        value_hint = ValueHint::AnyPath
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "How to execute the file for reads: auto|php|sandbox"
    )]
    runtime: RuntimeCli,
    #[arg(
        long,
        global = true,
        help = "PHP interpreter for --runtime php (default: $WPCONF_PHP, else php on PATH)",
        value_hint = ValueHint::ExecutablePath
    )]
    php: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RuntimeCli {
    Auto,
    Php,
    Sandbox,
}

impl From<RuntimeCli> for RuntimeChoice {
    fn from(value: RuntimeCli) -> Self {
        match value {
            RuntimeCli::Auto => RuntimeChoice::Auto,
            RuntimeCli::Php => RuntimeChoice::Php,
            RuntimeCli::Sandbox => RuntimeChoice::Sandbox,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TypeCli {
    Constant,
    Variable,
    All,
}

impl From<TypeCli> for KindFilter {
    fn from(value: TypeCli) -> Self {
        match value {
            TypeCli::Constant => KindFilter::Constant,
            TypeCli::Variable => KindFilter::Variable,
            TypeCli::All => KindFilter::All,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PlacementCli {
    Before,
    After,
}

impl From<PlacementCli> for Placement {
    fn from(value: PlacementCli) -> Self {
        match value {
            PlacementCli::Before => Placement::Before,
            PlacementCli::After => Placement::After,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    Table,
    Json,
    Csv,
    Yaml,
    Dotenv,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum GetFormat {
    Raw,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Print the resolved config file path",
        after_help = r#"EXAMPLES
  $ wpconf path
  $ wpconf --config /srv/www path"#
    )]
    Path,
    #[command(
        about = "List the constants, variables, and included files the config defines",
        long_about = r#"List what the config file defines.

The file is executed in a scratch scope (the wp-settings.php bootstrap line is skipped) and
every constant, variable, and included file it introduced is reported in declaration order."#,
        after_help = r#"EXAMPLES
  $ wpconf list
  $ wpconf list DB_ --format dotenv
  $ wpconf list DB_HOST --strict --fields name,value"#
    )]
    List {
        #[arg(help = "Only show names containing any of these strings")]
        filters: Vec<String>,
        #[arg(long, help = "Match filters against whole names only")]
        strict: bool,
        #[arg(long, help = "Comma-separated fields to show: name,value,type")]
        fields: Option<String>,
        #[arg(
            long,
            value_enum,
            help = "Output format (default: table on a terminal, json otherwise)"
        )]
        format: Option<ListFormat>,
    },
    #[command(
        about = "Print the value of one constant or variable",
        after_help = r#"EXAMPLES
  $ wpconf get DB_NAME
  $ wpconf get table_prefix --type variable
  $ wpconf get WP_DEBUG --format json"#
    )]
    Get {
        #[arg(help = "Constant or variable name")]
        name: String,
        #[arg(long = "type", value_enum, default_value = "all", help = "Which kind to look up")]
        kind: TypeCli,
        #[arg(long, value_enum, default_value = "raw", help = "Output format")]
        format: GetFormat,
    },
    #[command(
        about = "Set (or add) a constant or variable in place",
        long_about = r#"Set the value of a constant or variable.

Only the value of the existing statement is replaced; everything else in the file is left
byte-for-byte intact. A missing entry is added next to the anchor line unless --no-add is given.
With --type all an existing variable is updated; otherwise a constant is written."#,
        after_help = r#"EXAMPLES
  $ wpconf set DB_HOST 127.0.0.1
  $ wpconf set WP_DEBUG true --raw
  $ wpconf set table_prefix wp2_ --type variable
  $ wpconf set WP_CACHE true --raw --anchor EOF --separator '\n\n'"#
    )]
    Set {
        #[arg(help = "Constant or variable name")]
        name: String,
        #[arg(help = "New value (a string unless --raw)", allow_hyphen_values = true)]
        value: String,
        #[arg(long = "type", value_enum, default_value = "all", help = "Which kind to write")]
        kind: TypeCli,
        #[arg(long, help = "Write the value verbatim as a PHP expression")]
        raw: bool,
        #[arg(long, help = "Fail instead of adding the entry when it does not exist")]
        no_add: bool,
        #[arg(long, help = "Line marker new entries are placed next to (EOF for end of file)")]
        anchor: Option<String>,
        #[arg(long, value_enum, default_value = "before", help = "Insert before or after the anchor line")]
        placement: PlacementCli,
        #[arg(long, help = "Text placed after an inserted statement; accepts \\n, \\r, \\t")]
        separator: Option<String>,
        #[arg(long, help = "Rewrite the whole statement in canonical form")]
        normalize: bool,
    },
    #[command(
        about = "Remove a constant or variable",
        after_help = r#"EXAMPLES
  $ wpconf delete WP_CACHE
  $ wpconf delete my_var --type variable"#
    )]
    Delete {
        #[arg(help = "Constant or variable name")]
        name: String,
        #[arg(long = "type", value_enum, default_value = "all", help = "Which kind to remove")]
        kind: TypeCli,
    },
    #[command(
        about = "Exit 0 when the entry is defined in the file, 1 otherwise",
        after_help = r#"EXAMPLES
  $ wpconf has DB_PASSWORD && echo defined"#
    )]
    Has {
        #[arg(help = "Constant or variable name")]
        name: String,
        #[arg(long = "type", value_enum, default_value = "all", help = "Which kind to look for")]
        kind: TypeCli,
    },
    #[command(
        name = "is-true",
        about = "Exit 0 when the entry's runtime value is truthy, 1 otherwise",
        after_help = r#"EXAMPLES
  $ wpconf is-true WP_DEBUG && echo "debug is on""#
    )]
    IsTrue {
        #[arg(help = "Constant or variable name")]
        name: String,
        #[arg(long = "type", value_enum, default_value = "all", help = "Which kind to check")]
        kind: TypeCli,
    },
    #[command(
        name = "shuffle-salts",
        about = "Regenerate authentication keys and salts",
        long_about = r#"Regenerate authentication keys and salts.

Secrets are generated locally; the salt service is only contacted when local randomness is
unavailable. Keys that are not defined yet are skipped with a notice unless --force is given."#,
        after_help = r#"EXAMPLES
  $ wpconf shuffle-salts
  $ wpconf shuffle-salts AUTH_KEY NONCE_SALT
  $ wpconf shuffle-salts WP_CACHE_KEY_SALT --force"#
    )]
    ShuffleSalts {
        #[arg(help = "Keys to regenerate (default: the eight standard keys and salts)")]
        keys: Vec<String>,
        #[arg(long, help = "Add requested keys that are not defined yet")]
        force: bool,
        #[arg(long, default_value = DEFAULT_SALT_URL, help = "Salt service used as a fallback")]
        salt_url: String,
    },
    #[command(
        about = "Write a new config file",
        after_help = r#"EXAMPLES
  $ wpconf create --dbname shop --dbuser shop
  $ wpconf --config /srv/www create --dbname shop --dbuser shop --dbpass secret --locale de_DE
  $ printf "define( 'WP_CACHE', true );" | wpconf create --dbname shop --dbuser shop --extra-php -"#
    )]
    Create {
        #[arg(long, help = "Database name")]
        dbname: String,
        #[arg(long, help = "Database user")]
        dbuser: String,
        #[arg(long, default_value = "", help = "Database password")]
        dbpass: String,
        #[arg(long, default_value = "localhost", help = "Database host")]
        dbhost: String,
        #[arg(long, default_value = "wp_", help = "Table prefix")]
        dbprefix: String,
        #[arg(long, default_value = "utf8mb4", help = "Database charset")]
        dbcharset: String,
        #[arg(long, default_value = "", help = "Database collation")]
        dbcollate: String,
        #[arg(long, help = "Site language (written as WPLANG)")]
        locale: Option<String>,
        #[arg(long, help = "PHP placed before the anchor line; '-' reads it from stdin")]
        extra_php: Option<String>,
        #[arg(long, help = "Leave the keys and salts block out")]
        skip_salts: bool,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
        #[arg(long, default_value = DEFAULT_SALT_URL, help = "Salt service used as a fallback")]
        salt_url: String,
    },
    #[command(
        about = "Generate shell completion scripts",
        after_help = r#"EXAMPLES
  $ wpconf completion bash > ~/.local/share/bash-completion/completions/wpconf
  $ wpconf completion zsh > ~/.zfunc/_wpconf
  $ wpconf completion fish > ~/.config/fish/completions/wpconf.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

fn require_config(path: &Path) -> Result<PathBuf, Error> {
    if path.is_file() {
        return Ok(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));
    }
    Err(Error::new(ErrorKind::NotFound)
        .with_message("config file not found")
        .with_path(path)
        .with_hint("Pass --config <FILE|DIR>, set WPCONF_CONFIG, or run `wpconf create`."))
}

fn introspect(context: &Context, path: &Path) -> Result<Vec<ConfigEntry>, Error> {
    let runtime = select_runtime(context.runtime, context.php.clone());
    Introspector::new(runtime).list(path)
}

fn filter_entries(entries: Vec<ConfigEntry>, filters: &[String], strict: bool) -> Vec<ConfigEntry> {
    if filters.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| {
            filters.iter().any(|filter| {
                if strict {
                    entry.name == *filter
                } else {
                    entry.name.contains(filter.as_str())
                }
            })
        })
        .collect()
}

fn entry_matches(filter: KindFilter, kind: EntryKind) -> bool {
    match kind {
        EntryKind::Constant => filter.matches(DefinitionKind::Constant),
        EntryKind::Variable => filter.matches(DefinitionKind::Variable),
        EntryKind::Includes => false,
    }
}

/// The single runtime entry named `name`; `None` when it is not defined.
fn find_entry<'a>(
    entries: &'a [ConfigEntry],
    name: &str,
    filter: KindFilter,
) -> Result<Option<&'a ConfigEntry>, Error> {
    let matches: Vec<&ConfigEntry> = entries
        .iter()
        .filter(|entry| entry.name == name && entry_matches(filter, entry.kind))
        .collect();
    match matches.as_slice() {
        [] => Ok(None),
        [entry] => Ok(Some(entry)),
        _ => Err(Error::new(ErrorKind::AmbiguousKind)
            .with_message(format!("found both a constant and a variable '{name}'"))
            .with_name(name)
            .with_hint("Use --type=constant or --type=variable to disambiguate.")),
    }
}

fn missing_entry_error(name: &str, filter: KindFilter, path: &Path) -> Error {
    let what = match filter {
        KindFilter::Constant => "constant",
        KindFilter::Variable => "variable",
        KindFilter::All => "constant or variable",
    };
    Error::new(ErrorKind::NotFound)
        .with_message(format!("the {what} '{name}' is not defined"))
        .with_name(name)
        .with_path(path)
        .with_hint("Run `wpconf list` to see what the file defines.")
}

/// Kind targeted by `set`: an explicit `--type`, else an existing variable, else a constant.
fn kind_for_set(
    transformer: &ConfigTransformer,
    filter: KindFilter,
    name: &str,
) -> Result<DefinitionKind, Error> {
    Ok(match filter {
        KindFilter::Constant => DefinitionKind::Constant,
        KindFilter::Variable => DefinitionKind::Variable,
        KindFilter::All => match transformer.resolve_kind(KindFilter::All, name)? {
            Some(DefinitionKind::Variable) => DefinitionKind::Variable,
            _ => DefinitionKind::Constant,
        },
    })
}

fn anchor_spec(anchor: Option<String>, placement: Placement, separator: Option<String>) -> AnchorSpec {
    AnchorSpec::new(anchor.unwrap_or_else(|| DEFAULT_ANCHOR.to_string()))
        .with_placement(placement)
        .with_separator(
            separator
                .as_deref()
                .map(unescape_separator)
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        )
}

/// Decode the `\n`, `\r`, `\t`, and `\\` escapes accepted by `--separator`.
fn unescape_separator(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn read_extra_php(value: Option<String>) -> Result<Option<String>, Error> {
    match value.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read --extra-php from stdin")
                    .with_source(err)
            })?;
            Ok(Some(buf))
        }
        _ => Ok(value),
    }
}

/// One secret per key: local randomness first, the salt service only if that fails.
fn generate_salts(
    keys: &[String],
    salt_url: &str,
    cmd: &str,
    path: &Path,
    color_mode: ColorMode,
) -> Result<Vec<(String, String)>, Error> {
    let local: Result<Vec<String>, Error> = keys.iter().map(|_| generate_secret()).collect();
    let secrets = match local {
        Ok(secrets) => secrets,
        Err(err) => {
            emit_notice(
                &Notice {
                    kind: "salt_fallback".to_string(),
                    time: notice_time_now().unwrap_or_default(),
                    cmd: cmd.to_string(),
                    file: path.display().to_string(),
                    message: format!(
                        "local key generation failed ({}); using {salt_url}",
                        error_message(&err)
                    ),
                    details: Map::new(),
                },
                color_mode,
            );
            fetch_remote_secrets(salt_url, keys.len())?
        }
    };
    Ok(keys.iter().cloned().zip(secrets).collect())
}

fn fetch_remote_secrets(salt_url: &str, count: usize) -> Result<Vec<String>, Error> {
    let remote = RemoteSalts::new(salt_url)?;
    let mut secrets = Vec::with_capacity(count);
    while secrets.len() < count {
        let batch: Vec<String> = remote
            .fetch()?
            .iter()
            .filter_map(|line| parse_secret_line(line))
            .collect();
        if batch.is_empty() {
            return Err(Error::new(ErrorKind::KeyGeneration)
                .with_message("salt service response contained no keys"));
        }
        secrets.extend(batch);
    }
    secrets.truncate(count);
    Ok(secrets)
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn add_execution_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::ExecutionFailed || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "The config file failed to execute. Fix the PHP error, or try --runtime php / --runtime sandbox.",
    )
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check file and directory permissions for the config file.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        ErrorKind::KeyGeneration => err.with_hint(
            "Could not produce secrets locally or from the salt service. Check network access or --salt-url.",
        ),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share command/context if it persists.",
    )
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("wpconf {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "wpconf",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

/// Human `Success:` line on a terminal, `value` as JSON otherwise.
fn emit_success(message: &str, value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    if is_tty {
        let label = colorize_label("Success:", color_mode.use_color(is_tty), AnsiColor::Green);
        println!("{label} {message}");
    } else {
        emit_json(value);
    }
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let column_count = headers.len();
    let mut sanitized_rows = Vec::with_capacity(rows.len());
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        let mut sanitized = Vec::with_capacity(column_count);
        for (idx, width) in widths.iter_mut().enumerate() {
            let value = row.get(idx).map(String::as_str).unwrap_or("");
            let cleaned = sanitize_table_cell(value);
            *width = (*width).max(cleaned.chars().count());
            sanitized.push(cleaned);
        }
        sanitized_rows.push(sanitized);
    }

    let mut lines = Vec::with_capacity(sanitized_rows.len() + 1);
    lines.push(format_table_line(
        &headers
            .iter()
            .map(|header| header.to_string())
            .collect::<Vec<_>>(),
        &widths,
    ));
    for row in sanitized_rows {
        lines.push(format_table_line(&row, &widths));
    }
    lines.join("\n")
}

fn sanitize_table_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len && idx + 1 < widths.len() {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

fn emit_json(value: serde_json::Value) {
    let pretty = io::stdout().is_terminal();
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
    Green,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::AmbiguousKind => "ambiguous constant/variable name".to_string(),
        ErrorKind::AnchorNotFound => "anchor not found".to_string(),
        ErrorKind::ExecutionFailed => "config file failed to execute".to_string(),
        ErrorKind::KeyGeneration => "key generation failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Conflict => "config file changed concurrently".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(name) = err.name() {
        inner.insert("name".to_string(), json!(name));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `wpconf --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "wpconf") else {
        return "Try `wpconf --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `wpconf --help`.".to_string();
    }
    format!("Try `wpconf {} --help`.", parts.join(" "))
}
