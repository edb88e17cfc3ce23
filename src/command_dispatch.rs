//! Purpose: Hold top-level CLI command dispatch for `wpconf`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Reads go through the introspector; writes go through the transformer.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

pub(super) fn dispatch_command(command: Command, context: &Context) -> Result<RunOutcome, Error> {
    let color_mode = context.color_mode;
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "wpconf", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Path => {
            let path = require_config(&context.config)?;
            if io::stdout().is_terminal() {
                println!("{}", path.display());
            } else {
                emit_json(json!({ "path": path.display().to_string() }));
            }
            Ok(RunOutcome::ok())
        }
        Command::List {
            filters,
            strict,
            fields,
            format,
        } => {
            let fields = parse_fields(fields.as_deref())?;
            let path = require_config(&context.config)?;
            let entries = filter_entries(introspect(context, &path)?, &filters, strict);
            if !filters.is_empty() && entries.is_empty() {
                return Err(Error::new(ErrorKind::NotFound)
                    .with_message(format!("no entries match '{}'", filters.join("', '")))
                    .with_path(&path)
                    .with_hint("Run `wpconf list` without filters, or drop --strict."));
            }

            let format = format.unwrap_or(if io::stdout().is_terminal() {
                ListFormat::Table
            } else {
                ListFormat::Json
            });
            let values = || {
                Value::Array(
                    entries
                        .iter()
                        .map(|entry| entry_json(entry, &fields))
                        .collect(),
                )
            };
            match format {
                ListFormat::Table => {
                    let headers: Vec<&str> = fields.iter().map(String::as_str).collect();
                    emit_table(&headers, &table_rows(&entries, &fields));
                }
                ListFormat::Json => emit_json(values()),
                ListFormat::Csv => println!("{}", render_csv(&entries, &fields)),
                ListFormat::Yaml => print!("{}", render_yaml(&values())?),
                ListFormat::Dotenv => {
                    let text = render_dotenv(&entries);
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Get { name, kind, format } => {
            let filter = KindFilter::from(kind);
            let path = require_config(&context.config)?;
            let entries = introspect(context, &path)?;
            let entry = find_entry(&entries, &name, filter)
                .map_err(|err| err.with_path(&path))?
                .ok_or_else(|| missing_entry_error(&name, filter, &path))?;
            match format {
                GetFormat::Raw => println!("{}", value_text(&entry.value)),
                GetFormat::Json => emit_json(entry_json(entry, &parse_fields(None)?)),
                GetFormat::Yaml => print!("{}", render_yaml(&entry.value)?),
            }
            Ok(RunOutcome::ok())
        }
        Command::Set {
            name,
            value,
            kind,
            raw,
            no_add,
            anchor,
            placement,
            separator,
            normalize,
        } => {
            let path = require_config(&context.config)?;
            let transformer = ConfigTransformer::new(&path);
            let kind = kind_for_set(&transformer, kind.into(), &name)?;
            let options = TransformOptions::default()
                .with_raw(raw)
                .with_add(!no_add)
                .with_normalize(normalize)
                .with_anchor(anchor_spec(anchor, placement.into(), separator));
            let result = transformer.update(kind, &name, &value, &options)?;

            let action = if result.created { "added" } else { "updated" };
            let message = format!(
                "{} the {kind} '{name}' in the '{}' file with the {}value '{value}'.",
                if result.created { "Added" } else { "Updated" },
                display_file_name(&path),
                if raw { "raw " } else { "" },
            );
            emit_success(
                &message,
                json!({
                    "name": name,
                    "type": kind,
                    "value": value,
                    "raw": raw,
                    "action": action,
                    "path": path.display().to_string(),
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Delete { name, kind } => {
            let filter = KindFilter::from(kind);
            let path = require_config(&context.config)?;
            let transformer = ConfigTransformer::new(&path);
            let kind = transformer
                .resolve_kind(filter, &name)?
                .ok_or_else(|| missing_entry_error(&name, filter, &path))?;
            transformer.remove(kind, &name)?;
            emit_success(
                &format!(
                    "Deleted the {kind} '{name}' from the '{}' file.",
                    display_file_name(&path)
                ),
                json!({
                    "name": name,
                    "type": kind,
                    "action": "deleted",
                    "path": path.display().to_string(),
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Has { name, kind } => {
            let filter = KindFilter::from(kind);
            let path = require_config(&context.config)?;
            let found = ConfigTransformer::new(&path)
                .resolve_kind(filter, &name)?
                .is_some();
            Ok(RunOutcome::from_bool(found))
        }
        Command::IsTrue { name, kind } => {
            let filter = KindFilter::from(kind);
            let path = require_config(&context.config)?;
            let entries = introspect(context, &path)?;
            let truthy = find_entry(&entries, &name, filter)
                .map_err(|err| err.with_path(&path))?
                .is_some_and(|entry| php_truthy(&entry.value));
            Ok(RunOutcome::from_bool(truthy))
        }
        Command::ShuffleSalts {
            keys,
            force,
            salt_url,
        } => {
            let path = require_config(&context.config)?;
            let keys: Vec<String> = if keys.is_empty() {
                SALT_KEYS.iter().map(|key| key.to_string()).collect()
            } else {
                keys
            };
            let transformer = ConfigTransformer::new(&path);
            let definitions = transformer.definitions()?;
            let defined = |key: &str| {
                definitions
                    .iter()
                    .any(|def| def.kind == DefinitionKind::Constant && def.name == key)
            };
            let (targets, skipped): (Vec<String>, Vec<String>) =
                keys.into_iter().partition(|key| force || defined(key.as_str()));
            for key in &skipped {
                let mut details = Map::new();
                details.insert("key".to_string(), json!(key));
                emit_notice(
                    &Notice {
                        kind: "skipped_key".to_string(),
                        time: notice_time_now().unwrap_or_default(),
                        cmd: "shuffle-salts".to_string(),
                        file: path.display().to_string(),
                        message: format!("{key} is not defined; skipped (use --force to add it)"),
                        details,
                    },
                    color_mode,
                );
            }

            if !targets.is_empty() {
                let salts = generate_salts(&targets, &salt_url, "shuffle-salts", &path, color_mode)?;
                let pairs: Vec<(&str, &str)> = salts
                    .iter()
                    .map(|(key, secret)| (key.as_str(), secret.as_str()))
                    .collect();
                let options = TransformOptions::default().with_add(true);
                transformer.update_all(DefinitionKind::Constant, &pairs, &options)?;
            }

            let message = if targets.is_empty() {
                "No salt keys were shuffled.".to_string()
            } else {
                format!("Shuffled {} salt keys.", targets.len())
            };
            emit_success(
                &message,
                json!({
                    "path": path.display().to_string(),
                    "shuffled": targets,
                    "skipped": skipped,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Create {
            dbname,
            dbuser,
            dbpass,
            dbhost,
            dbprefix,
            dbcharset,
            dbcollate,
            locale,
            extra_php,
            skip_salts,
            force,
            salt_url,
        } => {
            let mut params = TemplateParams::new(dbname, dbuser);
            params.db_pass = dbpass;
            params.db_host = dbhost;
            params.db_prefix = dbprefix;
            params.db_charset = dbcharset;
            params.db_collate = dbcollate;
            params.locale = locale.filter(|locale| !locale.is_empty());
            params.extra_php = read_extra_php(extra_php)?;
            params.validate()?;
            if !skip_salts {
                let keys: Vec<String> = SALT_KEYS.iter().map(|key| key.to_string()).collect();
                params.salts = generate_salts(&keys, &salt_url, "create", &context.config, color_mode)?;
            }

            let result = config_init::create(config_init::CreateConfig {
                path: context.config.clone(),
                params,
                force,
            })?;
            emit_success(
                &format!("Generated '{}' file.", result.path),
                json!({
                    "path": result.path,
                    "salts": result.salts,
                    "overwrote_existing": result.overwrote_existing,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
    }
}
