//! Command handlers behind the `logview` binary

use crate::cli::{TailArgs, TplSaveArgs, WatchArgs};
use crate::config::{SettingsStore, describe_template};
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::row::Row;
use crate::stream::{CancelScope, StreamReader};
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use std::io::{self, ErrorKind, Write};
use tracing::info;

const TODAY_PLACEHOLDER: &str = "@today@";

/// Replace every `@today@` in a file path with `date` as `YYYY-MM-DD`
pub fn expand_today(path: &str, date: NaiveDate) -> String {
    if !path.contains(TODAY_PLACEHOLDER) {
        return path.to_string();
    }
    path.replace(TODAY_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
}

/// Compile a condition, rendering syntax errors with a pointer at the fault
pub fn compile_filter(condition: &str) -> Result<Filter> {
    Filter::compile(condition)
        .map_err(|err| anyhow!("invalid condition: {err}\n{}", err.pointer(condition)))
}

pub fn watch(mut args: WatchArgs, reader: &StreamReader, store: Option<&SettingsStore>) -> Result<()> {
    if let Some(name) = args.template.clone() {
        let store = store.context("no settings file available to load templates from")?;
        let template = store
            .template(&name)?
            .with_context(|| format!("template '{name}' not found"))?;
        info!(template = %name, "applying template");
        args.apply_template(&template);
    }

    let condition = args.condition.clone().unwrap_or_default();
    let filter = compile_filter(&condition)?;
    let formatter = Formatter::new(args.format_params());
    let cancel = CancelScope::new();

    let stream = match args.file.as_deref().filter(|file| !file.is_empty()) {
        Some(file) => {
            let path = expand_today(file, Utc::now().date_naive());
            eprintln!("Watch file \"{path}\" with filter \"{condition}\"\n");
            reader
                .watch_file(&path, &cancel)
                .with_context(|| format!("cannot watch '{path}'"))?
        }
        None => {
            eprintln!("Watch with filter \"{condition}\"\n");
            reader
                .watch_stream(io::stdin(), &cancel)
                .context("cannot read stdin")?
        }
    };

    print_rows(stream, &filter, &formatter)
}

pub fn tail(args: TailArgs, reader: &StreamReader) -> Result<()> {
    let condition = args.condition.unwrap_or_default();
    let filter = compile_filter(&condition)?;
    let cancel = CancelScope::new();
    let stream = reader
        .read_tail(&args.file, args.bytes, &filter, &cancel)
        .with_context(|| format!("cannot read '{}'", args.file.display()))?;

    // rows were already filtered by the reader
    print_rows(stream, &Filter::all(), &Formatter::default())
}

pub fn tpl_save(args: TplSaveArgs, store: &SettingsStore) -> Result<()> {
    let template = args.to_template();
    let deleted = template.is_empty();
    store.save_template(&args.name, template)?;
    if deleted {
        println!("Template \"{}\" deleted", args.name);
    } else {
        println!("Template \"{}\" saved to {}", args.name, store.path().display());
    }
    Ok(())
}

pub fn tpl_list(store: &SettingsStore) -> Result<()> {
    let templates = store.templates()?;
    if templates.is_empty() {
        println!("No templates saved");
        return Ok(());
    }
    for (name, template) in &templates {
        println!("\t{name} :\t{}", describe_template(template));
    }
    Ok(())
}

/// Print matching rows to stdout and error rows to stderr until the stream ends
fn print_rows(rows: impl Iterator<Item = Row>, filter: &Filter, formatter: &Formatter) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for row in rows {
        if let Some(err) = row.error() {
            eprintln!("{}", format!("row error: {err}").red());
            continue;
        }
        if !filter.matches(&row) {
            continue;
        }
        match writeln!(out, "{}", formatter.format(&row)) {
            Ok(()) => {}
            // reader went away, e.g. `| head`
            Err(err) if err.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(err) => return Err(err).context("cannot write to stdout"),
        }
    }
    Ok(())
}
