use crate::config::Template;
use crate::formatter::{FormatParams, parse_field_list};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

const CONDITION_HELP: &str = "Filter condition, e.g. \"level = error and (module ~ billing or module ~ payments)\". \
Operators: = != ~ !~ and ':' for globs; 'a|b' lists alternatives; mix and/or only with brackets";

/// Watch and filter JSON-line log files
#[derive(Parser, Debug)]
#[command(name = "logview", author, version, about, long_about = None)]
pub struct Cli {
    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file holding stream tunables and templates
    /// [default: ~/.logview/settings.toml]
    #[arg(short, long, env = "LOGVIEW_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Defaults to `watch` reading stdin
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow new rows of a log file (or stdin) and show those matching the condition
    Watch(WatchArgs),
    /// Show rows matching the condition from the end of a log file
    Tail(TailArgs),
    /// Manage saved templates
    #[command(subcommand)]
    Tpl(TplCommands),
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Log file; stdin when omitted. '@today@' becomes today's UTC date (2024-05-17)
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<String>,

    #[arg(short, long, help = CONDITION_HELP)]
    pub condition: Option<String>,

    /// Saved template supplying any flag not given
    #[arg(short, long, value_name = "NAME")]
    pub template: Option<String>,

    /// Comma-separated fields to show, in order; globs and '!glob' allowed
    #[arg(short, long = "output", value_name = "FIELDS")]
    pub output_fields: Option<String>,

    /// Comma-separated fields to highlight
    #[arg(short, long = "accent", value_name = "FIELDS")]
    pub accent_fields: Option<String>,
}

impl WatchArgs {
    /// Fill flags that were not given on the command line from a template
    pub fn apply_template(&mut self, template: &Template) {
        let fill = |slot: &mut Option<String>, flag: &str| {
            if slot.is_none() {
                *slot = template.get(flag).cloned();
            }
        };
        fill(&mut self.file, "f");
        fill(&mut self.condition, "c");
        fill(&mut self.output_fields, "o");
        fill(&mut self.accent_fields, "a");
    }

    pub fn format_params(&self) -> FormatParams {
        let mut params = FormatParams::default();
        if let Some(fields) = self.output_fields.as_deref().and_then(parse_field_list) {
            params.output_fields = fields;
        }
        if let Some(fields) = self.accent_fields.as_deref().and_then(parse_field_list) {
            params.accent_fields = fields;
        }
        params
    }
}

#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    /// Log file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Read only the last N bytes (0 reads the whole file)
    #[arg(short, long, default_value_t = 0)]
    pub bytes: u64,

    #[arg(short, long, help = CONDITION_HELP)]
    pub condition: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TplCommands {
    /// Save the given flags as a template; saving no flags deletes it
    Save(TplSaveArgs),
    /// List saved templates
    List,
}

#[derive(Args, Debug, Clone)]
pub struct TplSaveArgs {
    /// Template name
    #[arg(short = 't', long = "template", value_name = "NAME")]
    pub name: String,

    #[arg(short, long, value_name = "FILE")]
    pub file: Option<String>,

    #[arg(short, long)]
    pub condition: Option<String>,

    #[arg(short, long = "output", value_name = "FIELDS")]
    pub output_fields: Option<String>,

    #[arg(short, long = "accent", value_name = "FIELDS")]
    pub accent_fields: Option<String>,
}

impl TplSaveArgs {
    pub fn to_template(&self) -> Template {
        [
            ("f", &self.file),
            ("c", &self.condition),
            ("o", &self.output_fields),
            ("a", &self.accent_fields),
        ]
        .into_iter()
        .filter_map(|(flag, value)| value.clone().map(|v| (flag.to_string(), v)))
        .collect()
    }
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
