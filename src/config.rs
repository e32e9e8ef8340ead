//! Command-line flags and the optional `rvasm.toml` (SPEC_FULL.md §4.8),
//! merged CLI-over-file the way the teacher's `OptionalConfig::merge` merges
//! `fpgrars.toml` under its own CLI flags.

use clap::Parser;
use lazy_static::lazy_static;
use serde::Deserialize;

lazy_static! {
    pub static ref CONFIG: Config = OptionalConfig::get_args()
        .merge(OptionalConfig::get_toml())
        .into();
}

#[derive(Parser, Deserialize, Debug, Default)]
#[command(author, version, about = "Assembles and runs a RISC-V-style program")]
pub struct OptionalConfig {
    /// The source file to assemble and run
    #[serde(skip)]
    pub file: Option<String>,

    /// Drop into the interactive debugger instead of running to completion
    #[arg(short = 'd', long)]
    pub debug: Option<bool>,

    /// Alias for --debug: graphical rendering is out of scope, so this just
    /// starts the same text debugger (see DESIGN.md)
    #[arg(short = 'g', long)]
    pub graphical: Option<bool>,

    /// Disables colored output
    #[arg(long)]
    pub no_color: Option<bool>,

    /// Path to a config file, instead of `./rvasm.toml`
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Colors debugger/error output (default: true)
    #[arg(skip)]
    pub color: Option<bool>,

    /// Echoes the surrounding source lines on every debugger stop (default: true)
    #[arg(skip)]
    pub echo_source: Option<bool>,
}

impl OptionalConfig {
    pub fn get_args() -> Self {
        Self::parse()
    }

    pub fn get_toml() -> Self {
        let path = OptionalConfig::parse().config.unwrap_or_else(|| "rvasm.toml".to_string());
        std::fs::read_to_string(path)
            .ok()
            .map(|text| toml::from_str(&text).expect("failed to parse config file"))
            .unwrap_or_default()
    }

    /// `self` wins: this is called as `cli.merge(toml)`, so CLI flags take
    /// priority over the file (SPEC_FULL.md §4.8).
    pub fn merge(self, rhs: Self) -> Self {
        Self {
            file: self.file.or(rhs.file),
            debug: self.debug.or(rhs.debug),
            graphical: self.graphical.or(rhs.graphical),
            no_color: self.no_color.or(rhs.no_color),
            config: self.config.or(rhs.config),
            color: self.color.or(rhs.color),
            echo_source: self.echo_source.or(rhs.echo_source),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub file: String,
    /// `-d` and `-g` are equivalent entry points into the same text debugger
    /// (see DESIGN.md's Open Question on `-g`).
    pub debug: bool,
    pub color: bool,
    pub echo_source: bool,
}

impl From<OptionalConfig> for Config {
    fn from(config: OptionalConfig) -> Self {
        if config.graphical.unwrap_or(false) {
            eprintln!("note: graphical rendering isn't supported; starting the text debugger instead");
        }
        let debug = config.debug.unwrap_or(false) || config.graphical.unwrap_or(false);
        let color = !config.no_color.unwrap_or(false) && config.color.unwrap_or(true);
        Self {
            file: config.file.unwrap_or_else(|| {
                eprintln!("no file specified");
                std::process::exit(1);
            }),
            debug,
            color,
            echo_source: config.echo_source.unwrap_or(true),
        }
    }
}
