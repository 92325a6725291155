use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand};

use fixup_bundle::{Backend, PlatformOptions, ReaderKind};
use fixup_static::EnvVars;

// Configures Clap v3-style help menu colors
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser)]
#[command(name = "fixup", author, version)]
#[command(about = "Make an application bundle self-contained by copying in its dependencies and relinking its binaries.")]
#[command(propagate_version = true)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Global options", next_display_order = 1000)]
pub struct GlobalArgs {
    /// Do not print any output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use verbose output.
    ///
    /// Repeat (`-vv`) to show the decisions of both phases as a tree of spans. You can configure
    /// fine-grained logging using the `RUST_LOG` environment variable.
    /// (<https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives>)
    #[arg(global = true, action = clap::ArgAction::Count, long, short, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Control colors in output.
    #[arg(
        global = true,
        long,
        value_enum,
        default_value = "auto",
        value_name = "COLOR_CHOICE"
    )]
    pub color: ColorChoice,

    /// The operating system whose bundle conventions apply.
    ///
    /// Defaults to the current operating system. Only `darwin` bundles can be fixed up.
    #[arg(global = true, long, value_enum, env = EnvVars::FIXUP_PLATFORM)]
    pub platform: Option<Backend>,
}

#[derive(Debug, Copy, Clone, clap::ValueEnum)]
pub enum ColorChoice {
    /// Enables colored output only when the output is going to a terminal or TTY with support.
    Auto,

    /// Enables colored output regardless of the detected environment.
    Always,

    /// Disables colored output.
    Never,
}

impl From<ColorChoice> for anstream::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => Self::Auto,
            ColorChoice::Always => Self::Always,
            ColorChoice::Never => Self::Never,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy the missing dependencies into the bundle, then rewrite every binary to reference only
    /// the bundle.
    Fix(FixArgs),

    /// Report the rewrites the bundle still needs, without changing anything.
    ///
    /// Exits with status 1 if any binary still needs to be rewritten.
    Verify(VerifyArgs),

    /// Print the install name, dependencies, and search paths of binaries.
    Inspect(InspectArgs),

    /// Print where references would be placed in the bundle.
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FixArgs {
    /// The bundle manifest written by the packaging step.
    #[arg(env = EnvVars::FIXUP_MANIFEST)]
    pub manifest: PathBuf,

    /// Copy the dependencies, but only report the rewrites instead of applying them.
    #[arg(long)]
    pub dry_run: bool,

    /// The maximum number of binaries to rewrite at once.
    ///
    /// Defaults to the number of available CPUs.
    #[arg(long, short, env = EnvVars::FIXUP_CONCURRENT_PATCHES, value_name = "JOBS")]
    pub jobs: Option<NonZeroUsize>,

    /// Re-sign every rewritten binary with an ad-hoc signature.
    ///
    /// Rewriting a binary invalidates its signature, which arm64 macOS refuses to load.
    #[arg(
        long,
        env = EnvVars::FIXUP_ADHOC_SIGN,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub adhoc_sign: bool,

    #[command(flatten)]
    pub bundle: BundleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// The bundle manifest written by the packaging step.
    #[arg(env = EnvVars::FIXUP_MANIFEST)]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub bundle: BundleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// The binaries to inspect.
    #[arg(required = true)]
    pub binaries: Vec<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// The bundle manifest written by the packaging step.
    #[arg(env = EnvVars::FIXUP_MANIFEST)]
    pub manifest: PathBuf,

    /// The dependency references to classify, as found in the load commands of a binary.
    #[arg(required = true)]
    pub references: Vec<String>,

    #[command(flatten)]
    pub bundle: BundleArgs,
}

/// The tools used to read and rewrite binaries.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// How to read load commands from binaries.
    #[arg(long, value_enum, default_value_t, env = EnvVars::FIXUP_READER)]
    pub reader: ReaderKind,

    /// The `otool` executable to use.
    #[arg(long, env = EnvVars::FIXUP_OTOOL, hide = true)]
    pub otool: Option<PathBuf>,

    /// The `install_name_tool` executable to use.
    #[arg(long, env = EnvVars::FIXUP_INSTALL_NAME_TOOL, hide = true)]
    pub install_name_tool: Option<PathBuf>,
}

/// The policy for references that leave the build trees.
#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    /// A framework name prefix that may be referenced from outside the build trees.
    ///
    /// May be provided multiple times, or as a space-separated list. Defaults to `Qt`.
    #[arg(
        long,
        env = EnvVars::FIXUP_ALLOW_FRAMEWORK,
        value_delimiter = ' ',
        value_name = "PREFIX"
    )]
    pub allow_framework: Vec<String>,

    /// A binary whose absolute references are left as-is, matched against its path.
    ///
    /// May be provided multiple times, or as a space-separated list. Defaults to the Qt SQL
    /// drivers whose client libraries are installed separately (`libqsqlpsql`, `libqsqlmysql`).
    #[arg(
        long,
        env = EnvVars::FIXUP_ALLOW_UNRESOLVED,
        value_delimiter = ' ',
        value_name = "NAME"
    )]
    pub allow_unresolved: Vec<String>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

impl BundleArgs {
    /// Resolve the platform options, keeping the defaults for lists that were not provided.
    pub fn options(self, adhoc_sign: bool) -> PlatformOptions {
        let defaults = PlatformOptions::default();
        PlatformOptions {
            reader: self.tools.reader,
            otool: self.tools.otool,
            install_name_tool: self.tools.install_name_tool,
            adhoc_sign,
            allow_frameworks: non_empty_or(self.allow_framework, defaults.allow_frameworks),
            allow_unresolved: non_empty_or(self.allow_unresolved, defaults.allow_unresolved),
        }
    }
}

fn non_empty_or(values: Vec<String>, default: Vec<String>) -> Vec<String> {
    let values: Vec<String> = values
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect();
    if values.is_empty() { default } else { values }
}
