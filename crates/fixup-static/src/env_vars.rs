/// Declares all environment variable used throughout `fixup` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// Equivalent to the `<MANIFEST>` argument of `fixup fix`, `fixup verify` and
    /// `fixup classify`. The path to the bundle manifest written by the packaging step.
    pub const FIXUP_MANIFEST: &'static str = "FIXUP_MANIFEST";

    /// Equivalent to the `--jobs` command-line argument. The maximum number of binaries
    /// rewritten concurrently during the patch pass.
    pub const FIXUP_CONCURRENT_PATCHES: &'static str = "FIXUP_CONCURRENT_PATCHES";

    /// Equivalent to the `--reader` command-line argument. Selects how load commands are read
    /// from Mach-O binaries (`otool` or `native`).
    pub const FIXUP_READER: &'static str = "FIXUP_READER";

    /// Equivalent to the `--adhoc-sign` command-line argument. If set, every rewritten binary is
    /// re-signed with an ad-hoc signature.
    pub const FIXUP_ADHOC_SIGN: &'static str = "FIXUP_ADHOC_SIGN";

    /// Equivalent to the `--allow-framework` command-line argument. A space-separated list of
    /// framework name prefixes that may be referenced outside the build tree.
    pub const FIXUP_ALLOW_FRAMEWORK: &'static str = "FIXUP_ALLOW_FRAMEWORK";

    /// Equivalent to the `--allow-unresolved` command-line argument. A space-separated list of
    /// binary names whose absolute references are left untouched.
    pub const FIXUP_ALLOW_UNRESOLVED: &'static str = "FIXUP_ALLOW_UNRESOLVED";

    /// Equivalent to the `--platform` command-line argument.
    pub const FIXUP_PLATFORM: &'static str = "FIXUP_PLATFORM";

    /// Path to the `otool` executable used to read load commands.
    pub const FIXUP_OTOOL: &'static str = "FIXUP_OTOOL";

    /// Path to the `install_name_tool` executable used to rewrite load commands.
    pub const FIXUP_INSTALL_NAME_TOOL: &'static str = "FIXUP_INSTALL_NAME_TOOL";

    /// Used to set the log level of the `tracing` subscriber.
    pub const RUST_LOG: &'static str = "RUST_LOG";

    /// Disables colored output, see <https://no-color.org>.
    pub const NO_COLOR: &'static str = "NO_COLOR";
}
