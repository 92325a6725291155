use std::process::ExitCode;

use fixup::main as fixup_main;

fn main() -> ExitCode {
    fixup_main(std::env::args_os())
}
