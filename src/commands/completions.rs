//! Implementation of the `completions` subcommand: emits shell completion scripts
//! for the command surface.

use clap::CommandFactory;
use clap::Parser;
use clap_complete::Shell;
use clap_complete::generate;

/// Arguments for the `completions` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The shell to generate completions for.
    pub shell: Shell,
}

/// Writes a completion script for `args.shell` to stdout.
pub fn completions<C: CommandFactory>(args: Args) {
    let mut command = C::command();
    let name = command.get_name().to_owned();
    generate(args.shell, &mut command, name, &mut std::io::stdout());
}
