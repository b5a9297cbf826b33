//! Shell completions command

use crate::Cli;
use clap::CommandFactory;
use clap_complete::Shell;

/// Generate completions for the given shell on stdout.
pub fn completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "scour", &mut std::io::stdout());
}
