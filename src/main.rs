//! dedupe - duplicate file finder with xattr-cached hashes
//!
//! Entry point for the dedupe CLI.

use dedupe::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse_ordered();
    let json_errors = cli.json_errors;

    match dedupe::run_app(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            log::error!("{err:#}");

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                match serde_json::to_string_pretty(&structured) {
                    Ok(json) => eprintln!("{json}"),
                    Err(_) => eprintln!("[{}] Error: {err:#}", exit_code.code_prefix()),
                }
            } else {
                eprintln!("[{}] Error: {err:#}", exit_code.code_prefix());
            }

            exit_code.into()
        }
    }
}
