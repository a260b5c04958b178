use std::process::ExitCode;

use serial_chat::{boot, cli};

fn main() -> ExitCode {
    let matches = cli::parse_args();
    boot::init_logger(matches.get_one::<String>("log-file").map(String::as_str));

    match cli::actions::run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
