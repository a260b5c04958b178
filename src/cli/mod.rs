pub mod actions;
pub mod config;
pub mod console;

use clap::{Arg, ArgMatches, Command};

/// Command line definition, shared by `parse_args` and the tests.
pub fn build_command() -> Command {
    Command::new("serial-chat")
        .about("Interactive terminal-to-serial gateway")
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port to open (default: /dev/serial0)")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .help("Serial port baud rate; invalid values fall back to 9600")
                .value_name("BAUD"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .help("Read and write timeout in milliseconds (default: 500)")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Load configuration from JSON file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Print --list-ports output as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write detailed logs to the specified file (overrides SERIAL_CHAT_LOG_FILE)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored console output")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}
