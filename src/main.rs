use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use lemon_server::commands;

fn serve_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on (default: 8080)")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("port-positional")
                .value_name("PORT")
                .help("Port to listen on, same as --port")
                .value_parser(clap::value_parser!(u16))
                .conflicts_with("port")
                .index(1),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDR")
                .help("Address to bind (default: 0.0.0.0)"),
        )
        .arg(
            Arg::new("presentmon")
                .long("presentmon")
                .value_name("PATH")
                .help("Path to the PresentMon executable (default: search PATH)"),
        )
}

fn build_cli() -> Command {
    serve_args(
        Command::new("lemon-server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Local telemetry endpoint for hardware sensors and foreground frame rate")
            .args_conflicts_with_subcommands(true)
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Enable debug logging")
                    .global(true)
                    .action(clap::ArgAction::SetTrue),
            ),
    )
    .subcommand(serve_args(
        Command::new("serve").about("Serve the telemetry snapshot over HTTP (default)"),
    ))
    .subcommand(Command::new("print").about("Print the current hardware metrics once"))
    .subcommand(
        Command::new("config")
            .about("Show or change stored configuration")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommand(Command::new("show").about("Show the effective configuration"))
            .subcommand(
                Command::new("set-port").about("Set the listening port").arg(
                    Arg::new("port")
                        .help("Port number")
                        .required(true)
                        .value_parser(clap::value_parser!(u16))
                        .index(1),
                ),
            )
            .subcommand(
                Command::new("set-presentmon")
                    .about("Set the PresentMon executable path")
                    .arg(
                        Arg::new("path")
                            .help("Path to PresentMon")
                            .required(true)
                            .index(1),
                    ),
            ),
    )
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("serve", sub_matches)) => commands::serve(sub_matches),
        Some(("print", _)) => commands::print(),
        Some(("config", sub_matches)) => commands::config::handle_config(sub_matches),
        _ => commands::serve(matches),
    }
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    lemon_server::init_logging(matches.get_flag("verbose"));
    run(&matches)
}
