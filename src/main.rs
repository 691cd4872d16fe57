use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use hostwatch::commands;

fn cli() -> Command {
    Command::new("hostwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Host telemetry agent publishing system metrics over MQTT")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a JSON config file")
                .global(true),
        )
        .arg(
            Arg::new("broker-host")
                .long("broker-host")
                .value_name("HOST")
                .help("MQTT broker host (overrides BROKER_HOST)")
                .global(true),
        )
        .arg(
            Arg::new("broker-port")
                .long("broker-port")
                .value_name("PORT")
                .help("MQTT broker port (overrides BROKER_PORT)")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new("topic-prefix")
                .long("topic-prefix")
                .value_name("PREFIX")
                .help("Topic prefix, metrics go to <prefix>/<hostname>/metrics")
                .global(true),
        )
        .arg(
            Arg::new("hostname")
                .long("hostname")
                .value_name("NAME")
                .help("Host name to report instead of the OS one")
                .global(true),
        )
        .subcommand(Command::new("run").about("Sample and publish until interrupted (default)"))
        .subcommand(
            Command::new("snapshot")
                .about("Sample once and print the payload as JSON, without a broker")
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .help("Pretty-print the JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn dispatch(matches: &ArgMatches) -> Result<()> {
    let config = commands::load_config(matches)?;

    match matches.subcommand() {
        Some(("snapshot", sub_matches)) => commands::snapshot(&config, sub_matches.get_flag("pretty")),
        Some(("run", _)) | None => commands::run(config),
        Some((name, _)) => anyhow::bail!("Unknown command: {}", name),
    }
}

fn main() -> Result<()> {
    hostwatch::init_logging();
    let matches = cli().get_matches();
    dispatch(&matches)
}
