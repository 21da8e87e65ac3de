use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

mod collectors;
pub mod trackers;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let cmd = Command::new("tracker_exporter")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(built_info::GIT_COMMIT_HASH.unwrap_or(env!("CARGO_PKG_VERSION")))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9100")
                .env("TRACKER_EXPORTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .help("Address to listen on, IPv4 or IPv6 [default: :: then 0.0.0.0]")
                .env("TRACKER_EXPORTER_LISTEN")
                .value_name("IP"),
        )
        .arg(
            Arg::new("http-timeout")
                .long("http-timeout")
                .help("Timeout in seconds for every tracker API request")
                .default_value("30")
                .env("TRACKER_EXPORTER_HTTP_TIMEOUT")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(clap::ArgAction::Count),
        );

    let cmd = trackers::add_tracker_args(cmd);

    collectors::add_collectors_args(cmd)
}
