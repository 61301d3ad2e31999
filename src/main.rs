use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use procwatch::commands;
use procwatch::core::config::Config;

fn build_cli() -> Command {
    Command::new("procwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Process list and per-process memory monitor")
        .subcommand(
            Command::new("list")
                .about("List processes once, filtered and sorted")
                .arg(
                    Arg::new("filter")
                        .short('f')
                        .long("filter")
                        .value_name("TEXT")
                        .help("Match name, PID, thread count or memory MB"),
                )
                .arg(
                    Arg::new("pid")
                        .long("pid")
                        .value_name("PREFIX")
                        .help("Only PIDs starting with this prefix"),
                )
                .arg(Arg::new("min-threads").long("min-threads").value_name("N"))
                .arg(Arg::new("max-threads").long("max-threads").value_name("N"))
                .arg(Arg::new("min-mem").long("min-mem").value_name("MB"))
                .arg(Arg::new("max-mem").long("max-mem").value_name("MB"))
                .arg(
                    Arg::new("sort")
                        .short('s')
                        .long("sort")
                        .value_name("KEY")
                        .help("Sort by name, memory, pid or threads"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the list as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Sample the memory of one or more processes until they exit")
                .arg(
                    Arg::new("pids")
                        .help("Process IDs to monitor")
                        .required(true)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Sampling interval in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECS")
                        .help("Stop after this many seconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("details")
                .about("Show threads and modules of a process")
                .arg(pid_arg()),
        )
        .subcommand(
            Command::new("priority")
                .about("Set the priority class of a process")
                .arg(pid_arg())
                .arg(
                    Arg::new("class")
                        .help("Idle, BelowNormal, Normal, AboveNormal, High or RealTime")
                        .required(true)
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("kill")
                .about("Terminate a process")
                .arg(pid_arg()),
        )
        .subcommand(
            Command::new("tui")
                .about("Interactive process monitor (default)")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Auto-refresh interval in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("auto-refresh")
                        .short('a')
                        .long("auto-refresh")
                        .help("Start with auto-refresh enabled")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn pid_arg() -> Arg {
    Arg::new("pid")
        .help("Process ID")
        .required(true)
        .index(1)
        .value_parser(clap::value_parser!(u32))
}

fn main() -> Result<()> {
    procwatch::init_logging();

    let matches = build_cli().get_matches();
    let config = Config::load()?;

    match matches.subcommand() {
        Some(("list", sub_matches)) => commands::list::execute(sub_matches, config),
        Some(("watch", sub_matches)) => commands::watch::execute(sub_matches, config),
        Some(("details", sub_matches)) => commands::details::execute(sub_matches),
        Some(("priority", sub_matches)) => commands::priority::execute(sub_matches),
        Some(("kill", sub_matches)) => commands::kill::execute(sub_matches),
        Some(("tui", sub_matches)) => commands::tui::execute(Some(sub_matches), config),
        _ => commands::tui::execute(None, config),
    }
}
