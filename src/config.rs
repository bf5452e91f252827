//! Command-line configuration.
//!
//! There is no config file and no environment-variable override — `clap`
//! only parses `std::env::args()`.

use clap::{Arg, Command};

fn validate_capacity_value(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| "Invalid resequencer capacity".to_owned())
        .and_then(|v| {
            if v == 0 {
                Err("Resequencer capacity must be positive".to_owned())
            } else {
                Ok(v)
            }
        })
}

fn validate_sequence_index_value(value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| "Invalid sequence index".to_owned())
}

fn validate_port_value(value: &str) -> Result<u16, String> {
    value.parse::<u16>().map_err(|_| "Invalid port number".to_owned())
}

fn validate_max_procs_value(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| "Invalid max_procs value".to_owned())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub resequencer_type: String,
    pub resequencer_capacity: usize,
    pub sequence_index: u64,
    pub event_source_port: u16,
    pub client_port: u16,
    pub max_procs: usize,
}

impl Config {
    pub fn parse_args() -> Self {
        let matches = Command::new("Followers Maze")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Reorders an unordered event-source stream by sequence number and dispatches it to subscribers by follower graph")
            .arg(
                Arg::new("resequencer_type")
                    .help("Resequencer type: 'batch' or 'stream'. Any other value falls back to 'stream'")
                    .long("resequencer-type")
                    .default_value("stream"),
            )
            .arg(
                Arg::new("resequencer_capacity")
                    .help("Resequencer capacity. Only used by the batch resequencer")
                    .long("resequencer-capacity")
                    .value_parser(validate_capacity_value)
                    .default_value("100"),
            )
            .arg(
                Arg::new("sequence_index")
                    .help("Last known sequence number. The stream resequencer starts resequencing from sequence_index + 1")
                    .long("sequence-index")
                    .value_parser(validate_sequence_index_value)
                    .default_value("0"),
            )
            .arg(
                Arg::new("event_source_port")
                    .help("Port the event source connects to")
                    .long("event-source-port")
                    .value_parser(validate_port_value)
                    .default_value("9090"),
            )
            .arg(
                Arg::new("client_port")
                    .help("Port subscribers connect to")
                    .long("client-port")
                    .value_parser(validate_port_value)
                    .default_value("9099"),
            )
            .arg(
                Arg::new("max_procs")
                    .help("Max number of OS threads the runtime may use concurrently")
                    .long("max-procs")
                    .value_parser(validate_max_procs_value)
                    .default_value("1"),
            )
            .get_matches();

        Config {
            resequencer_type: matches
                .get_one::<String>("resequencer_type")
                .expect("resequencer_type has a default")
                .clone(),
            resequencer_capacity: *matches
                .get_one::<usize>("resequencer_capacity")
                .expect("resequencer_capacity has a default"),
            sequence_index: *matches
                .get_one::<u64>("sequence_index")
                .expect("sequence_index has a default"),
            event_source_port: *matches
                .get_one::<u16>("event_source_port")
                .expect("event_source_port has a default"),
            client_port: *matches
                .get_one::<u16>("client_port")
                .expect("client_port has a default"),
            max_procs: *matches
                .get_one::<usize>("max_procs")
                .expect("max_procs has a default"),
        }
    }
}
