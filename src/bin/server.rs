use clap::{Arg, Command};
use tracing_subscriber::{fmt, EnvFilter};

use modb::catalog::Catalog;
use modb::server::{Server, ServerConfig, DEFAULT_PORT};

fn main() {
    let matches = Command::new("modb-server")
        .about("Minimal relational database with a line-oriented TCP protocol")
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("DIR")
                .default_value("./data")
                .help("Base directory holding one subdirectory per database"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDR")
                .default_value("127.0.0.1")
                .help("Host address to bind"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .default_value("3003")
                .help("Port to listen on"),
        )
        .get_matches();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let data_dir = matches.get_one::<String>("data").unwrap();
    let host = matches.get_one::<String>("host").unwrap();
    let port = matches
        .get_one::<String>("port")
        .unwrap()
        .parse::<u16>()
        .unwrap_or(DEFAULT_PORT);

    let catalog = match Catalog::new(data_dir) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Failed to open data directory {}: {}", data_dir, e);
            std::process::exit(1);
        }
    };

    let config = ServerConfig::new().host(host.clone()).port(port);
    let server = Server::new(config, catalog);
    if let Err(e) = server.start() {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
