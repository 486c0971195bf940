use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use log::warn;

use idtech4query::config::{QueryConfig, DEFAULT_PORT};
use idtech4query::packet::ProtocolVariant;
use idtech4query::query::query;

/// List the game servers registered with an idTech4 master server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address of a custom idTech4 master server (default depends on --protocol)
    #[arg(long = "ip", default_value = "")]
    master: String,

    /// Port of the master server
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Only list servers running this mod
    #[arg(long = "mod", default_value = "")]
    mod_filter: String,

    /// Protocol to query with (0: Doom 3 & Prey, 1: Quake 4, 2: DHEWM3)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    protocol: i64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let (protocol, coerced) = ProtocolVariant::from_selector(args.protocol);
    if coerced {
        warn!("unknown protocol {}, using {}", args.protocol, protocol);
    }

    let config = QueryConfig::new(Some(args.master), protocol)
        .with_port(args.port)
        .with_mod_filter(args.mod_filter);

    println!("==========================");
    println!("idTech4 MasterServer Query Tool");
    println!();
    println!("Settings:");
    println!("- MasterServer Address: {}", config.master);
    println!("- Port: {}", config.port);
    if coerced {
        println!("- Protocol: Unknown choice, reverting to {}.", protocol);
    } else {
        println!("- Protocol: {}", protocol);
    }
    if !config.mod_filter.is_empty() {
        println!("- Mod: {}", config.mod_filter);
    }
    println!("==========================");

    let list = match query(&config).await {
        Ok(list) => list,
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    for server in &list {
        println!("{server}");
    }
    println!("There are {} servers found.", list.len());

    ExitCode::SUCCESS
}
