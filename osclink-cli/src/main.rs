mod args;

use std::io;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use osclink_net::{ClientConfig, Config, OscClient, OscServer, ServerConfig};
use osclink_types::{pool, Bundle, Message, Timestamp};

use args::{Cli, Command};

/// How long `send` waits for the queue to drain before giving up.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    if let Err(e) = TermLogger::init(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("osclink: logging unavailable: {}", e);
        return;
    }

    log::info!("osclink starting (log level: {:?})", log_level);
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match args::parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("osclink: {}\n\n{}", e, args::USAGE);
            return ExitCode::from(2);
        }
    };
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("osclink: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> io::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    // before any message or copied blob rents from the pools
    if let Err(e) = pool::configure(config.value_pool(), config.byte_pool()) {
        log::warn!("{}", e);
    }

    match cli.command {
        Command::Send {
            address,
            values,
            host,
            port,
            bundle,
        } => {
            let mut client_config = config.client();
            if let Some(host) = host {
                client_config.address = host;
            }
            if let Some(port) = port {
                client_config.port = port;
            }
            send(client_config, Message::new(address, values), bundle)
        }
        Command::Listen { port, count } => {
            let mut server_config = config.server();
            if let Some(port) = port {
                server_config.port = port;
            }
            listen(server_config, count)
        }
        Command::Help => {
            println!("{}", args::USAGE);
            Ok(())
        }
    }
}

fn send(config: ClientConfig, msg: Message, bundle: bool) -> io::Result<()> {
    let mut client = OscClient::new(config);
    client.start()?;

    if bundle {
        let mut wrapper = Bundle::with_timestamp(Timestamp::now());
        wrapper.add_message(msg);
        client.send_bundle(wrapper);
    } else {
        client.send_message(msg);
    }

    let started = Instant::now();
    while client.pending() > 0 && started.elapsed() < FLUSH_TIMEOUT {
        std::thread::sleep(Duration::from_millis(1));
    }
    // stop joins the worker after the packet it is holding
    client.stop();

    if client.pending() > 0 {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "packet was still queued when the flush timeout expired",
        ));
    }
    Ok(())
}

fn listen(config: ServerConfig, count: Option<usize>) -> io::Result<()> {
    let server = OscServer::bind(config)?;
    eprintln!("listening on {}", server.local_addr());

    let mut received = 0;
    while count.map_or(true, |n| received < n) {
        if let Some(msg) = server.dequeue_timeout(Duration::from_millis(500)) {
            println!("{}", msg);
            received += 1;
        }
    }
    Ok(())
}
