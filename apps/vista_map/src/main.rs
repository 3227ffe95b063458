use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};

use vista_geocode::GeocodeClient;
use vista_log::{LogConfig, init_logging};
use vista_protocol::{BridgeRead, BridgeWrite, ProtocolError, Result};
use vista_schema::Validatable;

mod camera;
mod config;
mod input;
mod layer;
mod runtime;
mod throttle;

use config::Config;
use input::{Gesture, parse_gesture};
use runtime::MapRuntime;

const VERSION: &str = "0.1.0";

/// Get default config path based on executable location
fn default_config_path() -> String {
    env::current_exe()
        .ok()
        .and_then(|exe_path| {
            let stem = exe_path.file_stem()?;
            let parent = exe_path.parent()?;
            Some(parent.join(stem).with_extension("json"))
        })
        .and_then(|path| path.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "./vista_map.json".to_string())
}

/// Vista Map Runtime - embedded map context for the rental marketplace
#[derive(Parser, Debug)]
#[command(name = "vista_map")]
#[command(author = "Vista Project")]
#[command(version = VERSION)]
#[command(about = "Embedded map runtime serving the Vista bridge", long_about = None)]
struct Args {
    /// Path to configuration file (JSON)
    #[arg(short, long, default_value_t = default_config_path())]
    config: String,

    /// Enable logging to file (vista_map.log in current directory)
    #[arg(long, env = "VISTA_LOG_FILE")]
    log_file: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load configuration first to get log level
    // We can't log errors yet, so we use eprintln! for early failures
    let config = if Path::new(&args.config).exists() {
        match Config::from_json_file(&args.config) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", args.config, e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Parse log level from config
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Warning: Invalid log level '{}', using INFO", config.log_level);
            Level::INFO
        }
    };

    // Setup logging with configured log level
    let log_config = if args.log_file {
        let file = std::fs::File::create("vista_map.log").expect("Unable to create vista_map.log");
        LogConfig::new("vista_map::")
            .with_level(log_level)
            .with_log_file(file)
    } else {
        LogConfig::<std::fs::File>::new("vista_map::").with_level(log_level)
    };

    init_logging(log_config).expect("Failed to initialize logging");

    info!("Vista Map Runtime v{}", VERSION);
    info!("Configuration: {}", args.config);

    let bind_addr = format!("{}:{}", config.local_ip, config.local_port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind bridge socket on {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    info!("Bridge socket listening on {}", bind_addr);
    info!("Gestures on stdin: click X Y | drag DLNG DLAT | end | quit");

    // One host session at a time; a reconnecting host gets a fresh runtime
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!(session = %addr, "Host connected");
                        match run_session(stream, addr, &config, &mut stdin).await {
                            Ok(()) => info!(session = %addr, "Session ended"),
                            Err(e) => warn!(session = %addr, "Session failed: {}", e),
                        }
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        }
    }
}

/// Drive one host session over an accepted bridge connection
async fn run_session(
    stream: TcpStream,
    addr: SocketAddr,
    config: &Config,
    stdin: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut runtime = MapRuntime::new(config);
    let geocoder = GeocodeClient::new(&config.geocoder_endpoint);

    // Reader task feeding inbound host commands to the session loop
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let max_frame_size = config.max_frame_size;
    let reader = tokio::spawn(async move {
        loop {
            match read_half.read_bridge_message_with_max_size(max_frame_size).await {
                Ok(message) => {
                    if inbound_tx.send(message).is_err() {
                        break;
                    }
                }
                Err(ProtocolError::Io(_)) | Err(ProtocolError::ConnectionClosed) => break,
                Err(e) => {
                    warn!("Dropping malformed bridge frame: {}", e);
                }
            }
        }
    });

    // Completed click-to-address lookups; failures never enter the channel
    let (lookup_tx, mut lookup_rx) = mpsc::unbounded_channel();

    // The inbound listener is attached; announce readiness
    for message in runtime.hello(Instant::now()) {
        write_half.write_bridge_message(&message).await?;
    }

    let mut stdin_open = true;
    let result = loop {
        tokio::select! {
            inbound = inbound_rx.recv() => {
                let Some(message) = inbound else {
                    debug!(session = %addr, "Host disconnected");
                    break Ok(());
                };
                for out in runtime.handle_host_message(message, Instant::now()) {
                    write_half.write_bridge_message(&out).await?;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match parse_gesture(line) {
                            Some(Gesture::Quit) => {
                                info!(session = %addr, "Quit requested");
                                break Ok(());
                            }
                            Some(gesture) => {
                                let outcome = runtime.handle_gesture(gesture, Instant::now());
                                for out in outcome.messages {
                                    write_half.write_bridge_message(&out).await?;
                                }
                                if let Some(coordinates) = outcome.lookup {
                                    let geocoder = geocoder.clone();
                                    let lookup_tx = lookup_tx.clone();
                                    tokio::spawn(async move {
                                        // A failed lookup stays silent
                                        if let Some(address) = geocoder.reverse(coordinates).await {
                                            let _ = lookup_tx.send((address, coordinates));
                                        }
                                    });
                                }
                            }
                            None => warn!("Unrecognized gesture line '{}'", line),
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed, gestures disabled");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        stdin_open = false;
                    }
                }
            }
            Some((address, coordinates)) = lookup_rx.recv() => {
                write_half
                    .write_bridge_message(&runtime.address_resolved(address, coordinates))
                    .await?;
            }
        }
    };

    reader.abort();
    result
}
