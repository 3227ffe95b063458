use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::net::TcpStream;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};

use vista_geocode::GeocodeClient;
use vista_log::{LogConfig, init_logging};
use vista_protocol::{BridgeRead, Coordinate, Marker, ProtocolError};
use vista_schema::Validatable;

mod cache;
mod config;
mod controller;
mod location;
mod transport;

use cache::ViewStateCache;
use config::Config;
use controller::{ControllerOptions, HostEvent, MapController};
use location::{EnvLocationProvider, LocationProvider};
use transport::SocketTransport;

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
        .unwrap_or_else(|| "./vista_host.json".to_string())
}

/// Vista Host - rental marketplace map screen driver
#[derive(Parser, Debug)]
#[command(name = "vista_host")]
#[command(author = "Vista Project")]
#[command(version = VERSION)]
#[command(about = "Drives a map screen against a running Vista map runtime", long_about = None)]
struct Args {
    /// Path to configuration file (JSON)
    #[arg(short, long, default_value_t = default_config_path())]
    config: String,

    /// Screen identifier scoping the cached view state
    #[arg(long, default_value = "search")]
    screen: String,

    /// Restore the cached view when remounting this screen
    #[arg(long, env = "VISTA_RESTORE_VIEW")]
    restore: bool,

    /// Enable logging to file (vista_host.log in current directory)
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
        let file = std::fs::File::create("vista_host.log").expect("Unable to create vista_host.log");
        LogConfig::new("vista_host::")
            .with_level(log_level)
            .with_log_file(file)
    } else {
        LogConfig::<std::fs::File>::new("vista_host::").with_level(log_level)
    };

    init_logging(log_config).expect("Failed to initialize logging");

    info!("Vista Host v{}", VERSION);
    info!("Configuration: {}", args.config);
    info!("Screen: {} (restore: {})", args.screen, args.restore);

    // Device location, queried once at mount; denial degrades to the
    // configured initial coordinates
    let initial_center = EnvLocationProvider
        .current_location()
        .unwrap_or_else(|| Coordinate::new(config.initial_lng, config.initial_lat));

    let stream = match TcpStream::connect(&config.runtime_addr).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to connect to map runtime at {}: {}", config.runtime_addr, e);
            std::process::exit(1);
        }
    };
    info!("Connected to map runtime at {}", config.runtime_addr);

    let (mut read_half, write_half) = stream.into_split();
    let transport = SocketTransport::spawn(write_half);

    // Reader task feeding inbound runtime messages to the event loop
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

    let cache = ViewStateCache::new();
    let mut controller = MapController::new(
        Box::new(transport),
        GeocodeClient::new(&config.geocoder_endpoint),
        cache,
        ControllerOptions {
            screen_id: Some(args.screen.clone()),
            restore_view: args.restore,
            initial_center,
            initial_zoom: config.initial_zoom,
            ready_timeout: config.ready_timeout.as_duration(),
        },
    );

    controller.mount();
    controller.set_markers(demo_markers());

    let mut poll = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            _ = poll.tick() => {
                if let Some(event) = controller.check_ready_deadline(Instant::now()) {
                    info!(screen = %args.screen, "Bridge event: {:?}", event);
                }
            }
            inbound = inbound_rx.recv() => {
                let Some(message) = inbound else {
                    info!("Map runtime disconnected");
                    break;
                };
                if let Some(event) = controller.handle_message(message) {
                    react(&mut controller, &args.screen, event);
                }
            }
        }
    }

    controller.detach();
    reader.abort();
}

/// Demo reaction policy: highlight tapped markers, clear on empty taps
/// and resolve their address over the host's own network path
fn react(controller: &mut MapController, screen: &str, event: HostEvent) {
    match &event {
        HostEvent::StatusChanged(status) => {
            info!(screen = %screen, "Bridge status: {:?}", status);
        }
        HostEvent::MarkerClick { id, .. } => {
            info!(screen = %screen, "Listing tapped: {}", id);
            controller.highlight_marker(Some(id.as_str()));
        }
        HostEvent::MapClick { lng_lat } => {
            info!(screen = %screen, "Map tapped at {}", lng_lat);
            controller.highlight_marker(None);

            // Fire-and-forget: the result is logged whenever it arrives
            let geocoder = controller.geocoder().clone();
            let coordinates = *lng_lat;
            tokio::spawn(async move {
                match geocoder.reverse(coordinates).await {
                    Some(address) => info!("Host-side lookup: {}", address.label),
                    None => info!("Host-side lookup produced no address"),
                }
            });
        }
        HostEvent::ClusterClick { leaves } => {
            info!(screen = %screen, "Cluster tapped: {} listings", leaves.len());
        }
        HostEvent::AddressResolved { address, .. } => {
            info!(screen = %screen, "Runtime resolved address: {}", address.label);
        }
        HostEvent::RegionChanged(view) => {
            debug!(screen = %screen, "Region: {} z{:.1}", view.center, view.zoom);
        }
    }
}

/// Sample listings around the Eixample, enough to form a cluster at
/// city zoom
fn demo_markers() -> Vec<Marker> {
    let listings = [
        ("lst-1024", 2.1700, 41.3870, "1.250 €"),
        ("lst-1031", 2.1712, 41.3881, "980 €"),
        ("lst-1039", 2.1689, 41.3859, "1.400 €"),
        ("lst-1055", 2.1920, 41.4036, "870 €"),
        ("lst-1078", 2.1344, 41.3762, "1.150 €"),
    ];

    listings
        .into_iter()
        .map(|(id, lng, lat, price)| Marker {
            id: id.to_string(),
            coordinates: Coordinate::new(lng, lat),
            price_label: price.to_string(),
        })
        .collect()
}
