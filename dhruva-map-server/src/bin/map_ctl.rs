//! CLI client for a running map server.
//!
//! # Usage
//!
//! ```bash
//! dhruva-map-ctl list
//! dhruva-map-ctl get
//! dhruva-map-ctl get-by-id hall
//! dhruva-map-ctl --address 192.168.68.101:5560 select hall
//! ```

use std::net::TcpStream;
use std::time::Duration;

use clap::{Parser, Subcommand};

use dhruva_map_server::Result;
use dhruva_map_server::io::{
    DEFAULT_MAX_FRAME_BYTES, OccupancyGridMsg, Request, Response, read_frame, write_frame,
};

/// Map server control client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Request gateway address
    #[arg(short, long, default_value = "127.0.0.1:5560")]
    address: String,

    /// Socket timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the active map
    Get,
    /// Fetch a map by id without changing the active one
    GetById { map_id: String },
    /// Make a map active
    Select { map_id: String },
    /// List loaded maps
    List,
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        match command {
            Command::Get => Request::GetMap,
            Command::GetById { map_id } => Request::GetMapById { map_id },
            Command::Select { map_id } => Request::SelectMap { map_id },
            Command::List => Request::ListMaps,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Send one request and print the response. Returns false on an error response.
fn run(args: Args) -> Result<bool> {
    let timeout = Some(Duration::from_secs(args.timeout.max(1)));
    let mut stream = TcpStream::connect(&args.address)?;
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;

    let request = Request::from(args.command);
    log::debug!("Sending {:?} to {}", request, args.address);
    write_frame(&mut stream, &request)?;

    let mut buf = Vec::new();
    let response: Response = read_frame(&mut stream, &mut buf, DEFAULT_MAX_FRAME_BYTES)?;
    Ok(print_response(&response))
}

fn print_response(response: &Response) -> bool {
    match response {
        Response::Map(msg) => print_map(msg),
        Response::Selected { map_id, changed } => {
            if *changed {
                println!("Active map is now [{}]", map_id);
            } else {
                println!("Map [{}] was already active", map_id);
            }
        }
        Response::MapList {
            active_map_id,
            maps,
        } => {
            println!(
                "{} map(s), active: {}",
                maps.len(),
                active_map_id.as_deref().unwrap_or("-")
            );
            for map in maps {
                println!(
                    "  {} {:<24} {:>5} x {:<5} @ {:.3} m/cell  frame={}",
                    if map.is_active { "*" } else { " " },
                    map.map_id,
                    map.width,
                    map.height,
                    map.resolution,
                    map.frame_id
                );
            }
        }
        Response::Error { kind, message } => {
            eprintln!("Server error ({:?}): {}", kind, message);
            return false;
        }
    }
    true
}

fn print_map(msg: &OccupancyGridMsg) {
    let info = &msg.info;
    let (unknown, free, occupied) = msg.cell_counts();
    println!("Map [{}] in frame '{}'", info.map_id, msg.header.frame_id);
    println!(
        "  Size:       {} x {} cells @ {:.3} m/cell ({:.2} x {:.2} m)",
        info.width,
        info.height,
        info.resolution,
        info.width as f64 * info.resolution,
        info.height as f64 * info.resolution
    );
    println!(
        "  Origin:     ({:.3}, {:.3}, {:.3})",
        info.origin.x, info.origin.y, info.origin.yaw
    );
    println!("  Loaded at:  {} us", info.load_time_us);
    println!(
        "  Cells:      {} free, {} occupied, {} unknown",
        free, occupied, unknown
    );
}
