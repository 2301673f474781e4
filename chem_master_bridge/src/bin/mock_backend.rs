use chem_master_bridge::backend::{self, BackendServer, MainLoop};
use chem_master_bridge::config::{DEFAULT_LISTEN_ADDR, LISTEN_ADDR_ENV};
use chem_master_bridge::wire::{ErrorCode, ServerMessage};
use chem_master_bridge::{BackendOutbound, INBOUND_CAP, OUTBOUND_CAP};
use crossbeam_channel::bounded;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(33);

fn parse_arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let addr = parse_arg_value(&args, "--addr")
        .or_else(|| std::env::var(LISTEN_ADDR_ENV).ok())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let addr_file = parse_arg_value(&args, "--addr-file").map(PathBuf::from);
    let run_for_ms = parse_arg_value(&args, "--run-for-ms")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis);

    let (in_tx, in_rx) = bounded(INBOUND_CAP);
    let (out_tx, out_rx) = bounded(OUTBOUND_CAP);

    let server = match BackendServer::spawn(&addr, in_tx, out_rx) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "backend failed to start");
            std::process::exit(1);
        }
    };

    if let Some(path) = &addr_file {
        if let Err(e) = fs::write(path, server.listen_addr().to_string()) {
            tracing::warn!(path = %path.display(), error = %e, "could not write addr file");
        }
    }

    println!("mock_backend listening on ws://{}", server.listen_addr());

    let mut main_loop = backend::demo_reagent_info().into_iter().fold(
        MainLoop::new(in_rx, out_tx, backend::demo_snapshot()),
        |main_loop, (id, vars)| main_loop.with_reagent_info(id, vars),
    );

    let start = Instant::now();
    loop {
        main_loop.tick();
        thread::sleep(TICK);
        if let Some(max) = run_for_ms {
            if start.elapsed() >= max {
                break;
            }
        }
    }

    main_loop.try_send(BackendOutbound::Send {
        msg: ServerMessage::Error {
            msg: "server shutting down".to_string(),
            code: ErrorCode::InternalError,
        },
    });
    thread::sleep(TICK);
    server.shutdown();
}
