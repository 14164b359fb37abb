// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! bldctl - BLD multicast test sender and publisher runner
//!
//! `raw` checks the network path with a plain datagram, `publish` drives a
//! publisher instance from simulated PVs, `show` prints a configuration.

use bld::config::{FIDUCIAL_MASK, FIDUCIAL_UNTRACKED, MAX_INSTANCES};
use bld::loaders::YamlLoader;
use bld::transport::iface::list_interfaces;
use bld::wire::{DoubleArray, PayloadRegistry};
use bld::{
    InterfaceSpec, MemoryPvStore, MulticastFactory, MulticastTransport, PacketEncoder, Publisher,
    PublisherConfig, Timestamp, TtlConfig,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::*;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Test datagram of the network client check (NUL-terminated).
const RAW_TEST_MESSAGE: &[u8] = b"MULTICAST BLD TEST\0";

/// Datagram size of the raw test.
const RAW_MAX_DATAGRAM: usize = 256;

/// First value of the raw loop fill pattern.
const RAW_FIRST_VALUE: i32 = 1000;

/// GMD pulse energy schema, registered at startup.
const GMD_PHYSICAL_ID: u32 = 19;
const GMD_DATA_TYPE: u32 = 36;
const GMD_PAYLOAD_BYTES: usize = 6 * 8;

/// Fiducial step between 120 Hz pulses on a 360 Hz timing base.
const FIDUCIAL_STEP: u32 = 3;

/// BLD multicast test sender and publisher runner
#[derive(Parser, Debug)]
#[command(name = "bldctl")]
#[command(version)]
#[command(about = "Send BLD test datagrams and run BLD publishers")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Multicast TTL (default: YAML `ttl`, BLD_MULTICAST_TTL or 32)
    #[arg(long, global = true)]
    ttl: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Send a raw test datagram to a multicast group
    Raw {
        #[arg(short, long, default_value = "239.255.0.1")]
        addr: Ipv4Addr,

        #[arg(short, long, default_value = "50000")]
        port: u16,

        /// Egress interface, by address or name
        #[arg(short, long)]
        interface: Option<InterfaceSpec>,

        /// Send an incrementing integer pattern instead of the test message
        #[arg(long = "loop")]
        repeat: bool,

        /// Datagrams to send in loop mode (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value = "10")]
        count: u64,

        /// Delay between loop datagrams in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
    /// Run a publisher instance against simulated PVs
    Publish {
        #[command(flatten)]
        source: ConfigSource,

        /// Pulses to publish (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value = "120")]
        count: u64,

        /// Delay between pulses in milliseconds
        #[arg(long, default_value = "8")]
        interval_ms: u64,

        /// Publisher debug level
        #[arg(short, long, default_value = "0")]
        debug: i32,
    },
    /// Print an instance configuration and the local interfaces
    Show {
        #[command(flatten)]
        source: ConfigSource,
    },
}

/// Instance configuration, from a YAML file or from arguments.
#[derive(ClapArgs, Debug)]
struct ConfigSource {
    /// YAML instance file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Instance id in the YAML file
    #[arg(long, default_value = "0")]
    instance: usize,

    #[arg(long, default_value = "239.255.24.2")]
    addr: String,

    #[arg(long, default_value = "10148")]
    port: u16,

    /// Largest payload in bytes
    #[arg(long, default_value = "64")]
    max_payload: usize,

    /// Egress interface, by address or name
    #[arg(long, default_value = "")]
    interface: String,

    #[arg(long, default_value_t = GMD_PHYSICAL_ID)]
    physical_id: u32,

    #[arg(long, default_value_t = GMD_DATA_TYPE)]
    data_type: u32,

    #[arg(long, default_value = "")]
    pre_trigger: String,

    #[arg(long, default_value = "")]
    post_trigger: String,

    /// Fiducial PV (empty: untracked)
    #[arg(long, default_value = "EVR:FIDUCIAL")]
    fiducial_pv: String,

    /// PV list, separated by spaces, commas or semicolons
    #[arg(long, default_value = "GMD:E1 GMD:E2 GMD:E3 GMD:E4 GMD:E5 GMD:E6")]
    pvs: String,
}

impl ConfigSource {
    /// Instance configuration, and the TTL of the YAML file if one is used.
    fn load(&self) -> bld::Result<(PublisherConfig, Option<TtlConfig>)> {
        match &self.config {
            Some(path) => {
                let doc = YamlLoader::load_from_file(path)?;
                let config = YamlLoader::instance_config(&doc, self.instance)?;
                Ok((config, doc.ttl.map(TtlConfig::custom)))
            }
            None => {
                let config = PublisherConfig::from_shell_args(
                    &self.addr,
                    self.port,
                    self.max_payload,
                    &self.interface,
                    self.physical_id,
                    self.data_type,
                    &self.pre_trigger,
                    &self.post_trigger,
                    &self.fiducial_pv,
                    &self.pvs,
                );
                Ok((config, None))
            }
        }
    }
}

fn main() {
    // Initialize logger for RUST_LOG-based debug output
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let cli_ttl = args.ttl.map(TtlConfig::custom);
    let ttl = resolve_ttl(cli_ttl, None);
    register_gmd();

    match &args.mode {
        Mode::Raw {
            addr,
            port,
            interface,
            repeat,
            count,
            interval_ms,
        } => {
            let dest = SocketAddrV4::new(*addr, *port);
            let transport =
                MulticastTransport::open(dest, RAW_MAX_DATAGRAM, ttl.multicast, interface.as_ref())?;
            if *repeat {
                run_raw_loop(&transport, *count, *interval_ms, &running)
            } else {
                println!(
                    "Bld send to {} Data String: {}",
                    dest,
                    String::from_utf8_lossy(&RAW_TEST_MESSAGE[..RAW_TEST_MESSAGE.len() - 1])
                );
                transport.send(RAW_TEST_MESSAGE)?;
                println!("{}", "[OK]".green());
                Ok(())
            }
        }
        Mode::Publish {
            source,
            count,
            interval_ms,
            debug,
        } => {
            let (config, file_ttl) = source.load()?;
            let ttl = resolve_ttl(cli_ttl, file_ttl);
            run_publish(config, ttl, *count, *interval_ms, *debug, &running)
        }
        Mode::Show { source } => {
            let (config, file_ttl) = source.load()?;
            let ttl = resolve_ttl(cli_ttl, file_ttl);
            let mut publisher = demo_publisher(ttl);
            publisher.configure(config)?;
            println!("{}", publisher.show_config());
            println!();
            println!("Instances available: {}", MAX_INSTANCES);
            println!("Multicast TTL: {}", ttl.multicast);
            println!("Interfaces:");
            for (name, addr) in list_interfaces() {
                println!("  {:16} {}", name, addr);
            }
            Ok(())
        }
    }
}

/// `--ttl` wins over the YAML file, which wins over the environment.
fn resolve_ttl(cli: Option<TtlConfig>, file: Option<TtlConfig>) -> TtlConfig {
    cli.or(file).unwrap_or_else(TtlConfig::from_env)
}

fn register_gmd() {
    let registered = PayloadRegistry::global().register(
        GMD_PHYSICAL_ID,
        GMD_DATA_TYPE,
        GMD_PAYLOAD_BYTES,
        Arc::new(DoubleArray),
    );
    log::debug!("GMD schema registered: {}", registered);
}

fn demo_publisher(ttl: TtlConfig) -> Publisher {
    Publisher::new(0, MulticastFactory::new(ttl), PacketEncoder::default())
}

/// Fill the datagram with one repeated i32, incremented each send.
fn run_raw_loop(
    transport: &MulticastTransport,
    count: u64,
    interval_ms: u64,
    running: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Beginning Multicast Client Testing...");
    let mut data = vec![0u8; RAW_MAX_DATAGRAM];
    let mut value = RAW_FIRST_VALUE;
    let mut sent = 0u64;
    while running.load(Ordering::SeqCst) && (count == 0 || sent < count) {
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        println!("Bld send to {} Value {}", transport.destination(), value);
        if let Err(e) = transport.send(&data) {
            eprintln!("{} {}", "*** Send Fail".red(), e);
            return Err(e.into());
        }
        value = value.wrapping_add(1);
        sent += 1;
        std::thread::sleep(Duration::from_millis(interval_ms));
    }
    println!("{} {} datagram(s) sent", "[OK]".green(), sent);
    Ok(())
}

fn run_publish(
    config: PublisherConfig,
    ttl: TtlConfig,
    count: u64,
    interval_ms: u64,
    debug: i32,
    running: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pvs = MemoryPvStore::new();
    for name in &config.pv_names {
        pvs.set_double(name.as_str(), 0.0);
    }
    let mut publisher = demo_publisher(ttl);
    publisher.set_debug_level(debug);
    if let Some(trigger) = &config.pre_trigger {
        pvs.define_record(trigger, "0");
        pvs.define_record("BLD:PRE:HOOK", "");
        publisher.set_pre_hook("BLD:PRE:HOOK")?;
    }
    if let Some(trigger) = &config.post_trigger {
        pvs.define_record(trigger, "0");
        pvs.define_record("BLD:POST:HOOK", "");
        publisher.set_post_hook("BLD:POST:HOOK")?;
    }
    let fiducial_pv = config.fiducial_pv.clone();
    let names = config.pv_names.clone();

    publisher.configure(config)?;
    publisher.start(&pvs)?;
    println!("{}", publisher.show_config());

    let mut fiducial = 0u32;
    let mut pulse = 0u64;
    while running.load(Ordering::SeqCst) && (count == 0 || pulse < count) {
        fiducial = (fiducial + FIDUCIAL_STEP) % FIDUCIAL_UNTRACKED;
        if let Some(name) = &fiducial_pv {
            let now = Timestamp::now();
            let stamp = Timestamp::new(now.seconds, (now.nanoseconds & !FIDUCIAL_MASK) | fiducial);
            pvs.set_fiducial(name.as_str(), fiducial, stamp);
        }
        for (i, name) in names.iter().enumerate() {
            let value = (pulse as f64 * 0.05 + i as f64).sin() + 2.0;
            pvs.set_double(name.as_str(), value);
        }

        // Per-pulse failures are logged by the publisher; keep going.
        if publisher.prepare_cycle(&pvs).is_ok() {
            let _ = publisher.send_cycle(&pvs);
        }
        pulse += 1;
        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    publisher.stop(&pvs)?;
    let stats = publisher.stats();
    println!(
        "{} {} pulse(s): sent {}, duplicates {}, invalid {}, failures {}",
        "[OK]".green(),
        pulse,
        stats.sent,
        stats.duplicates,
        stats.invalid_fiducials,
        stats.failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ttl_precedence() {
        let cli = Some(TtlConfig::custom(9));
        let file = Some(TtlConfig::custom(4));
        assert_eq!(resolve_ttl(cli, file).multicast, 9);
        assert_eq!(resolve_ttl(None, file).multicast, 4);
    }

    #[test]
    fn test_yaml_ttl_reaches_publisher() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(
            b"ttl: 3\ninstances:\n  0:\n    address: 239.255.24.2\n    port: 10148\n    \
              max_payload: 64\n    physical_id: 1\n    data_type: 16\n    pvs: CAV:1\n",
        )
        .expect("Failed to write YAML");
        let path = file.path().to_path_buf();

        let args = Args::parse_from(["bldctl", "show", "--config", path.to_str().expect("utf-8")]);
        let Mode::Show { source } = &args.mode else {
            panic!("expected show");
        };
        let (config, file_ttl) = source.load().expect("yaml should load");
        let ttl = resolve_ttl(args.ttl.map(TtlConfig::custom), file_ttl);
        assert_eq!(ttl.multicast, 3);
        assert_eq!(config.physical_id, 1);
        assert_eq!(demo_publisher(ttl).factory().ttl().multicast, 3);
    }
}
