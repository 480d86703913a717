//! ODIN-W2 bring-up tool.
//!
//! Walks a factory-fresh module through the full station setup: reboot,
//! switch to extended data mode, write a Wi-Fi configuration, bring the
//! radio up, connect to a TCP peer, and run an echo traffic loop against it
//! (see the `echo-peer` binary for the other end).

use std::net::Ipv4Addr;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{error, info};

use odinw_client::{Ipv4Mode, OdinClient, SerialTransport, WifiAuth, WifiStationConfig};
use odinw_protocol::{DataMode, Expectation, MessageType};

/// Channels enabled once world mode is off: 2.4 GHz 1-13 plus the 5 GHz
/// UNII/ETSI set the module supports.
const CHANNEL_LIST: [u16; 29] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 36, 40, 44, 48, 52, 56, 60, 64, 100, 104, 108,
    112, 116, 132, 136, 140,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AuthArg {
    /// Open network.
    Open,
    /// WPA/WPA2 passphrase.
    Wpa,
}

impl From<AuthArg> for WifiAuth {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Open => WifiAuth::Open,
            AuthArg::Wpa => WifiAuth::Wpa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Ipv4ModeArg {
    /// Static address configuration.
    Static,
    /// DHCP.
    Dhcp,
}

impl From<Ipv4ModeArg> for Ipv4Mode {
    fn from(arg: Ipv4ModeArg) -> Self {
        match arg {
            Ipv4ModeArg::Static => Ipv4Mode::Static,
            Ipv4ModeArg::Dhcp => Ipv4Mode::Dhcp,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Configure an ODIN-W2 module as a Wi-Fi station and echo against a TCP peer")]
struct Args {
    /// Serial port the module is attached to.
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// Baud rate of the serial port.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Per-read serial timeout in milliseconds.
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Address of the TCP echo peer.
    #[arg(short = 's', long, default_value = "192.168.1.99")]
    host: Ipv4Addr,

    /// Port of the TCP echo peer.
    #[arg(short, long, default_value_t = 25000)]
    port: u16,

    /// Network SSID.
    #[arg(long, default_value = "SRBHA_OLA")]
    ssid: String,

    /// Authentication method.
    #[arg(long, value_enum, default_value_t = AuthArg::Wpa)]
    auth: AuthArg,

    /// WPA passphrase.
    #[arg(long, default_value = "12345678")]
    passphrase: String,

    /// IPv4 addressing mode.
    #[arg(long, value_enum, default_value_t = Ipv4ModeArg::Dhcp)]
    ipv4mode: Ipv4ModeArg,

    /// Static IPv4 address.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    ipv4addr: Ipv4Addr,

    /// Static IPv4 netmask.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    ipv4mask: Ipv4Addr,

    /// Static IPv4 gateway.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    ipv4gw: Ipv4Addr,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let transport = SerialTransport::open(&args.device, args.baud, timeout)?;
    info!("connected to {}", args.device);
    let mut client = OdinClient::new(transport);

    if !client.reboot()? {
        return Err("reboot failed".into());
    }
    if !client.wait_for_startup()? {
        return Err("timed out waiting for the +STARTUP banner".into());
    }
    if !client.set_data_mode(DataMode::ExtendedDataMode)? {
        return Err("switch to extended data mode failed".into());
    }

    client.general_info()?;

    let config_id = 0;
    client.set_wifi_config(
        config_id,
        &WifiStationConfig {
            ssid: args.ssid.clone(),
            auth: args.auth.into(),
            passphrase: args.passphrase.clone(),
            ipv4_mode: args.ipv4mode.into(),
            ipv4_addr: args.ipv4addr,
            ipv4_mask: args.ipv4mask,
            ipv4_gateway: args.ipv4gw,
        },
    )?;
    if let Some(channels) = client.channel_list()? {
        info!("stored channel list: {channels:?}");
    }

    // World mode pins the module to a reduced channel set; turn it off and
    // bounce the radio before widening the list.
    client.set_force_world_mode(0)?;
    client.radio_reboot()?;
    thread::sleep(Duration::from_millis(500));
    client.set_channel_list(&CHANNEL_LIST)?;
    if let Some(channels) = client.channel_list()? {
        info!("active channel list: {channels:?}");
    }

    client.activate_wifi_config(config_id)?;
    client.wait_for_wifi_link()?;
    let interface_id = 0;
    if !client.wait_for_network_up()? {
        return Err("network did not come up".into());
    }
    if let Some(addr) = client.network_address(interface_id)? {
        info!("station address {addr}");
    }
    // A second up event follows once both address families are configured.
    if !client.wait_for_network_up()? {
        return Err("network did not come up".into());
    }
    if let Some(addr) = client.network_address(interface_id)? {
        info!("station address {addr}");
    }

    let peer_handle = client
        .connect_to_peer(&args.host.to_string(), args.port)?
        .ok_or("peer connect rejected")?;
    let channel_id = client
        .wait_for_connect_event(args.host, args.port)?
        .ok_or("no connect event for the peer")?;
    if !client.wait_for_peer_connected(peer_handle)? {
        return Err("peer connection not confirmed".into());
    }
    info!("peer handle {peer_handle} connected on channel {channel_id}");

    echo_loop(&mut client, channel_id)
}

/// Ping the peer forever, logging whatever comes back and skimming past
/// interleaved events.
fn echo_loop(
    client: &mut OdinClient<SerialTransport>,
    channel_id: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let expectations = [
        Expectation::any_content(MessageType::DataEvent),
        Expectation::any_content(MessageType::AtEvent),
        Expectation::any_content(MessageType::ConnectEvent),
        Expectation::any_content(MessageType::DisconnectEvent),
        Expectation::any_content(MessageType::StartEvent),
    ];
    loop {
        client.send_data(channel_id, b"P\n")?;
        let received = client.receive_matches(&expectations)?;
        for message in received.into_matched() {
            if message.msg_type == Some(MessageType::DataEvent) {
                if let Some(content) = message.content {
                    info!("echo: {}", String::from_utf8_lossy(&content[1..]));
                }
            }
        }
    }
}
