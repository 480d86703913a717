//! Module operations.
//!
//! Thin compositions over the protocol engine: each operation formats an AT
//! command (or a small fixed sequence of them), sends it through
//! [`OdinClient::send_command_await`] / [`OdinClient::send_command_no_wait`],
//! and where the response carries structured data, extracts it from the
//! matched content by plain text search.

use std::net::Ipv4Addr;

use log::debug;

use odinw_protocol::{contains_subsequence, ConnectEvent, DataMode, Expectation, MessageType, AT_OK};

use crate::client::OdinClient;
use crate::error::{ClientError, Received};
use crate::transport::Transport;

/// Wi-Fi authentication schemes, numbered as the module's `+UWSC` tag 5
/// expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiAuth {
    /// Open network, no authentication.
    Open,
    /// WPA/WPA2 passphrase.
    Wpa,
    /// LEAP.
    Leap,
    /// PEAP.
    Peap,
    /// EAP-TLS.
    EapTls,
}

impl WifiAuth {
    /// The `+UWSC` tag value.
    pub fn value(&self) -> u8 {
        match self {
            WifiAuth::Open => 1,
            WifiAuth::Wpa => 2,
            WifiAuth::Leap => 3,
            WifiAuth::Peap => 4,
            WifiAuth::EapTls => 5,
        }
    }
}

/// IPv4 addressing mode for a station configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Mode {
    /// Static address configuration.
    Static,
    /// DHCP.
    Dhcp,
}

impl Ipv4Mode {
    /// The `+UWSC` tag 100 value.
    pub fn value(&self) -> u8 {
        match self {
            Ipv4Mode::Static => 1,
            Ipv4Mode::Dhcp => 2,
        }
    }
}

/// Parameters written into a Wi-Fi station configuration slot.
#[derive(Debug, Clone)]
pub struct WifiStationConfig {
    /// Network SSID.
    pub ssid: String,
    /// Authentication scheme.
    pub auth: WifiAuth,
    /// WPA passphrase; only written when `auth` is [`WifiAuth::Wpa`].
    pub passphrase: String,
    /// IPv4 addressing mode.
    pub ipv4_mode: Ipv4Mode,
    /// Static address; only written in [`Ipv4Mode::Static`].
    pub ipv4_addr: Ipv4Addr,
    /// Static netmask; only written in [`Ipv4Mode::Static`].
    pub ipv4_mask: Ipv4Addr,
    /// Static gateway; only written in [`Ipv4Mode::Static`].
    pub ipv4_gateway: Ipv4Addr,
}

impl<T: Transport> OdinClient<T> {
    /// Power-cycle the module with `+CPWROFF`. On success the module is back
    /// in command mode with echo re-enabled by its stored settings, so the
    /// mode field is reset.
    pub fn reboot(&mut self) -> Result<bool, ClientError> {
        if self.send_command_await("+CPWROFF")? {
            self.set_mode(DataMode::CommandMode);
            return Ok(true);
        }
        Ok(false)
    }

    /// Wait for the `+STARTUP` banner after a reboot. Command mode only.
    pub fn wait_for_startup(&mut self) -> Result<bool, ClientError> {
        if self.mode() != DataMode::CommandMode {
            return Err(ClientError::InvalidMode {
                operation: "wait for startup",
                mode: self.mode(),
            });
        }
        Ok(self.receive_match(&Expectation::text("+STARTUP"))?.is_matched())
    }

    /// Restore factory defaults (`+UFACTORY`); takes effect on next reboot.
    pub fn factory_reset(&mut self) -> Result<bool, ClientError> {
        self.send_command_await("+UFACTORY")
    }

    /// Disable command echo (`E0`). The confirmation to this very command is
    /// still echoed; the flag is cleared only once that exchange completes.
    pub fn echo_off(&mut self) -> Result<bool, ClientError> {
        if self.send_command_await("E0")? {
            self.set_echo_enabled(false);
            return Ok(true);
        }
        Ok(false)
    }

    /// Store the current configuration to profile memory (`&W`).
    pub fn store_configuration(&mut self) -> Result<bool, ClientError> {
        self.send_command_await("&W")
    }

    /// Set the module start mode (`+UMSM`).
    pub fn set_start_mode(&mut self, start_mode: u8) -> Result<bool, ClientError> {
        self.send_command_await(&format!("+UMSM={start_mode}"))
    }

    /// Query the identity surface of the module: manufacturer, model,
    /// firmware, serial, and greeting text. Responses are logged, not
    /// interpreted.
    pub fn general_info(&mut self) -> Result<(), ClientError> {
        const QUERIES: [&str; 11] = [
            "+CGMI", "+CGMM", "+CGMR", "+CGSN", "+GMI", "+GMM", "+GSN", "I0", "I9", "I10",
            "+CSGT?",
        ];
        for query in QUERIES {
            self.send_command_await(query)?;
        }
        Ok(())
    }

    /// Write a Wi-Fi station configuration slot via `+UWSC` parameter tags.
    pub fn set_wifi_config(
        &mut self,
        config_id: u8,
        config: &WifiStationConfig,
    ) -> Result<(), ClientError> {
        self.send_command_await(&format!("+UWSC={config_id},0,1"))?;
        self.send_command_await(&format!("+UWSC={config_id},2,\"{}\"", config.ssid))?;
        self.send_command_await(&format!("+UWSC={config_id},5,{}", config.auth.value()))?;
        if config.auth == WifiAuth::Wpa {
            self.send_command_await(&format!("+UWSC={config_id},8,\"{}\"", config.passphrase))?;
        }
        self.send_command_await(&format!("+UWSC={config_id},100,{}", config.ipv4_mode.value()))?;
        if config.ipv4_mode == Ipv4Mode::Static {
            self.send_command_await(&format!("+UWSC={config_id},101,{}", config.ipv4_addr))?;
            self.send_command_await(&format!("+UWSC={config_id},102,{}", config.ipv4_mask))?;
            self.send_command_await(&format!("+UWSC={config_id},103,{}", config.ipv4_gateway))?;
        }
        Ok(())
    }

    /// Activate a station configuration slot (`+UWSCA` action 3).
    pub fn activate_wifi_config(&mut self, config_id: u8) -> Result<bool, ClientError> {
        self.send_command_await(&format!("+UWSCA={config_id},3"))
    }

    /// Deactivate a station configuration slot (`+UWSCA` action 4).
    pub fn deactivate_wifi_config(&mut self, config_id: u8) -> Result<bool, ClientError> {
        self.send_command_await(&format!("+UWSCA={config_id},4"))
    }

    /// Turn off roaming (`+UWCFG` tags 7 and 8).
    pub fn disable_roaming(&mut self) -> Result<(), ClientError> {
        self.send_command_await("+UWCFG=7,0")?;
        self.send_command_await("+UWCFG=8,0")?;
        Ok(())
    }

    /// Set the force-world-mode flag (`+UWCFG` tag 11).
    pub fn set_force_world_mode(&mut self, mode: u8) -> Result<bool, ClientError> {
        self.send_command_await(&format!("+UWCFG=11,{mode}"))
    }

    /// Bounce the radio (`+UWCFG` tag 0 off, then on) so changed
    /// configuration takes effect.
    pub fn radio_reboot(&mut self) -> Result<(), ClientError> {
        self.send_command_await("+UWCFG=0,0")?;
        self.send_command_await("+UWCFG=0,1")?;
        Ok(())
    }

    /// Make the module non-discoverable (`+UWTDM=1`).
    pub fn set_non_discoverable(&mut self) -> Result<bool, ClientError> {
        self.send_command_await("+UWTDM=1")
    }

    /// Make the module connectable (`+UWTCM=1`).
    pub fn set_connectable(&mut self) -> Result<bool, ClientError> {
        self.send_command_await("+UWTCM=1")
    }

    /// Set the Wi-Fi channel list (`+UWCL`).
    pub fn set_channel_list(&mut self, channels: &[u16]) -> Result<bool, ClientError> {
        let list = channels
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.send_command_await(&format!("+UWCL={list}"))
    }

    /// Query the active Wi-Fi channel list (`+UWCL?`).
    pub fn channel_list(&mut self) -> Result<Option<Vec<u16>>, ClientError> {
        let Some(content) = self.query("+UWCL?")? else {
            return Ok(None);
        };
        Ok(find_field(&content, b"+UWCL:").and_then(parse_channel_list))
    }

    /// Query the IPv4 address of a network interface (`+UNSTAT` status id
    /// 101).
    pub fn network_address(&mut self, interface_id: u8) -> Result<Option<Ipv4Addr>, ClientError> {
        let Some(content) = self.query(&format!("+UNSTAT={interface_id},101"))? else {
            return Ok(None);
        };
        Ok(find_field(&content, b"+UNSTAT:").and_then(|field| {
            let text = std::str::from_utf8(field).ok()?;
            text.split(',').nth(2)?.trim().parse().ok()
        }))
    }

    /// Open a TCP connection to a peer (`+UDCP`). Returns the peer handle
    /// the module assigned, used to correlate the later `+UUDPC` event.
    pub fn connect_to_peer(&mut self, host: &str, port: u16) -> Result<Option<u32>, ClientError> {
        let Some(content) = self.query(&format!("+UDCP=\"tcp://{host}:{port}/\""))? else {
            return Ok(None);
        };
        Ok(find_field(&content, b"+UDCP:").and_then(leading_number))
    }

    /// Block until the Wi-Fi link-established event (`+UUWLE`) arrives.
    /// Loops over timeouts and unrelated traffic indefinitely; bounding the
    /// wait is the caller's job.
    pub fn wait_for_wifi_link(&mut self) -> Result<(), ClientError> {
        let expectation = self.event_expectation("+UUWLE");
        loop {
            if self.receive_match(&expectation)?.is_matched() {
                return Ok(());
            }
        }
    }

    /// Wait for one network-up event (`+UUNU`). A single receive call: a
    /// timeout or an unrelated frame reports `false`.
    pub fn wait_for_network_up(&mut self) -> Result<bool, ClientError> {
        let expectation = self.event_expectation("+UUNU");
        Ok(self.receive_match(&expectation)?.is_matched())
    }

    /// Wait for the peer-connected event (`+UUDPC`) for a specific peer
    /// handle. A single receive call.
    pub fn wait_for_peer_connected(&mut self, peer_handle: u32) -> Result<bool, ClientError> {
        let expectation = self.event_expectation("+UUDPC");
        let received = self.receive_match(&expectation)?;
        let Some(message) = received.into_matched().into_iter().next() else {
            return Ok(false);
        };
        let handle = message
            .content
            .as_deref()
            .and_then(|content| find_field(content, b"+UUDPC:"))
            .and_then(leading_number);
        Ok(handle == Some(peer_handle))
    }

    /// Wait for the EDM connect event announcing a data channel to the given
    /// peer. Returns the channel id when the event's address and port match.
    pub fn wait_for_connect_event(
        &mut self,
        peer_addr: Ipv4Addr,
        peer_port: u16,
    ) -> Result<Option<u8>, ClientError> {
        let received =
            self.receive_match(&Expectation::any_content(MessageType::ConnectEvent))?;
        let Some(message) = received.into_matched().into_iter().next() else {
            return Ok(None);
        };
        let event = match ConnectEvent::decode(message.content.as_deref().unwrap_or_default()) {
            Ok(event) => event,
            Err(err) => {
                debug!("ignoring malformed connect event: {err}");
                return Ok(None);
            }
        };
        if event.remote_addr == peer_addr && event.remote_port == peer_port {
            Ok(Some(event.channel_id))
        } else {
            Ok(None)
        }
    }

    /// Send a query without waiting, then read its OK/ERROR-terminated
    /// response directly. Returns the full response content when it arrived
    /// and carries `OK`, `None` otherwise.
    fn query(&mut self, command: &str) -> Result<Option<Vec<u8>>, ClientError> {
        self.send_command_no_wait(command)?;
        let expectations = self.response_expectations();
        match self.receive_matches(&expectations)? {
            Received::Matched(messages) => Ok(messages
                .into_iter()
                .next()
                .and_then(|message| message.content)
                .filter(|content| contains_subsequence(content, AT_OK))),
            _ => Ok(None),
        }
    }

    /// An unsolicited-event expectation for the active mode: AtEv-typed in
    /// extended data mode, plain text in command mode.
    fn event_expectation(&self, needle: &str) -> Expectation {
        if self.mode() == DataMode::ExtendedDataMode {
            Expectation::typed(MessageType::AtEvent, needle.as_bytes())
        } else {
            Expectation::text(needle.as_bytes())
        }
    }
}

/// Slice the value following `prefix` in `content`, up to the end of its
/// line.
fn find_field<'a>(content: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    let start = content
        .windows(prefix.len())
        .position(|window| window == prefix)?
        + prefix.len();
    let rest = &content[start..];
    let end = rest
        .iter()
        .position(|&byte| byte == b'\r' || byte == b'\n')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parse a comma-separated channel list.
fn parse_channel_list(field: &[u8]) -> Option<Vec<u16>> {
    let text = std::str::from_utf8(field).ok()?;
    text.split(',')
        .map(|token| token.trim().parse::<u16>().ok())
        .collect()
}

/// Parse the decimal number a field starts with.
fn leading_number(field: &[u8]) -> Option<u32> {
    let digits: Vec<u8> = field
        .iter()
        .copied()
        .take_while(u8::is_ascii_digit)
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}
