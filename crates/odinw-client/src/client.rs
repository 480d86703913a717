//! The protocol engine.
//!
//! [`OdinClient`] owns the transport, the active data mode, and the echo
//! state, and implements the receive/match loop both framing disciplines
//! share. Every operation checks the active mode before touching the
//! transport; an unsupported operation fails fast with
//! [`ClientError::InvalidMode`] and leaves the stream alone.

use bytes::BytesMut;
use log::{debug, trace};

use odinw_protocol::{
    at_line, contains_subsequence, decode_body, encode_at_request, encode_data_frame,
    match_expectations, match_text_expectations, DataMode, Expectation, MessageType, AT_ERROR,
    AT_OK, CM_SFD, EDM_SFD,
};

use crate::error::{ClientError, Received};
use crate::scanner::seek_marker;
use crate::transport::{read_full, Transport};

/// How much to ask for per raw read in transparent data mode.
const RAW_READ_CHUNK: usize = 1024;

/// Client driving an ODIN-W2 module over a [`Transport`].
pub struct OdinClient<T: Transport> {
    transport: T,
    mode: DataMode,
    echo_enabled: bool,
    pending_echo: Option<Vec<u8>>,
}

impl<T: Transport> OdinClient<T> {
    /// Create a client over a freshly opened transport. The module is
    /// assumed to be in command mode with echo enabled, its power-on state.
    pub fn new(transport: T) -> Self {
        OdinClient {
            transport,
            mode: DataMode::CommandMode,
            echo_enabled: true,
            pending_echo: None,
        }
    }

    /// The active data mode.
    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Whether command echo is still enabled on the module.
    pub fn echo_enabled(&self) -> bool {
        self.echo_enabled
    }

    pub(crate) fn set_mode(&mut self, mode: DataMode) {
        self.mode = mode;
    }

    pub(crate) fn set_echo_enabled(&mut self, enabled: bool) {
        self.echo_enabled = enabled;
    }

    /// Send an AT command, framed for the active mode.
    ///
    /// Legal in command mode (bare `AT...\r` line) and extended data mode
    /// (AtReq envelope). In command mode with echo enabled, the transmitted
    /// bytes are recorded so the next receive can discard the echo.
    pub fn send_command(&mut self, command: &str) -> Result<(), ClientError> {
        if !self.mode.supports_commands() {
            return Err(ClientError::InvalidMode {
                operation: "send command",
                mode: self.mode,
            });
        }
        let wire = if self.mode == DataMode::ExtendedDataMode {
            encode_at_request(command)?
        } else {
            at_line(command)
        };
        if self.mode == DataMode::CommandMode && self.echo_enabled {
            self.pending_echo = Some(wire.clone());
        }
        debug!("TX command {}", hex::encode(&wire));
        self.transport.write_all(&wire)?;
        Ok(())
    }

    /// Send payload bytes on a channel.
    ///
    /// Legal in transparent data mode (raw write, channel ignored by the
    /// wire format) and extended data mode (DataCmd envelope).
    pub fn send_data(&mut self, channel_id: u8, data: &[u8]) -> Result<(), ClientError> {
        if !self.mode.supports_data() {
            return Err(ClientError::InvalidMode {
                operation: "send data",
                mode: self.mode,
            });
        }
        let wire = if self.mode == DataMode::ExtendedDataMode {
            encode_data_frame(channel_id, data)?
        } else {
            data.to_vec()
        };
        debug!("TX data {}", hex::encode(&wire));
        self.transport.write_all(&wire)?;
        Ok(())
    }

    /// Receive one frame (extended data mode) or one matched run of response
    /// lines (command mode) and filter it against `expectations`.
    ///
    /// See [`Received`] for the outcome contract. In extended data mode each
    /// call consumes exactly one frame, so unsolicited events show up as
    /// [`Received::NoMatch`] and are skipped by calling again. In command
    /// mode lines accumulate until some expectation is satisfied or a line
    /// read times out.
    pub fn receive_matches(
        &mut self,
        expectations: &[Expectation],
    ) -> Result<Received, ClientError> {
        match self.mode {
            DataMode::ExtendedDataMode => self.receive_edm_frame(expectations),
            DataMode::CommandMode => self.receive_response_lines(expectations),
            mode => Err(ClientError::InvalidMode {
                operation: "receive",
                mode,
            }),
        }
    }

    /// Single-expectation convenience over [`OdinClient::receive_matches`].
    pub fn receive_match(&mut self, expectation: &Expectation) -> Result<Received, ClientError> {
        self.receive_matches(std::slice::from_ref(expectation))
    }

    /// Receive payload data.
    ///
    /// In transparent data mode this is one timeout-bounded raw read (which
    /// may legitimately return an empty vec). In extended data mode it
    /// consumes one frame, and yields data only if that frame is a DataEv;
    /// `None` covers timeouts and any other frame type.
    pub fn receive_data(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        match self.mode {
            DataMode::DataMode => {
                let mut buf = vec![0u8; RAW_READ_CHUNK];
                let n = self.transport.read(&mut buf)?;
                buf.truncate(n);
                trace!("RX data {}", hex::encode(&buf));
                Ok(Some(buf))
            }
            DataMode::ExtendedDataMode => {
                let received =
                    self.receive_match(&Expectation::any_content(MessageType::DataEvent))?;
                // DataEv content is channel_id(1) || data
                Ok(received
                    .into_matched()
                    .into_iter()
                    .next()
                    .and_then(|message| message.content)
                    .map(|content| content[1..].to_vec()))
            }
            mode => Err(ClientError::InvalidMode {
                operation: "receive data",
                mode,
            }),
        }
    }

    /// Send a command and correlate its OK/ERROR response.
    ///
    /// `Ok(true)` when the response matched and does not contain `ERROR`;
    /// `Ok(false)` when it does, or when the response timed out.
    pub fn send_command_await(&mut self, command: &str) -> Result<bool, ClientError> {
        if !self.mode.supports_commands() {
            return Err(ClientError::InvalidMode {
                operation: "send command",
                mode: self.mode,
            });
        }
        let expectations = self.response_expectations();
        self.send_command(command)?;
        match self.receive_matches(&expectations)? {
            Received::Matched(messages) => {
                let rejected = messages.iter().any(|message| {
                    contains_subsequence(
                        message.content.as_deref().unwrap_or_default(),
                        AT_ERROR,
                    )
                });
                if rejected {
                    debug!("command {command:?} rejected");
                }
                Ok(!rejected)
            }
            // A frame that decodes but matches nothing is some other event
            // slipping in, not a rejection.
            Received::NoMatch => Ok(true),
            Received::Timeout | Received::Desync(_) => Ok(false),
        }
    }

    /// Send a command without waiting for its response. The caller reads the
    /// response through [`OdinClient::receive_matches`], which is how
    /// queries with structured payloads correlate them.
    pub fn send_command_no_wait(&mut self, command: &str) -> Result<(), ClientError> {
        self.send_command(command)
    }

    /// Request a transition to `target` via the `O<n>` command.
    ///
    /// On a non-ERROR response the mode field is updated to the target
    /// immediately. A transition to extended data mode additionally waits
    /// for the module's StartEv frame and reports failure when it does not
    /// arrive, at which point the mode field has already changed. Once `O2`
    /// is accepted the stream is EDM-framed, so the client must follow even
    /// if the confirmation never shows up.
    pub fn set_data_mode(&mut self, target: DataMode) -> Result<bool, ClientError> {
        if self.send_command_await(&format!("O{}", target.transition_arg()))? {
            self.mode = target;
            if self.mode == DataMode::ExtendedDataMode {
                let started =
                    self.receive_match(&Expectation::any_content(MessageType::StartEvent))?;
                return Ok(started.is_matched());
            }
        }
        Ok(false)
    }

    /// The OK/ERROR terminal expectations for the active mode: AtConf-typed
    /// in extended data mode, untyped text in command mode.
    pub(crate) fn response_expectations(&self) -> Vec<Expectation> {
        if self.mode == DataMode::ExtendedDataMode {
            vec![
                Expectation::typed(MessageType::AtConfirm, AT_OK),
                Expectation::typed(MessageType::AtConfirm, AT_ERROR),
            ]
        } else {
            vec![Expectation::text(AT_OK), Expectation::text(AT_ERROR)]
        }
    }

    fn receive_edm_frame(&mut self, expectations: &[Expectation]) -> Result<Received, ClientError> {
        if !seek_marker(&mut self.transport, &[EDM_SFD])? {
            return Ok(Received::Timeout);
        }
        let Some(length_bytes) = read_full(&mut self.transport, 2)? else {
            return Ok(Received::Timeout);
        };
        let length = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;
        let Some(body) = read_full(&mut self.transport, length)? else {
            return Ok(Received::Timeout);
        };
        if read_full(&mut self.transport, 1)?.is_none() {
            return Ok(Received::Timeout);
        }
        let (msg_type, content) = match decode_body(&body) {
            Ok(decoded) => decoded,
            Err(err) => return Ok(Received::Desync(err)),
        };
        debug!(
            "RX {:?} {}",
            msg_type,
            hex::encode(content.as_deref().unwrap_or_default())
        );
        let matched = match_expectations(expectations, Some(msg_type), content.as_deref());
        if matched.is_empty() {
            Ok(Received::NoMatch)
        } else {
            Ok(Received::Matched(matched))
        }
    }

    fn receive_response_lines(
        &mut self,
        expectations: &[Expectation],
    ) -> Result<Received, ClientError> {
        if self.echo_enabled {
            if let Some(echo_len) = self.pending_echo.as_ref().map(Vec::len) {
                let Some(echoed) = read_full(&mut self.transport, echo_len)? else {
                    return Ok(Received::Timeout);
                };
                trace!("RX echo {}", hex::encode(&echoed));
                self.pending_echo = None;
            }
        }
        if !seek_marker(&mut self.transport, &CM_SFD)? {
            return Ok(Received::Timeout);
        }
        let mut accumulated = BytesMut::new();
        loop {
            let line = self.transport.read_line()?;
            if line.is_empty() {
                return Ok(Received::Timeout);
            }
            trace!("RX line {}", hex::encode(&line));
            accumulated.extend_from_slice(&line);
            let matched = match_text_expectations(expectations, accumulated.as_ref());
            if !matched.is_empty() {
                return Ok(Received::Matched(matched));
            }
        }
    }
}
