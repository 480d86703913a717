//! Behavior tests for the protocol engine, driven through a scripted
//! in-memory transport. The script plays the module's side of the exchange;
//! reads "time out" (return short) once the scripted bytes run dry.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::rc::Rc;

use odinw_client::{ClientError, OdinClient, Received, Transport};
use odinw_protocol::{
    encode_at_request, encode_frame, DataMode, Expectation, MessageType, ProtocolError,
};

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Default)]
struct StreamInner {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    read_calls: usize,
}

/// Handle the test keeps to feed inbound bytes and inspect traffic after the
/// transport has been moved into the client.
#[derive(Clone, Default)]
struct SharedStream(Rc<RefCell<StreamInner>>);

impl SharedStream {
    fn feed(&self, bytes: &[u8]) {
        self.0.borrow_mut().inbound.extend(bytes);
    }

    fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    fn clear_written(&self) {
        self.0.borrow_mut().written.clear();
    }

    fn read_calls(&self) -> usize {
        self.0.borrow().read_calls
    }

    fn remaining(&self) -> usize {
        self.0.borrow().inbound.len()
    }
}

struct ScriptTransport(SharedStream);

impl Transport for ScriptTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.0 .0.borrow_mut();
        inner.read_calls += 1;
        let n = buf.len().min(inner.inbound.len());
        for slot in buf[..n].iter_mut() {
            *slot = inner.inbound.pop_front().unwrap();
        }
        Ok(n)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut inner = self.0 .0.borrow_mut();
        inner.read_calls += 1;
        let mut line = Vec::new();
        while let Some(byte) = inner.inbound.pop_front() {
            line.push(byte);
            if byte == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0 .0.borrow_mut().written.extend_from_slice(buf);
        Ok(())
    }
}

fn client() -> (OdinClient<ScriptTransport>, SharedStream) {
    let stream = SharedStream::default();
    (OdinClient::new(ScriptTransport(stream.clone())), stream)
}

/// Walk a fresh client into extended data mode: O2 echo, OK response, then
/// the StartEv frame.
fn edm_client() -> (OdinClient<ScriptTransport>, SharedStream) {
    let (mut client, stream) = client();
    stream.feed(b"ATO2\r");
    stream.feed(b"\r\nOK\r\n");
    stream.feed(&encode_frame(MessageType::StartEvent, &[]).unwrap());
    assert!(client.set_data_mode(DataMode::ExtendedDataMode).unwrap());
    assert_eq!(client.mode(), DataMode::ExtendedDataMode);
    stream.clear_written();
    (client, stream)
}

fn ok_frame() -> Vec<u8> {
    encode_frame(MessageType::AtConfirm, b"\r\nOK\r\n").unwrap()
}

// ============================================================================
// Mode gating
// ============================================================================

#[test]
fn test_data_send_in_command_mode_fails_without_touching_transport() {
    let (mut client, stream) = client();
    let err = client.send_data(1, b"payload").unwrap_err();
    assert!(matches!(err, ClientError::InvalidMode { .. }));
    assert_eq!(stream.read_calls(), 0);
    assert!(stream.written().is_empty());
}

#[test]
fn test_command_and_receive_are_illegal_in_transparent_data_mode() {
    let (mut client, stream) = client();
    stream.feed(b"ATO1\r\r\nOK\r\n");
    // Only a transition to extended data mode can confirm via StartEv; for
    // every other target the call reports failure even though the mode
    // field has moved.
    assert!(!client.set_data_mode(DataMode::DataMode).unwrap());
    assert_eq!(client.mode(), DataMode::DataMode);

    assert!(matches!(
        client.send_command("I0").unwrap_err(),
        ClientError::InvalidMode { .. }
    ));
    assert!(matches!(
        client.receive_matches(&[]).unwrap_err(),
        ClientError::InvalidMode { .. }
    ));
    assert!(matches!(
        client.wait_for_startup().unwrap_err(),
        ClientError::InvalidMode { .. }
    ));
}

#[test]
fn test_raw_data_flows_in_transparent_data_mode() {
    let (mut client, stream) = client();
    stream.feed(b"ATO1\r\r\nOK\r\n");
    let _ = client.set_data_mode(DataMode::DataMode).unwrap();
    stream.clear_written();

    client.send_data(1, b"P\n").unwrap();
    assert_eq!(stream.written(), b"P\n");

    stream.feed(b"P\n");
    assert_eq!(client.receive_data().unwrap(), Some(b"P\n".to_vec()));
}

// ============================================================================
// Command-mode receive path
// ============================================================================

#[test]
fn test_lines_accumulate_until_a_pattern_matches() {
    let (mut client, stream) = client();
    stream.feed(b"\r\n+UWCL:1,6\r\nOK\r\n");

    let received = client
        .receive_matches(&[Expectation::text("OK"), Expectation::text("ERROR")])
        .unwrap();
    let messages = received.into_matched();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].msg_type, None);
    // The matched content is the whole accumulated buffer, so callers can
    // extract response fields that arrived on earlier lines.
    assert_eq!(messages[0].content.as_deref(), Some(b"+UWCL:1,6\r\nOK\r\n".as_slice()));
}

#[test]
fn test_line_timeout_reports_timeout() {
    let (mut client, stream) = client();
    stream.feed(b"\r\n+UUWLE:0,1122\r\n");
    let received = client.receive_matches(&[Expectation::text("OK")]).unwrap();
    assert_eq!(received, Received::Timeout);
}

#[test]
fn test_echo_bytes_are_discarded_before_marker_scan() {
    let (mut client, stream) = client();
    // ATE0\r is five bytes; the device echoes them before its response.
    stream.feed(b"ATE0\r\r\nOK\r\n");
    assert!(client.echo_off().unwrap());
    assert!(!client.echo_enabled());
    assert_eq!(stream.written(), b"ATE0\r");
    assert_eq!(stream.remaining(), 0);

    // With echo off, later commands record no pending echo.
    stream.clear_written();
    stream.feed(b"\r\nOK\r\n");
    assert!(client.send_command_await("+UWTCM=1").unwrap());
}

#[test]
fn test_pending_echo_survives_a_timeout() {
    let (mut client, stream) = client();
    client.send_command("E0").unwrap();

    // Nothing scripted: the echo read comes up empty and the call times out.
    let received = client.receive_matches(&[Expectation::text("OK")]).unwrap();
    assert_eq!(received, Received::Timeout);

    // The echo is still owed; the next receive consumes it and proceeds.
    stream.feed(b"ATE0\r\r\nOK\r\n");
    let received = client.receive_matches(&[Expectation::text("OK")]).unwrap();
    assert!(received.is_matched());
}

// ============================================================================
// EDM receive path
// ============================================================================

#[test]
fn test_edm_command_round_trip() {
    let (mut client, stream) = edm_client();
    stream.feed(&ok_frame());
    assert!(client.send_command_await("+UWTCM=1").unwrap());
    assert_eq!(stream.written(), encode_at_request("+UWTCM=1").unwrap());
}

#[test]
fn test_edm_error_response_reports_rejection() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtConfirm, b"\r\nERROR\r\n").unwrap());
    assert!(!client.send_command_await("+UWSCA=0,3").unwrap());
}

#[test]
fn test_unsolicited_frame_is_skippable_no_match() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::ConnectEvent, &[1, 2, 0, 10, 0, 0, 1, 0x61, 0xA8]).unwrap());
    stream.feed(&ok_frame());

    let expectations = [
        Expectation::typed(MessageType::AtConfirm, b"OK".as_slice()),
        Expectation::typed(MessageType::AtConfirm, b"ERROR".as_slice()),
    ];
    // First call consumes the connect event: decodes, matches nothing.
    assert_eq!(client.receive_matches(&expectations).unwrap(), Received::NoMatch);
    // Second call lands on the confirmation.
    assert!(client.receive_matches(&expectations).unwrap().is_matched());
}

#[test]
fn test_empty_expectation_list_still_consumes_one_frame() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::StartEvent, &[]).unwrap());
    assert_eq!(client.receive_matches(&[]).unwrap(), Received::NoMatch);
    assert_eq!(stream.remaining(), 0);
}

#[test]
fn test_content_wildcard_matches_empty_frame() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::StartEvent, &[]).unwrap());
    let received = client
        .receive_match(&Expectation::any_content(MessageType::StartEvent))
        .unwrap();
    let messages = received.into_matched();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, None);
}

#[test]
fn test_truncated_frame_times_out_without_partial_state() {
    let (mut client, stream) = edm_client();
    // SFD and one length byte, then silence.
    stream.feed(&[0xAA, 0x00]);
    assert_eq!(client.receive_matches(&[]).unwrap(), Received::Timeout);

    // A complete frame afterwards decodes normally.
    stream.feed(&encode_frame(MessageType::StartEvent, &[]).unwrap());
    let received = client
        .receive_match(&Expectation::any_content(MessageType::StartEvent))
        .unwrap();
    assert!(received.is_matched());
}

#[test]
fn test_unknown_tag_reports_desync() {
    let (mut client, stream) = edm_client();
    // Hand-built frame with tag 0x0099: SFD, len 4, tag, 2 payload bytes, EFD.
    stream.feed(&[0xAA, 0x00, 0x04, 0x00, 0x99, 0x01, 0x02, 0x55]);
    let received = client.receive_matches(&[]).unwrap();
    assert_eq!(
        received,
        Received::Desync(ProtocolError::UnknownMessageType(0x0099))
    );
}

#[test]
fn test_garbage_before_sfd_is_skipped() {
    let (mut client, stream) = edm_client();
    stream.feed(b"noise before frame");
    stream.feed(&ok_frame());
    let received = client
        .receive_match(&Expectation::typed(MessageType::AtConfirm, b"OK".as_slice()))
        .unwrap();
    assert!(received.is_matched());
}

#[test]
fn test_receive_data_strips_channel_byte() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::DataEvent, &[3, b'h', b'i']).unwrap());
    assert_eq!(client.receive_data().unwrap(), Some(b"hi".to_vec()));

    // A non-data frame yields nothing.
    stream.feed(&encode_frame(MessageType::AtEvent, b"+UUNU:0,7,1").unwrap());
    assert_eq!(client.receive_data().unwrap(), None);

    // As does a timeout.
    assert_eq!(client.receive_data().unwrap(), None);
}

#[test]
fn test_edm_data_send_uses_data_command_envelope() {
    let (mut client, stream) = edm_client();
    client.send_data(3, b"P\n").unwrap();
    assert_eq!(
        stream.written(),
        [0xAA, 0x00, 0x05, 0x00, 0x36, 0x03, b'P', b'\n', 0x55]
    );
}

// ============================================================================
// Mode transitions
// ============================================================================

#[test]
fn test_edm_transition_without_start_event_fails_but_mode_moves() {
    let (mut client, stream) = client();
    // O2 is accepted but the StartEv frame never arrives.
    stream.feed(b"ATO2\r\r\nOK\r\n");
    assert!(!client.set_data_mode(DataMode::ExtendedDataMode).unwrap());
    // The mode field has already moved; the stream is EDM-framed now even
    // though the call reported failure.
    assert_eq!(client.mode(), DataMode::ExtendedDataMode);
}

#[test]
fn test_rejected_transition_leaves_mode_alone() {
    let (mut client, stream) = client();
    stream.feed(b"ATO2\r\r\nERROR\r\n");
    assert!(!client.set_data_mode(DataMode::ExtendedDataMode).unwrap());
    assert_eq!(client.mode(), DataMode::CommandMode);
}

#[test]
fn test_reboot_returns_to_command_mode() {
    let (mut client, stream) = edm_client();
    stream.feed(&ok_frame());
    assert!(client.reboot().unwrap());
    assert_eq!(client.mode(), DataMode::CommandMode);
}

// ============================================================================
// Module operations
// ============================================================================

#[test]
fn test_wait_for_startup() {
    let (mut client, stream) = client();
    stream.feed(b"\r\n+STARTUP\r\n");
    assert!(client.wait_for_startup().unwrap());
}

#[test]
fn test_channel_list_query_extracts_fields() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtConfirm, b"\r\n+UWCL:1,6,11,36\r\nOK\r\n").unwrap());
    assert_eq!(client.channel_list().unwrap(), Some(vec![1, 6, 11, 36]));
    assert_eq!(stream.written(), encode_at_request("+UWCL?").unwrap());
}

#[test]
fn test_channel_list_rejected_query_yields_none() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtConfirm, b"\r\nERROR\r\n").unwrap());
    assert_eq!(client.channel_list().unwrap(), None);
}

#[test]
fn test_connect_to_peer_returns_handle() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtConfirm, b"\r\n+UDCP:2\r\nOK\r\n").unwrap());
    assert_eq!(client.connect_to_peer("192.168.1.99", 25000).unwrap(), Some(2));
    assert_eq!(
        stream.written(),
        encode_at_request("+UDCP=\"tcp://192.168.1.99:25000/\"").unwrap()
    );
}

#[test]
fn test_network_address_query() {
    let (mut client, stream) = edm_client();
    stream.feed(
        &encode_frame(MessageType::AtConfirm, b"\r\n+UNSTAT:0,101,192.168.1.55\r\nOK\r\n").unwrap(),
    );
    assert_eq!(
        client.network_address(0).unwrap(),
        Some(Ipv4Addr::new(192, 168, 1, 55))
    );
}

#[test]
fn test_wait_for_peer_connected_checks_handle() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtEvent, b"\r\n+UUDPC:2,2,0\r\n").unwrap());
    assert!(client.wait_for_peer_connected(2).unwrap());

    stream.feed(&encode_frame(MessageType::AtEvent, b"\r\n+UUDPC:3,2,0\r\n").unwrap());
    assert!(!client.wait_for_peer_connected(2).unwrap());
}

#[test]
fn test_wait_for_connect_event_matches_peer() {
    let (mut client, stream) = edm_client();
    let payload = [4, 2, 1, 192, 168, 1, 99, 0x61, 0xA8];
    stream.feed(&encode_frame(MessageType::ConnectEvent, &payload).unwrap());
    let channel = client
        .wait_for_connect_event(Ipv4Addr::new(192, 168, 1, 99), 25000)
        .unwrap();
    assert_eq!(channel, Some(4));

    // Same event for a different peer: no channel.
    stream.feed(&encode_frame(MessageType::ConnectEvent, &payload).unwrap());
    let channel = client
        .wait_for_connect_event(Ipv4Addr::new(10, 0, 0, 1), 25000)
        .unwrap();
    assert_eq!(channel, None);
}

#[test]
fn test_wait_for_network_up_is_single_shot() {
    let (mut client, stream) = edm_client();
    stream.feed(&encode_frame(MessageType::AtEvent, b"\r\n+UUNU:0,7,1\r\n").unwrap());
    assert!(client.wait_for_network_up().unwrap());
    assert!(!client.wait_for_network_up().unwrap());
}
