//! Start-marker resynchronization.
//!
//! The module interleaves spontaneous events with solicited traffic, so a
//! receive call can land anywhere in the stream. Frame alignment is
//! recovered by scanning for the start-of-frame marker with a sliding
//! window: read a marker-sized window, then shift one byte at a time until
//! the window equals the marker. This trades one-byte reads after a partial
//! match for robustness against arbitrary garbage preceding a true frame.

use std::io;

use log::trace;

use crate::transport::Transport;

/// Consume bytes until the start marker has been read.
///
/// Returns `Ok(true)` with the stream positioned just past the marker, or
/// `Ok(false)` the moment a read returns no bytes (timeout or disconnect).
pub fn seek_marker<T: Transport + ?Sized>(transport: &mut T, marker: &[u8]) -> io::Result<bool> {
    let mut window = vec![0u8; marker.len()];
    let n = transport.read(&mut window)?;
    if n < marker.len() {
        return Ok(false);
    }
    let mut skipped = 0usize;
    while window != marker {
        let mut byte = [0u8; 1];
        if transport.read(&mut byte)? < 1 {
            return Ok(false);
        }
        window.rotate_left(1);
        if let Some(last) = window.last_mut() {
            *last = byte[0];
        }
        skipped += 1;
    }
    if skipped > 0 {
        trace!("skipped {skipped} bytes before start marker");
    }
    Ok(true)
}
