//! Reader for the newline-delimited JSON push channel.
//!
//! One envelope per line. Lines that are not valid envelopes are logged and
//! skipped; payloads inside a valid envelope are never rejected (see
//! `parse_push_event`). Delivery is at-most-once: a dropped connection loses
//! whatever was in flight.

use std::io::{BufRead, BufReader, Read};
use std::net::TcpStream;
use std::time::Duration;

use vitalscope_core::{Result, ScopeError};
use vitalscope_protocol::{parse_push_event, PushEvent, MAX_PUSH_LINE_BYTES};

const CONNECT_TIMEOUT_MS: u64 = 2_000;

pub fn connect(addr: &str) -> Result<TcpStream> {
    let socket_addr = std::net::ToSocketAddrs::to_socket_addrs(addr)
        .map_err(|err| ScopeError::Transport {
            context: format!("resolving push address {}", addr),
            details: err.to_string(),
        })?
        .next()
        .ok_or_else(|| ScopeError::Transport {
            context: format!("resolving push address {}", addr),
            details: "no addresses".to_string(),
        })?;
    TcpStream::connect_timeout(&socket_addr, Duration::from_millis(CONNECT_TIMEOUT_MS)).map_err(
        |err| ScopeError::Transport {
            context: format!("connecting to push channel {}", addr),
            details: err.to_string(),
        },
    )
}

/// Reads envelopes until EOF or `on_event` returns `false`.
pub fn read_events<R: Read>(source: R, mut on_event: impl FnMut(PushEvent) -> bool) -> Result<()> {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_PUSH_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .map_err(|err| ScopeError::Transport {
                context: "reading push channel".to_string(),
                details: err.to_string(),
            })?;
        if read == 0 {
            return Ok(());
        }
        // Hit the cap without reaching a newline.
        if line.len() > MAX_PUSH_LINE_BYTES && line.last() != Some(&b'\n') {
            tracing::warn!(bytes = line.len(), "Push line exceeded maximum size; dropping");
            skip_rest_of_line(&mut reader)?;
            continue;
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match parse_push_event(text) {
            Ok(event) => {
                if !on_event(event) {
                    return Ok(());
                }
            }
            Err(info) => {
                tracing::warn!(code = %info.code, error = %info.message, "Skipping push line");
            }
        }
    }
}

fn skip_rest_of_line<R: BufRead>(reader: &mut R) -> Result<()> {
    let mut discard = Vec::new();
    loop {
        discard.clear();
        let read = reader
            .by_ref()
            .take(MAX_PUSH_LINE_BYTES as u64)
            .read_until(b'\n', &mut discard)
            .map_err(|err| ScopeError::Transport {
                context: "reading push channel".to_string(),
                details: err.to_string(),
            })?;
        if read == 0 || discard.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}
