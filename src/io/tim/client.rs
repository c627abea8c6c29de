//! TCP client for the scanner's telegram service.
//!
//! The scanner streams ASCII telegrams continuously once measurement output
//! is enabled. Control commands are short ASCII strings framed with the same
//! STX/ETX markers as the data stream.

use super::framer::{ETX, STX};
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Enable continuous scan output.
const CMD_START_STREAM: &str = "sEN LMDscandata 1";
/// Disable continuous scan output.
const CMD_STOP_STREAM: &str = "sEN LMDscandata 0";
/// Start the measurement unit.
const CMD_START_MEASURE: &str = "sMN LMCstartmeas";
/// Leave configuration mode.
const CMD_RUN: &str = "sMN Run";
/// Select ASCII telegram output.
const CMD_ASCII_OUTPUT: &str = "sWN SetToAscii 1";

/// TCP client for a TiM-class scanner.
pub struct TimClient {
    stream: TcpStream,
}

impl TimClient {
    /// Connect to the scanner service port.
    pub fn connect(addr: &str, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(read_timeout))?;
        log::info!("connected to scanner at {addr}");
        Ok(Self { stream })
    }

    /// Send one framed control command.
    pub fn send_command(&mut self, cmd: &str) -> Result<()> {
        let mut telegram = Vec::with_capacity(cmd.len() + 2);
        telegram.push(STX);
        telegram.extend_from_slice(cmd.as_bytes());
        telegram.push(ETX);
        self.stream.write_all(&telegram)?;
        self.stream.flush()?;
        log::debug!("sent command: {cmd}");
        Ok(())
    }

    /// Put the device into measurement mode and enable the scan stream.
    pub fn start_streaming(&mut self) -> Result<()> {
        for cmd in [CMD_ASCII_OUTPUT, CMD_START_MEASURE, CMD_RUN, CMD_START_STREAM] {
            self.send_command(cmd)?;
        }
        Ok(())
    }

    /// Disable the scan stream.
    pub fn stop_streaming(&mut self) -> Result<()> {
        self.send_command(CMD_STOP_STREAM)
    }

    /// Read one chunk from the socket.
    ///
    /// Returns `Ok(Some(n))` with the number of bytes placed in `buf`,
    /// `Ok(None)` when the read timed out (no data this cycle), and
    /// [`Error::Disconnected`] when the peer closed the connection.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.stream.read(buf) {
            Ok(0) => Err(Error::Disconnected),
            Ok(n) => Ok(Some(n)),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}
