use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::info;

/// Byte-level access to the microcontroller.
///
/// Kept synchronous: each call is short, the waiting happens in `DeviceLink`.
pub trait SerialTransport: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes already received and not yet read.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Reads up to and including the next `\n`, or whatever arrives before the port times out.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

/// `serialport`-backed transport for the Arduino on `/dev/ttyACM0`.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud).timeout(read_timeout).open()?;
        info!("Serial port {} opened at {} baud", path, baud);
        Ok(Self { port })
    }
}

impl SerialTransport for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                // Partial line on timeout, same as a readline with a port timeout.
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(line)
    }
}
