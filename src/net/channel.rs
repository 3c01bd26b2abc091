//! Blocking, ordered byte channels between the two parties.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info};

use crate::error::{HeError, Result};

/// Delay between connection attempts while the listener is not up yet
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Give up connecting after this long
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reliable ordered byte stream with exact-length transfers
pub trait Channel {
    /// Send all of `data`
    fn send_data(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `buf` completely. Pending sends are flushed first.
    fn recv_data(&mut self, buf: &mut [u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Total bytes sent so far
    fn counter(&self) -> u64;

    fn send_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        (&mut buf[..]).write_u64::<LittleEndian>(value)?;
        self.send_data(&buf)
    }

    fn recv_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.recv_data(&mut buf)?;
        Ok((&buf[..]).read_u64::<LittleEndian>()?)
    }

    fn send_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        (&mut buf[..]).write_u32::<LittleEndian>(value)?;
        self.send_data(&buf)
    }

    fn recv_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.recv_data(&mut buf)?;
        Ok((&buf[..]).read_u32::<LittleEndian>()?)
    }
}

/// Buffered TCP channel
pub struct NetIo {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    sent: u64,
    has_pending: bool,
}

impl NetIo {
    fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
            sent: 0,
            has_pending: false,
        })
    }

    /// Accept exactly one peer on `port` (all interfaces)
    pub fn listen(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        info!(port, "Waiting for peer");
        let (stream, peer) = listener.accept()?;
        info!(%peer, "Peer connected");
        Self::from_stream(stream)
    }

    /// Connect to `host:port`, retrying until the peer listens or the
    /// connection deadline passes
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match TcpStream::connect(&addrs[..]) {
                Ok(stream) => {
                    info!(host, port, attempts, "Connected to peer");
                    return Self::from_stream(stream);
                }
                Err(err) if Instant::now() < deadline => {
                    debug!(%err, attempts, "Peer not reachable yet");
                    thread::sleep(CONNECT_RETRY_INTERVAL);
                }
                Err(err) => return Err(HeError::Channel(err)),
            }
        }
    }

    /// Two connected channels over 127.0.0.1
    pub fn loopback_pair() -> Result<(Self, Self)> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let addr = listener.local_addr()?;
        let client = TcpStream::connect(addr)?;
        let (server, _) = listener.accept()?;
        Ok((Self::from_stream(server)?, Self::from_stream(client)?))
    }
}

impl Channel for NetIo {
    fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.sent += data.len() as u64;
        self.has_pending = true;
        Ok(())
    }

    fn recv_data(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.has_pending {
            self.flush()?;
        }
        self.reader.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.has_pending = false;
        Ok(())
    }

    fn counter(&self) -> u64 {
        self.sent
    }
}

impl Drop for NetIo {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_exchange() {
        let (mut a, mut b) = NetIo::loopback_pair().unwrap();
        let handle = thread::spawn(move || {
            let x = b.recv_u64().unwrap();
            let y = b.recv_u32().unwrap();
            let mut payload = vec![0u8; 5];
            b.recv_data(&mut payload).unwrap();
            b.send_u64(x + y as u64).unwrap();
            b.flush().unwrap();
            payload
        });

        a.send_u64(40).unwrap();
        a.send_u32(2).unwrap();
        a.send_data(b"hello").unwrap();
        // recv flushes the buffered request
        assert_eq!(a.recv_u64().unwrap(), 42);
        assert_eq!(a.counter(), 8 + 4 + 5);
        assert_eq!(handle.join().unwrap(), b"hello");
    }

    #[test]
    fn test_little_endian_framing() {
        let (mut a, mut b) = NetIo::loopback_pair().unwrap();
        a.send_u64(0x0102_0304_0506_0708).unwrap();
        a.flush().unwrap();
        let mut raw = [0u8; 8];
        b.recv_data(&mut raw).unwrap();
        assert_eq!(raw, [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_closed_peer_is_channel_error() {
        let (mut a, b) = NetIo::loopback_pair().unwrap();
        drop(b);
        let mut buf = [0u8; 8];
        assert!(matches!(a.recv_data(&mut buf), Err(HeError::Channel(_))));
    }
}
