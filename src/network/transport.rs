use crate::error::{BlockchainError, Result};
use log::{debug, error, info};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread;

/// Upper bound on a single frame. Anything larger is treated as a protocol
/// violation and tears down the connection.
pub const MAX_FRAME_SIZE: u32 = 4 * 1024 * 1024;

/// One decoded wire frame, tagged with the sending connection's remote
/// address.
#[derive(Debug)]
pub struct RPC {
    pub from: SocketAddr,
    pub payload: Vec<u8>,
}

/// Everything the dispatcher consumes: accepted sockets from the listener,
/// frames from peer receive loops, and the quit signal.
pub enum NetEvent {
    Accepted(TcpStream),
    Rpc(RPC),
    Shutdown,
}

/// Write one length-prefixed frame: a u32 big-endian byte count followed by
/// the payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds limit", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one length-prefixed frame.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// The listening side of the transport. Binds at construction so the local
/// address is known before the accept loop starts.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(listen_addr: &str) -> Result<TcpTransport> {
        let listener = TcpListener::bind(listen_addr)
            .map_err(|e| BlockchainError::Network(format!("failed to bind {listen_addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BlockchainError::Network(format!("failed to read local addr: {e}")))?;
        Ok(TcpTransport {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn the accept loop. Accepted sockets are forwarded to the
    /// dispatcher; the loop ends when the dispatcher side goes away.
    pub fn start(self, event_tx: Sender<NetEvent>) {
        thread::spawn(move || {
            for stream in self.listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if event_tx.send(NetEvent::Accepted(stream)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("error accepting connection: {e}");
                    }
                }
            }
        });
    }
}

/// One live peer connection. The writer half is shared behind a mutex so
/// any handler thread can send; the reader half lives in the peer's receive
/// loop.
pub struct TcpPeer {
    addr: SocketAddr,
    outgoing: bool,
    writer: Mutex<TcpStream>,
}

impl TcpPeer {
    /// Wrap a connected socket. `outgoing` records which side dialed.
    pub fn new(stream: &TcpStream, outgoing: bool) -> Result<TcpPeer> {
        let addr = stream
            .peer_addr()
            .map_err(|e| BlockchainError::Network(format!("failed to read peer addr: {e}")))?;
        let writer = stream
            .try_clone()
            .map_err(|e| BlockchainError::Network(format!("failed to clone peer socket: {e}")))?;
        Ok(TcpPeer {
            addr,
            outgoing,
            writer: Mutex::new(writer),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_outgoing(&self) -> bool {
        self.outgoing
    }

    /// Send one frame to this peer.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BlockchainError::Network("peer writer lock poisoned".to_string()))?;
        write_frame(&mut *writer, payload)
            .map_err(|e| BlockchainError::Network(format!("failed to send to {}: {e}", self.addr)))
    }
}

/// Per-peer receive loop: frames in, `NetEvent::Rpc` out. Exits on EOF, on
/// any read error, and when the dispatcher goes away.
pub fn receive_loop(mut stream: TcpStream, from: SocketAddr, event_tx: &Sender<NetEvent>) {
    loop {
        match read_frame(&mut stream) {
            Ok(payload) => {
                if event_tx.send(NetEvent::Rpc(RPC { from, payload })).is_err() {
                    debug!("dispatcher gone, closing receive loop for {from}");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("peer {from} closed the connection");
                break;
            }
            Err(e) => {
                info!("read error from {from}: {e}");
                break;
            }
        }
    }
}
