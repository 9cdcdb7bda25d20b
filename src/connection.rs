use std::net::SocketAddr;

use futures::StreamExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::frame::Frame;
use crate::Error;

/// One accepted client connection. The read half is wrapped in a single
/// `FramedRead` that lives as long as the connection, so bytes buffered ahead
/// of the current frame (pipelined commands) are never dropped.
pub struct Connection {
    pub id: Uuid,
    pub addr: SocketAddr,
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    pub writer: OwnedWriteHalf,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Connection {
        let (read_half, write_half) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            addr,
            reader: FramedRead::new(read_half, FrameCodec),
            writer: write_half,
        }
    }

    /// Reads the next frame, blocking until enough bytes have arrived.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly between
    /// frames. End of stream in the middle of a frame, or malformed frame
    /// data, is an `Err`.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        self.reader.next().await.transpose()
    }
}
