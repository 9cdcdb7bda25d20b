use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument};

use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::Settings;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

pub async fn run(port: u16, settings: Settings) -> Result<(), Error> {
    run_with_signal(port, settings, None).await
}

/// Binds the listener and serves connections forever. `ready` (used by
/// tests) fires once the listener is accepting.
pub async fn run_with_signal(
    port: u16,
    settings: Settings,
    ready: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let store = Store::new(settings);

    info!("Server listening on {}", listener.local_addr()?);
    if let Some(ready) = ready {
        let _ = ready.send(listener.local_addr()?);
    }

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store).await {
                error!("{}", e);
            }
        });
    }
}

// One read-decode-dispatch-write loop per connection. Command-level failures
// (unknown verb, bad arity) are answered with an error frame and the loop
// keeps going; frame-level failures propagate and close the connection.
#[instrument(
    name = "connection",
    skip(stream, store),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, client_address);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    while let Some(frame) = conn.read_frame().await? {
        info!("Received frame from client: {:?}", frame);

        let res = match Command::try_from(frame) {
            Ok(cmd) => cmd.exec(store.clone())?,
            Err(e) => Frame::Error(e.to_string()),
        };

        info!("Sending response to client: {:?}", res);
        let res: Vec<u8> = res.into();

        conn.writer.write_all(&res).await?;
        conn.writer.flush().await?;
    }

    info!("Connection closed");
    Ok(())
}
