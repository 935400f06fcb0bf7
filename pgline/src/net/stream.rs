use bytes::BytesMut;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};

use super::{DEFAULT_BUF_CAPACITY, Socket, read_message};
use crate::{
    Result,
    common::verbose,
    connection::Config,
    postgres::{BackendProtocol, FrontendProtocol, frontend},
};

/// Buffered connection to postgres, used until startup completes.
#[derive(Debug)]
pub struct PgStream {
    socket: Socket,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl PgStream {
    /// Connect through the unix domain socket for `localhost` when
    /// available, otherwise through tcp.
    pub async fn connect(config: &Config) -> Result<Self> {
        let socket = match config.host() {
            "localhost" => {
                let path = format!("/run/postgresql/.s.PGSQL.{}", config.port());
                match Socket::connect_socket(&path).await {
                    Ok(socket) => socket,
                    Err(_err) => {
                        verbose!("unix socket unavailable: {_err}");
                        Socket::connect_tcp(config.host(), config.port()).await?
                    },
                }
            },
            host => Socket::connect_tcp(host, config.port()).await?,
        };

        Ok(Self::new(socket))
    }

    pub fn new(socket: Socket) -> PgStream {
        Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
        }
    }

    /// Buffer message, nothing is written until [`flush`][PgStream::flush].
    pub fn send<F: FrontendProtocol>(&mut self, msg: F) {
        frontend::write(msg, &mut self.write_buf);
    }

    pub fn send_startup(&mut self, msg: frontend::Startup) {
        msg.write(&mut self.write_buf);
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.socket.write_all_buf(&mut self.write_buf).await?;
        self.socket.flush().await?;
        Ok(())
    }

    /// Receive and decode the next message.
    pub async fn recv<B: BackendProtocol>(&mut self) -> Result<B> {
        let (msgtype, body) = read_message(&mut self.socket, &mut self.read_buf).await?;
        Ok(B::decode(msgtype, body)?)
    }

    /// Split into reader, writer and bytes already read but not consumed.
    pub fn into_parts(self) -> (ReadHalf<Socket>, WriteHalf<Socket>, BytesMut) {
        let (read, write) = tokio::io::split(self.socket);
        (read, write, self.read_buf)
    }
}
