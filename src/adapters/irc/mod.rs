//! IRC adapter
//!
//! Implements `ChatTransport` over a plain TCP connection.
//!
//! - [`message`] - Line parsing and framing
//!
//! After registration a background task owns the read half: it answers
//! server `PING`s so the connection survives long idle stretches, and
//! marks the connection dead on EOF or `ERROR`.

pub mod message;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::core::error::TransportError;
use crate::core::ports::ChatTransport;

pub use message::{MAX_LINE_BYTES, Message, frame, frame_privmsg};

const RPL_WELCOME: u16 = 1;
const RPL_ENDOFNAMES: u16 = 366;
const ERR_ERRONEUSNICKNAME: u16 = 432;
const ERR_NICKNAMEINUSE: u16 = 433;
const ERR_PASSWDMISMATCH: u16 = 464;
const ERR_YOUREBANNEDCREEP: u16 = 465;
const JOIN_ERRORS: [u16; 7] = [403, 405, 471, 473, 474, 475, 477];

/// Alternative nicks tried after the configured one is taken
const MAX_NICK_RETRIES: u32 = 5;

/// Lines kept for `join` to inspect; older ones are dropped
const INBOX_CAPACITY: usize = 64;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcConfig {
    /// Server address as `host:port`
    pub address: String,
    /// Preferred nickname
    pub nick: String,
    /// Username (ident)
    pub user: String,
    /// Real name
    pub realname: String,
    /// Sent with `QUIT` when disconnecting
    pub quit_message: String,
}

impl IrcConfig {
    /// Settings using `nick` for nick, user and real name
    #[must_use]
    pub fn new(address: impl Into<String>, nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            address: address.into(),
            user: nick.clone(),
            realname: nick.clone(),
            nick,
            quit_message: "Bye-bye-bye-bye-bye-bye-bye!!".to_string(),
        }
    }
}

struct Connection {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    inbox: mpsc::Receiver<Message>,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    nick: String,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// IRC client speaking just enough of the protocol to post to a channel
pub struct IrcTransport {
    config: IrcConfig,
    conn: Option<Connection>,
}

impl std::fmt::Debug for IrcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcTransport")
            .field("config", &self.config)
            .field("nick", &self.conn.as_ref().map(|c| c.nick.as_str()))
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl IrcTransport {
    /// Create an unconnected transport
    #[must_use]
    pub const fn new(config: IrcConfig) -> Self {
        Self { config, conn: None }
    }

    /// Nick in use on the current connection
    #[must_use]
    pub fn nick(&self) -> Option<&str> {
        self.conn.as_ref().map(|c| c.nick.as_str())
    }

    fn connection(&mut self) -> Result<&mut Connection, TransportError> {
        match &mut self.conn {
            Some(conn) if conn.alive.load(Ordering::Acquire) => Ok(conn),
            _ => Err(TransportError::Disconnected),
        }
    }
}

#[async_trait]
impl ChatTransport for IrcTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.conn = None;

        log::info!("Connecting to {}...", self.config.address);
        let stream = TcpStream::connect(&self.config.address).await.map_err(|e| TransportError::Connect {
            address: self.config.address.clone(),
            reason: e.to_string(),
        })?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let nick = register(&self.config, &mut reader, &mut write_half).await?;
        log::info!("Registered on {} as {nick}", self.config.address);

        let writer = Arc::new(Mutex::new(write_half));
        let alive = Arc::new(AtomicBool::new(true));
        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let reader = tokio::spawn(read_loop(reader, Arc::clone(&writer), Arc::clone(&alive), tx));

        self.conn = Some(Connection {
            writer,
            inbox,
            alive,
            reader,
            nick,
        });
        Ok(())
    }

    async fn join(&mut self, channel: &str) -> Result<(), TransportError> {
        let conn = self.connection()?;
        while conn.inbox.try_recv().is_ok() {}

        log::info!("Joining {channel}");
        conn.writer.lock().await.write_all(frame("JOIN", &[channel], None).as_bytes()).await?;

        while let Some(msg) = conn.inbox.recv().await {
            let Some(code) = msg.numeric() else {
                continue;
            };
            if !msg.param(1).eq_ignore_ascii_case(channel) {
                continue;
            }
            if code == RPL_ENDOFNAMES {
                return Ok(());
            }
            if JOIN_ERRORS.contains(&code) {
                return Err(TransportError::Join {
                    channel: channel.to_string(),
                    reason: format!("{code}: {}", msg.trailing()),
                });
            }
        }
        Err(TransportError::Disconnected)
    }

    async fn send_line(&mut self, channel: &str, text: &str) -> Result<(), TransportError> {
        let conn = self.connection()?;
        let line = frame_privmsg(channel, text);
        let mut writer = conn.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        log::info!("Disconnecting from {}", self.config.address);
        let mut writer = conn.writer.lock().await;
        if conn.alive.load(Ordering::Acquire) {
            writer.write_all(frame("QUIT", &[], Some(self.config.quit_message.as_str())).as_bytes()).await?;
        }
        if let Err(e) = writer.shutdown().await {
            log::debug!("Shutdown after QUIT: {e}");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.alive.load(Ordering::Acquire))
    }
}

/// Send NICK/USER and read until the welcome reply; returns the nick in use
async fn register(
    config: &IrcConfig,
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
) -> Result<String, TransportError> {
    let mut nick = config.nick.clone();
    writer.write_all(frame("NICK", &[nick.as_str()], None).as_bytes()).await?;
    writer
        .write_all(frame("USER", &[config.user.as_str(), "0", "*"], Some(config.realname.as_str())).as_bytes())
        .await?;

    let mut retries = 0;
    let mut buf = Vec::new();
    loop {
        let Some(line) = read_line_lossy(reader, &mut buf).await? else {
            return Err(TransportError::Registration("connection closed by server".to_string()));
        };
        let Some(msg) = Message::parse(&line) else {
            continue;
        };
        log::debug!("<< {}", line.trim_end());

        match (msg.command.as_str(), msg.numeric()) {
            ("PING", _) => {
                writer.write_all(frame("PONG", &[], Some(msg.trailing())).as_bytes()).await?;
            },
            ("ERROR", _) => return Err(TransportError::Registration(msg.trailing().to_string())),
            (_, Some(RPL_WELCOME)) => return Ok(nick),
            (_, Some(ERR_NICKNAMEINUSE)) => {
                retries += 1;
                if retries > MAX_NICK_RETRIES {
                    return Err(TransportError::NickInUse(config.nick.clone()));
                }
                nick = format!("{}{retries}", config.nick);
                log::warn!("Nickname in use, trying {nick}");
                writer.write_all(frame("NICK", &[nick.as_str()], None).as_bytes()).await?;
            },
            (_, Some(code @ (ERR_ERRONEUSNICKNAME | ERR_PASSWDMISMATCH | ERR_YOUREBANNEDCREEP))) => {
                return Err(TransportError::Registration(format!("{code}: {}", msg.trailing())));
            },
            _ => {},
        }
    }
}

/// Background reader: keepalive replies and liveness tracking
async fn read_loop(
    mut reader: BufReader<OwnedReadHalf>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    alive: Arc<AtomicBool>,
    inbox: mpsc::Sender<Message>,
) {
    let mut buf = Vec::new();
    loop {
        let line = match read_line_lossy(&mut reader, &mut buf).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::warn!("Server closed the connection");
                break;
            },
            Err(e) => {
                log::warn!("Connection lost: {e}");
                break;
            },
        };
        let Some(msg) = Message::parse(&line) else {
            continue;
        };
        log::debug!("<< {}", line.trim_end());

        match msg.command.as_str() {
            "PING" => {
                let pong = frame("PONG", &[], Some(msg.trailing()));
                if let Err(e) = writer.lock().await.write_all(pong.as_bytes()).await {
                    log::warn!("Cannot answer PING: {e}");
                    break;
                }
            },
            "ERROR" => {
                log::warn!("Server error: {}", msg.trailing());
                break;
            },
            _ => {
                let _ = inbox.try_send(msg);
            },
        }
    }
    alive.store(false, Ordering::Release);
}

/// Read one line as text; `None` at end of stream
///
/// Servers relay whatever bytes clients send, so text in other encodings
/// is decoded lossily instead of failing the read.
async fn read_line_lossy(
    reader: &mut BufReader<OwnedReadHalf>,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
