//! Line-oriented TCP event server
//!
//! Every accepted connection is an independent session with its own
//! [`EventDispatcher`]. Each newline-terminated line is one message.
//! Sessions end on EOF or read error; the listener keeps accepting.

use crate::dispatcher::EventDispatcher;
use crate::error::Result;
use crate::pitch_map::PitchMap;
use crate::queue::PlaybackQueue;
use crate::synth::NoteSettings;
use crate::timbre::Timbre;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info};

/// Builds a fresh dispatcher for each session
#[derive(Clone)]
pub struct SessionFactory {
    pitch_map: Arc<PitchMap>,
    queue: PlaybackQueue,
    settings: NoteSettings,
    default_timbre: Timbre,
}

impl SessionFactory {
    pub fn new(
        pitch_map: Arc<PitchMap>,
        queue: PlaybackQueue,
        settings: NoteSettings,
        default_timbre: Timbre,
    ) -> Self {
        Self {
            pitch_map,
            queue,
            settings,
            default_timbre,
        }
    }

    pub fn new_session(&self) -> EventDispatcher {
        EventDispatcher::new(
            self.pitch_map.clone(),
            self.queue.clone(),
            self.settings,
            self.default_timbre,
        )
    }
}

/// Feed every line from `reader` to `dispatcher` until EOF
pub async fn run_session<R>(
    mut reader: R,
    dispatcher: &mut EventDispatcher,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }

        let payload = trim_line_ending(&line);
        if payload.is_empty() {
            continue;
        }
        dispatcher.handle_message(payload);
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub struct EventServer {
    listener: TcpListener,
    sessions: SessionFactory,
}

impl EventServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A, sessions: SessionFactory) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Keytone event server listening on {}", listener.local_addr()?);
        Ok(Self { listener, sessions })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept sessions until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Event server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => error!("Accept error: {}", e),
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let mut dispatcher = self.sessions.new_session();
        info!("Session opened: {}", peer);

        tokio::spawn(async move {
            if let Err(e) = run_session(BufReader::new(stream), &mut dispatcher).await {
                error!("Read error from {}: {}", peer, e);
            }
            debug!("Session {} stats: {:?}", peer, dispatcher.stats());
        });
    }
}
