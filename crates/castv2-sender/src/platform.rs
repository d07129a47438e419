//! Session orchestration: connect handshake, keep-alive, and the
//! launch/restore/join workflow for one device.

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use castv2_core::device::Device;
use castv2_core::protocol::payload::AppSession;
use castv2_core::{CastError, Result};

use crate::config::SenderConfig;
use crate::controller::{Connection, Heartbeat, Media, Receiver};
use crate::transport::{Link, Transport};

/// Default Media Receiver, the stock playback app every cast device ships.
pub const DEFAULT_MEDIA_RECEIVER_APP_ID: &str = "CC1AD845";

const PLATFORM_SOURCE_ID: &str = "sender-0";
const PLATFORM_DESTINATION_ID: &str = "receiver-0";

/// Closed set of remote receiver applications the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    DefaultMediaReceiver,
}

impl AppKind {
    pub fn app_id(self) -> &'static str {
        match self {
            AppKind::DefaultMediaReceiver => DEFAULT_MEDIA_RECEIVER_APP_ID,
        }
    }
}

/// Client-side proxy for one running receiver application. Owns its own
/// virtual connection, scoped to a per-app source id and the session's
/// transport id.
pub struct Application {
    kind: AppKind,
    session: AppSession,
    connection: Connection,
    pub media: Media,
}

impl Application {
    pub fn kind(&self) -> AppKind {
        self.kind
    }

    pub fn session(&self) -> &AppSession {
        &self.session
    }

    /// Announce departure from the app's transport channel.
    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }
}

/// Orchestrates one device session: the platform-level virtual connection,
/// keep-alive, and receiver control under the fixed `sender-0`/`receiver-0`
/// ids.
///
/// There is no automatic reconnection: when the transport drops, `closed()`
/// resolves and the caller decides whether to build a fresh platform.
pub struct Platform {
    link: Link,
    transport: Option<Transport>,
    config: SenderConfig,
    connection: Connection,
    receiver: Receiver,
    keepalive: JoinHandle<()>,
    pong_observer: JoinHandle<()>,
    active: Mutex<Option<AppSession>>,
}

impl Platform {
    /// Connect to a device and bring the channel to the ready state: TLS
    /// handshake, virtual CONNECT, keep-alive armed. Requests may be issued
    /// as soon as this returns.
    pub async fn connect(device: &Device, config: SenderConfig) -> Result<Platform> {
        config.validate()?;
        let transport = Transport::connect(&device.host, device.port, &config).await?;
        tracing::info!(device = %device.name, "platform connecting");
        let mut platform = Self::attach(transport.link(), config).await?;
        platform.transport = Some(transport);
        Ok(platform)
    }

    /// Build a platform over an existing link. The virtual CONNECT is sent
    /// and the keep-alive timer armed before this returns.
    pub async fn attach(link: Link, config: SenderConfig) -> Result<Platform> {
        config.validate()?;
        let connection = Connection::new(link.clone(), PLATFORM_SOURCE_ID, PLATFORM_DESTINATION_ID);
        let heartbeat = Heartbeat::new(link.clone(), PLATFORM_SOURCE_ID, PLATFORM_DESTINATION_ID);
        let receiver = Receiver::new(
            link.clone(),
            PLATFORM_SOURCE_ID,
            PLATFORM_DESTINATION_ID,
            config.request_timeout(),
        );

        connection.connect().await?;
        let pong_observer = heartbeat.observe();

        let interval = config.keepalive_interval();
        let keepalive = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the CONNECT just went out,
            // so start the cadence one period later.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if heartbeat.ping().await.is_err() {
                    break;
                }
            }
        });

        Ok(Platform {
            link,
            transport: None,
            config,
            connection,
            receiver,
            keepalive,
            pong_observer,
            active: Mutex::new(None),
        })
    }

    /// Receiver-level status/volume controls.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub async fn get_volume(&self) -> Result<f64> {
        self.receiver.get_volume().await
    }

    pub async fn set_volume(&self, level: f64) -> Result<Value> {
        self.receiver.set_volume(level).await
    }

    /// Join an already-running session: announce a per-app connection on
    /// the session's transport id and hand back the application proxy.
    pub async fn join(&self, session: &AppSession, kind: AppKind) -> Result<Application> {
        let source_id = format!("client-{}", rand::random::<u32>() % 1_000_000);
        let connection = Connection::new(self.link.clone(), &source_id, &session.transport_id);
        connection.connect().await?;
        let media = Media::new(
            self.link.clone(),
            &source_id,
            &session.transport_id,
            self.config.request_timeout(),
        );
        tracing::info!(
            app_id = %session.app_id,
            session_id = %session.session_id,
            "joined session"
        );
        *self.active.lock().await = Some(session.clone());
        Ok(Application {
            kind,
            session: session.clone(),
            connection,
            media,
        })
    }

    /// Join the running session for `kind`, or report that none exists.
    /// Never launches.
    pub async fn restore(&self, kind: AppKind) -> Result<Option<Application>> {
        let sessions = self.receiver.get_sessions().await?;
        match Receiver::app_session(kind.app_id(), &sessions) {
            Some(session) => {
                let session = session.clone();
                Ok(Some(self.join(&session, kind).await?))
            }
            None => Ok(None),
        }
    }

    /// Launch a fresh instance of `kind` and join it.
    pub async fn launch(&self, kind: AppKind) -> Result<Application> {
        let session = self.receiver.launch(kind.app_id()).await?;
        self.join(&session, kind).await
    }

    /// The normal playback entry point: prefer joining an already-running
    /// app over spawning a duplicate; launch only when nothing is running.
    pub async fn restore_or_launch(&self, kind: AppKind) -> Result<Application> {
        match self.restore(kind).await? {
            Some(app) => Ok(app),
            None => self.launch(kind).await,
        }
    }

    /// Stop the active session and close the virtual connection. The grace
    /// delay stands in for a real acknowledgment; the device may still be
    /// tearing the app down when this returns.
    pub async fn stop(&self) -> Result<()> {
        let session = self
            .active
            .lock()
            .await
            .take()
            .ok_or(CastError::NoCurrentSession)?;
        self.receiver.stop(&session.session_id).await?;
        self.connection.disconnect().await?;
        tokio::time::sleep(self.config.stop_grace()).await;
        Ok(())
    }

    /// Announce CLOSE and cancel the keep-alive timer. The socket itself is
    /// torn down when the platform (and its transport) is dropped.
    pub async fn disconnect(&self) -> Result<()> {
        let sent = self.connection.disconnect().await;
        self.keepalive.abort();
        self.pong_observer.abort();
        sent
    }

    /// Resolves when the underlying transport drops. Immediately resolves
    /// for link-attached platforms that own no transport.
    pub async fn closed(&self) {
        if let Some(transport) = &self.transport {
            transport.closed().await;
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.keepalive.abort();
        self.pong_observer.abort();
    }
}
