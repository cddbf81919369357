//! Readiness notification for process supervisors.
//!
//! Implements the sending side of the systemd notify protocol: a single
//! datagram to the socket named by `NOTIFY_SOCKET`. Outside systemd the
//! variable is unset and [`from_env`] hands out a [`NoopNotifier`].

use thiserror::Error;

/// Environment variable naming the supervisor socket.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Message announcing that startup work is done.
pub const READY_MESSAGE: &str = "READY=1";

/// Errors from sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to reach notify socket '{socket}': {source}")]
    Io {
        socket: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notify socket '{0}' is not supported on this platform")]
    Unsupported(String),
}

/// Receives the one-shot readiness signal.
pub trait ReadinessNotifier: Send + Sync {
    /// Signal readiness to the supervisor.
    fn notify_ready(&self) -> Result<(), NotifyError>;
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn notify_ready(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Sends `READY=1` to a systemd notify socket.
///
/// Socket names starting with `@` are Linux abstract socket names.
#[derive(Debug, Clone)]
pub struct SystemdNotifier {
    socket: String,
}

impl SystemdNotifier {
    pub fn new(socket: impl Into<String>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Notifier for `NOTIFY_SOCKET`, if the variable is set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var(NOTIFY_SOCKET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn socket(&self) -> &str {
        &self.socket
    }

    #[cfg(unix)]
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        use std::os::unix::net::UnixDatagram;

        let io_err = |source| NotifyError::Io {
            socket: self.socket.clone(),
            source,
        };
        let socket = UnixDatagram::unbound().map_err(io_err)?;

        if let Some(name) = self.socket.strip_prefix('@') {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            {
                #[cfg(target_os = "android")]
                use std::os::android::net::SocketAddrExt;
                #[cfg(target_os = "linux")]
                use std::os::linux::net::SocketAddrExt;

                let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())
                    .map_err(io_err)?;
                socket
                    .send_to_addr(message.as_bytes(), &addr)
                    .map_err(io_err)?;
                return Ok(());
            }
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            {
                let _ = name;
                return Err(NotifyError::Unsupported(self.socket.clone()));
            }
        }

        socket
            .send_to(message.as_bytes(), &self.socket)
            .map_err(io_err)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn send(&self, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported(self.socket.clone()))
    }
}

impl ReadinessNotifier for SystemdNotifier {
    fn notify_ready(&self) -> Result<(), NotifyError> {
        self.send(READY_MESSAGE)
    }
}

/// Systemd notifier when running under systemd, otherwise a no-op.
pub fn from_env() -> Box<dyn ReadinessNotifier> {
    match SystemdNotifier::from_env() {
        Some(notifier) => {
            tracing::debug!(socket = %notifier.socket(), "Readiness notifications enabled");
            Box::new(notifier)
        }
        None => Box::new(NoopNotifier),
    }
}
