use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Fixed port the backend listens on.
pub const BACKEND_PORT: u16 = 3001;

/// Fixed port the frontend dev server listens on.
pub const FRONTEND_PORT: u16 = 5173;

/// Default connect timeout for a probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Whether something is already listening on `127.0.0.1:<port>`.
///
/// Any connect error (refused, timeout, unreachable) counts as closed. This is a
/// heuristic: the port may be taken between the probe and a later bind.
/// `timeout` must be non-zero; a zero duration makes every port read as closed.
pub fn is_port_open(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpStream::connect_timeout(&addr, timeout).is_ok()
}
