//! Ports: the acceptor's API and the interfaces it depends on.

pub mod inbound;
pub mod outbound;

pub use inbound::{AcceptorApi, SessionAcceptor};
pub use outbound::{
    session_ready_channel, ConfigProvider, ConnectFuture, PipeSession, ServiceEvent,
    ServiceListener, SessionHandler, SessionReady,
};
