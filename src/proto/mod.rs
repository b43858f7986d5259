//! Wire envelope exchanged between the control plane and workers.
//!
//! Hand-written prost messages (no build step); the field tags are the wire
//! contract between the API and worker processes, so changing a tag is a
//! breaking protocol change. The envelope travels either as a Redis pub/sub
//! payload or as the body of a direct-mode HTTP call.

/// Content type required on direct-mode receive endpoints.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/protobuf";

/// Correlation id header propagated from the control plane to workers.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Abstract delivery target. Exactly one selector is authoritative;
/// precedence when several are set: connection id > channel > user(+session).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Target {
    #[prost(string, tag = "1")]
    pub connection: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub user: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub session: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub channel: ::prost::alloc::string::String,
}

/// A message pushed to matching sockets, or an order to disconnect them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub body: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub target: ::core::option::Option<Target>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Text = 0,
    Binary = 1,
    Disconnect = 2,
}

/// A subscribe/unsubscribe order applied to matching sockets.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelAction {
    #[prost(enumeration = "ChannelActionType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub channel: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub target: ::core::option::Option<Target>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelActionType {
    Subscribe = 0,
    Unsubscribe = 1,
}
