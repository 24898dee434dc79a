pub mod client;
pub mod models;

pub use client::{connect_stream, send_message};
pub use models::{
    AuthorizeRequest, InboundMessage, MarkupStatisticsRequest, OutboundMessage,
};
