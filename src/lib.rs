pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod server;
pub mod sink;

pub use crate::{
    config::{AppConfig, ProcessorConfig},
    context::RequestContext,
    error::{ConfigError, ProcessingError},
    server::ExtProcService,
    sink::{LoggingSink, RequestSink},
};
