// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod exception;
pub mod listing;
pub mod mime;
pub mod param;
pub mod reload;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod tracker;
pub mod util;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use exception::Exception;
pub use mime::{ContentTyper, SniffConfig};
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use resolver::{PathResolver, ResolvedEntry, ServerRoot};
pub use response::Response;
pub use server::Server;
pub use tracker::{ChangeDetector, ScanTracker};
pub use util::HtmlBuilder;
