//! NetMirror Client
//!
//! HTTP client and resolution pipeline for NetMirror-style sites: a mirror
//! exposing `search.php`, `post.php`, `episodes.php` and `playlist.php`
//! JSON endpoints behind a session cookie.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mirrorlink_providers::netmirror::{
//!     build_http_client, CookieSource, CookieSupplier, HttpOptions, MediaQuery,
//!     NetMirrorClient, NoProgress, RelayMode, Resolver, StreamAssembler,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = build_http_client(&HttpOptions::default())?;
//! let client = NetMirrorClient::new("https://netfree.cc/", http.clone())?;
//! let cookies = CookieSupplier::new(CookieSource::Static("t_hash_t=...".into()), http);
//! let assembler = StreamAssembler::new("https://netfree.cc/", RelayMode::Direct)?;
//! let resolver = Resolver::new(Arc::new(client), Arc::new(cookies), assembler);
//!
//! let stream = resolver
//!     .resolve(&MediaQuery::show("Dark", 2017, 1, 1), &CancellationToken::new(), &NoProgress)
//!     .await?;
//! println!("{}", stream.playlist);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
mod client;
pub mod credential;
pub mod resolver;
pub mod service;
pub mod title;
pub mod types;

pub use assembler::{RelayMode, StreamAssembler};
pub use client::{build_http_client, Endpoint, HttpOptions, NetMirrorClient, DEFAULT_USER_AGENT};
pub use credential::{CookieSource, CookieSupplier, DEFAULT_COOKIE_POINTER};
pub use resolver::{select_source, NoProgress, ProgressSink, Resolver};
pub use service::{CredentialSupplier, MirrorTransport};
pub use types::*;
