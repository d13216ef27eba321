//! Subscriber assembly.
//!
//! Built once at startup and installed as the default dispatcher for the
//! duration of the boot. Records go to `/dev/kmsg` when it can be opened,
//! otherwise to stderr as plain structured text.

use std::path::Path;

use layerinit_common::constants::KMSG_PATH;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::layer::SubscriberExt;

use crate::kmsg::KmsgLayer;

/// Builds the logger handle. Respects `RUST_LOG`, defaulting to `info`.
pub fn init() -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (kmsg, kmsg_error) = match KmsgLayer::open(Path::new(KMSG_PATH)) {
        Ok(layer) => (Some(layer), None),
        Err(e) => (None, Some(e)),
    };
    let stderr = kmsg.is_none().then(|| plain_layer(std::io::stderr));

    let dispatch = Dispatch::new(
        tracing_subscriber::registry()
            .with(filter)
            .with(kmsg)
            .with(stderr),
    );

    if let Some(e) = kmsg_error {
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!(path = KMSG_PATH, error = %e, "kernel log unavailable, logging to stderr");
        });
    }
    dispatch
}

/// Plain-text formatter for consoles that cannot render colour codes.
fn plain_layer<S, W>(writer: W) -> tracing_subscriber::fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
}
