use crate::config;
use once_cell::sync::Lazy;
pub use slog::*;

/// Number of leading characters of an image payload that may appear in logs.
pub const PREVIEW_CHARS: usize = 50;

fn wrap<D>(drain: D) -> Fuse<slog_async::Async>
where
    D: Drain<Err = Never, Ok = ()> + Send + 'static,
{
    slog_async::Async::new(slog_envlogger::new(drain))
        .chan_size(2 << 12)
        .thread_name("slog-async".into())
        .build()
        .fuse()
}

pub static DEFAULT: Lazy<Logger> = Lazy::new(|| {
    let mk_term = || {
        slog_term::FullFormat::new(slog_term::TermDecorator::new().build())
            .build()
            .fuse()
    };

    let mk_json = || slog_json::Json::default(std::io::stdout()).fuse();

    let format = config::get("RUST_LOG_FORMAT").unwrap_or_default();
    let drain = match format.as_str() {
        "json" => wrap(mk_json()),
        _ => wrap(mk_term()),
    };

    Logger::root(
        drain,
        o!(
            "version" => env!("CARGO_PKG_VERSION"),
        ),
    )
});

/// The first `PREVIEW_CHARS` characters, cut on a char boundary.
pub fn preview(value: &str) -> &str {
    match value.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
