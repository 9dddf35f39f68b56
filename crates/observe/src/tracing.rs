use {
    crate::config::Config,
    std::{io::IsTerminal, panic::PanicHookInfo},
    time::macros::format_description,
    tracing::level_filters::LevelFilter,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup of the binaries.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

fn set_tracing_subscriber(config: &Config) {
    // Events are split between stdout and stderr by the configured threshold.
    let stderr_level = config
        .stderr_threshold
        .into_level()
        .unwrap_or(tracing::Level::ERROR);
    let writer = std::io::stdout
        .with_min_level(stderr_level)
        .or_else(std::io::stderr);

    let env_filter = EnvFilter::new(&config.env_filter);

    let fmt_layer = if config.use_json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(UtcTime::rfc_3339())
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_timer(UtcTime::new(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
            )))
            .with_ansi(std::io::stdout().is_terminal())
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(LevelFilter::TRACE)
        .with(fmt_layer)
        .init();
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
