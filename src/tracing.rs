use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Targets that are too chatty to be useful at trace level
const NOISY_TARGETS: [&str; 5] = ["hyper", "hyper_util", "h2", "reqwest", "mio"];

/// Handle that allows changing max log level after subscriber is initiated.
///
/// Level is known only after configuration is resolved but we want to see logs of resolving the configuration.
#[derive(Debug, Clone)]
pub struct TracerHandle(reload::Handle<LevelFilter, Registry>);

impl TracerHandle {
    pub fn set_max_level(&self, level: Level) {
        if let Err(e) = self.0.reload(LevelFilter::from_level(level)) {
            tracing::error!("Failed to change log level: {e}");
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        NOISY_TARGETS
            .iter()
            .fold(EnvFilter::new("trace"), |filter, target| {
                match format!("{target}=warn").parse() {
                    Ok(directive) => filter.add_directive(directive),
                    Err(_) => filter,
                }
            })
    })
}

pub fn init_tracer(max_level: Level) -> TracerHandle {
    let (level_layer, handle) = reload::Layer::new(LevelFilter::from_level(max_level));
    tracing_subscriber::registry()
        .with(level_layer)
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
    TracerHandle(handle)
}
