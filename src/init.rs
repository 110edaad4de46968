use crate::error::InitError;
use crate::layer::JsonLogLayer;
use crate::logger::JsonLogger;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

/// Install `logger` as the destination of all ambient output.
///
/// **Parameters**
/// - `logger`: [`JsonLogger`] whose formatter and sink receive every
///   `tracing` event in the process.
///
/// **Effects**
///
/// Sets a [`Registry`] combined with [`JsonLogLayer`] as the global
/// default subscriber and bridges records of the `log` crate into it, so
/// warnings raised by dependencies are rendered in the same schema.
///
/// **Returns**
/// - `Err(InitError::AlreadyInstalled)` if a global subscriber or `log`
///   logger was already set; the existing one stays in place.
pub fn init_tracing(logger: &JsonLogger) -> Result<(), InitError> {
    Registry::default()
        .with(JsonLogLayer::new(logger.clone()))
        .try_init()
        .map_err(|_| InitError::AlreadyInstalled)
}
