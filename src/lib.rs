pub mod error;
pub mod level;
pub mod record;
pub mod schema;
pub mod correlation;
pub mod message;
pub mod formatter;
pub mod sink;
pub mod noop_sink;
pub mod logger;
pub mod redirect;
mod stdout_capture;
pub mod timing;
pub mod layer;
pub mod init;
pub mod env;

pub use correlation::{ContextId, CorrelationGuard, CorrelationRegistry};
pub use error::{InitError, LogError};
pub use level::Level;
pub use logger::{JsonLogger, LoggerConfig};
pub use record::{Fields, LogEvent};
pub use schema::{DebugInfo, LogDocument};
pub use sink::{LogSink, MemorySink, StdoutSink, WriterSink};
pub use layer::JsonLogLayer;
pub use noop_sink::NoopSink;
pub use redirect::StdoutRedirect;
pub use timing::Timeit;
