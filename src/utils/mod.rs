pub mod date;
pub mod id;
pub mod logging;

pub use date::{format_relative, format_timestamp_ms, now_millis};
pub use id::{generate_id, generate_id_with_len, DEFAULT_ID_LEN};
pub use logging::init_logging;
