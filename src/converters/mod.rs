pub mod line_protocol;
pub mod log_line;
pub mod loki;
pub mod tail;
