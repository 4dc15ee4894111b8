mod ffprobe_info;
mod filename_sanitizer;
mod path_validator;
mod timestamp_parser;

pub use ffprobe_info::{MediaInfo, inspect_media};
pub use filename_sanitizer::{
    DEFAULT_FILENAME, MAX_FILENAME_LENGTH, sanitize_filename, sanitize_text,
};
pub use path_validator::{ensure_directory_exists, is_non_empty_file};
pub use timestamp_parser::{
    DEFAULT_FALLBACK_INTERVAL, FALLBACK_SECONDS, TimestampParseError, TimestampToken,
    format_hms, generate_interval_timestamps, parse_timestamp, resolve_batch, resolve_token,
    try_parse_timestamp,
};
