pub mod load;
pub mod save;
pub mod types;

pub use save::save_settings;
pub use types::{Config, Language, ResolveMode, SETTINGS_FILE, UserSettings};
