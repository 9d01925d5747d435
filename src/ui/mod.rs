pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, link_line, section, success, warn};
pub use table::{links_table, stats_table};
pub use theme::{theme, Theme};
