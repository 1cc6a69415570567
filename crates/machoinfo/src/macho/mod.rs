pub mod info;
pub mod parser;

pub use info::{executable_name, icon_name, MachoInfo};
pub use parser::{first_fat_slice, is_fat, MachOFile};
