pub mod flash;

pub use flash::{set_flash, take_flash, Flash, FlashLevel};
