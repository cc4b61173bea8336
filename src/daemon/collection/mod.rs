pub mod collector;
pub mod hotkey;
pub mod listener;
pub mod mouse;
