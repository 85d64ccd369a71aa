pub mod debounce;
pub mod keyboard;
pub mod state;
