pub mod compositor;
#[cfg(feature = "sway")]
pub mod sway;
