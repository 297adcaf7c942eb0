pub mod daemon;
pub mod list;
pub mod poll;
