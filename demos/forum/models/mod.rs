pub mod board;
pub mod post;
