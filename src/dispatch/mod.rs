pub mod feed;
pub mod lifecycle;
