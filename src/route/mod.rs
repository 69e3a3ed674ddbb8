pub mod docs;
pub mod feed;
pub mod follow;
pub mod model;
pub mod post;
