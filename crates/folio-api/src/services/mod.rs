pub mod derivatives;
pub mod media;
