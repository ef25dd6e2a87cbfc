pub mod decode;
pub mod operations;
