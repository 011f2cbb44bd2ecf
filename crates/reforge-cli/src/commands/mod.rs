pub mod due;
pub mod generate;
pub mod init;
pub mod review;
pub mod templates;
pub mod validate;
