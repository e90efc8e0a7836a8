pub mod dto;
pub mod handlers;
mod routes;

pub use routes::{DOWNLOAD_FILE_PATH, PROCESS_FILES_PATH, routes};
