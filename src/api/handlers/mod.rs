pub mod download_file;
pub mod health;
pub mod process_crimes;
