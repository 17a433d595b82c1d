//! Media storage implementations.

mod filesystem;

pub use filesystem::FileSystemStorage;
