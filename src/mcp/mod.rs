pub mod prompts;
pub mod server;
pub mod types;

pub use server::ReflectMcp;
