mod args;
mod err;
mod exec;

pub use args::*;
pub use err::*;
