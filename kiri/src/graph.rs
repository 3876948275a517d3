mod context;
mod error;
mod instance;
mod mem;
mod module;
mod ops;
mod register;
mod signal;
mod value;

pub use context::*;
pub use error::*;
pub use instance::*;
pub use mem::*;
pub use module::*;
pub use ops::*;
pub use register::*;
pub use signal::*;
pub use value::*;
