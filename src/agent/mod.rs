pub mod patch;
pub mod persona;
pub mod prompt;

pub use persona::Persona;
