pub mod annotate;
pub mod classify;
pub mod core;
pub mod crossnode;
pub mod engine;
pub mod overlay;
pub mod patterns;
pub mod processed;
pub mod schedule;
pub mod state;
pub mod viewport;
pub mod wasm;

pub use annotate::*;
pub use classify::*;
pub use self::core::*;
pub use crossnode::*;
pub use engine::*;
pub use overlay::*;
pub use patterns::*;
pub use processed::*;
pub use schedule::*;
pub use state::*;
pub use viewport::*;
pub use wasm::*;
