pub mod alerts;
pub mod gaps;
pub mod health;
pub mod io;
pub mod prompts;

pub use alerts::*;
pub use gaps::*;
pub use health::*;
pub use io::*;
pub use prompts::*;
