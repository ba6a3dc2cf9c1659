pub mod cost;
pub mod flows;
pub mod pricing;
pub mod state;

pub use cost::*;
pub use flows::*;
pub use pricing::*;
pub use state::*;
