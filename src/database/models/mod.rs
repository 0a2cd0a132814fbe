pub mod activity;
pub mod signup;

pub use activity::*;
pub use signup::*;
