pub(crate) mod health;
pub mod resumes;

pub use health::health_check;
