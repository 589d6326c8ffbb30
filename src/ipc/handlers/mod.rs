pub mod core;
pub mod results;
pub mod rules;
pub mod subjects;
