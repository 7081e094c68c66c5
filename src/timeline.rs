pub mod compose;
pub mod model;
