pub mod entity;
pub mod grid;
pub mod registry;
pub mod rules;
