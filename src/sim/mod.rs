pub mod carry;
pub mod collision;
pub mod event;
pub mod level;
pub mod lifecycle;
pub mod movement;
pub mod save;
pub mod session;
pub mod step;
pub mod world;
