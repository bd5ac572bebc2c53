pub mod driver;
pub mod order;
pub mod route;
pub mod stop;
pub mod time;
