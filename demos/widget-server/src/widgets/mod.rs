pub mod controller;
pub mod middleware;
pub mod model;
pub mod store;

pub use controller::WidgetController;
pub use store::WidgetStore;
