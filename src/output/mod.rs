pub mod dispatcher;

pub use dispatcher::{default_filename, Delivery, OutputDispatcher};
