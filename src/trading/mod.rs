pub mod dispatcher;

pub use dispatcher::{DispatchReport, SignalDispatcher};
