pub mod garantex;

pub use garantex::GarantexConnector;
