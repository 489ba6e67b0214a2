pub mod edit;
pub mod scenario;
