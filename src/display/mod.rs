pub mod pump;
pub mod snapshot;
pub mod terminal;
