pub mod frys;

pub use frys::FrysChecker;
