pub mod replay;

pub use replay::ReplayModel;
