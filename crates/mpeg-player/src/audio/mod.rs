pub mod feeder;
pub mod output;

pub use feeder::AudioFeeder;
pub use output::{CpalBackend, CpalStream};
