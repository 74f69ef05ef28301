pub mod post;

pub use post::{run, run_with, RandomFramePost};
