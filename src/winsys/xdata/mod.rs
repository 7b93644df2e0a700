pub mod input;
pub mod util;
pub mod xconnection;
