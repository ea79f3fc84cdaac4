pub mod proxy;
pub mod stream;

pub use proxy::*;
pub use stream::*;
