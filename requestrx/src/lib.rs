mod ticket;
mod request_error;
mod progress;
mod request_state;
mod call;
mod requestor;
mod stream_ext;
pub mod macros;


pub use ticket::*;
pub use request_error::*;
pub use progress::*;
pub use request_state::*;
pub use call::*;
pub use requestor::*;
pub use stream_ext::*;
