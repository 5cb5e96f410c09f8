// Types and payload codec shared by the console's storage and client layers.

pub mod codec;
pub mod constants;
pub mod error;
pub mod types;

pub use codec::{decrypt, decrypt_as, encrypt};
pub use error::CodecError;
pub use types::{Envelope, MenuNode, ProjectRecord, ServerRecord};
