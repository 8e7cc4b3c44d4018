mod ctype;
pub use ctype::ContentType;

mod version;
pub use version::ProtocolVersion;
