//! Cryptographic building blocks for record protection.

mod aead;
pub use aead::{AeadCipher, Nonce, NONCE_LEN, TAG_LEN};

mod authenticator;
pub use authenticator::{AuthBytes, Authenticator};

mod block;
pub use block::CbcCipher;

mod bulk;
pub use bulk::{BulkCipher, CipherKind, KeyLengthPolicy, Scheme, Unlimited};

mod mac;
pub use mac::{calculate_remaining_len, compare_mac_tags, MacAlg, MacTag, RecordMac, TagCheck};

pub mod padding;

mod stream;
pub use stream::Rc4Cipher;
