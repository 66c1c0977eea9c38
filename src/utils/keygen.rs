//! Content-addressed short key derivation

use sha2::{Digest, Sha256};

/// Length of every derived short key.
pub const KEY_LEN: usize = 16;

/// 由内容派生短链接 key
///
/// SHA-256 摘要的每个字节折叠到 `a..=z`（`b'a' + byte % 26`），取前 16 位。
/// 相同输入总是得到相同 key。
pub fn derive_key(content: &[u8]) -> String {
    Sha256::digest(content)
        .iter()
        .take(KEY_LEN)
        .map(|byte| (b'a' + byte % 26) as char)
        .collect()
}

/// Whether `key` has the shape produced by [`derive_key`].
pub fn is_valid_key(key: &str) -> bool {
    key.len() == KEY_LEN && key.bytes().all(|b| b.is_ascii_lowercase())
}
