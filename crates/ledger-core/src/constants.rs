pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const POW_DEFAULT_DIFFICULTY: usize = 2;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
