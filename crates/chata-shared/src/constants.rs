/// RSA modulus size in bits for freshly generated identities
pub const RSA_KEY_BITS: usize = 2048;

/// PEM label of a PKCS#1 private key block
pub const PEM_PRIVATE_LABEL: &str = "RSA PRIVATE KEY";

/// PEM label of a PKCS#1 public key block
pub const PEM_PUBLIC_LABEL: &str = "RSA PUBLIC KEY";

/// Owner read/write permissions for persisted key and record files
pub const FILE_MODE: u32 = 0o600;

/// Separator used when joining role tokens
pub const ROLE_DELIMITER: &str = ",";
