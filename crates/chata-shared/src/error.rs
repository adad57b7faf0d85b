use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,

    #[error("bad PEM envelope")]
    BadEnvelope,

    #[error("unknown PEM block: {0}")]
    UnknownBlock(String),

    #[error("no private key")]
    NoPrivateKey,

    #[error("no public key")]
    NoPublicKey,

    #[error("Key decode error: {0}")]
    KeyDecode(#[from] rsa::pkcs1::Error),

    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("Key file error: {0}")]
    KeyFile(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown role")]
    Invalid(u8),

    #[error("unknown role: {0}")]
    UnknownToken(String),
}
