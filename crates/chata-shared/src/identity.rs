use std::fmt;
use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs1::{
    der::pem, DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey,
    LineEnding,
};
use rsa::{Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants::{FILE_MODE, PEM_PRIVATE_LABEL, PEM_PUBLIC_LABEL, RSA_KEY_BITS};
use crate::error::IdentityError;

/// A user's cryptographic identity based on an RSA keypair.
///
/// Holds either both halves of the keypair, only the public half, or nothing
/// at all (a freshly constructed empty identity). When the private key is
/// present the public key is always the one derived from it.
#[derive(Clone, Default)]
pub struct Identity {
    private: Option<RsaPrivateKey>,
    public: Option<RsaPublicKey>,
}

impl Identity {
    /// Generate a new random identity.
    ///
    /// # Panics
    /// Panics if the operating system cannot provide entropy for key
    /// generation. A process without its own identity cannot continue.
    pub fn generate() -> Self {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .unwrap_or_else(|e| panic!("failed to generate RSA keypair: {e}"));
        Self::from_private(private)
    }

    /// An identity holding neither key.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self {
            private: Some(private),
            public: Some(public),
        }
    }

    /// An identity that can only verify and encrypt.
    pub fn from_public(public: RsaPublicKey) -> Self {
        Self {
            private: None,
            public: Some(public),
        }
    }

    /// Parse a PEM envelope holding either a private or a public PKCS#1 key.
    pub fn parse(text: &[u8]) -> Result<Self, IdentityError> {
        let text = std::str::from_utf8(text).map_err(|_| IdentityError::BadEnvelope)?;
        let label = pem::decode_label(text.as_bytes()).map_err(|_| IdentityError::BadEnvelope)?;

        match label {
            PEM_PRIVATE_LABEL => Ok(Self::from_private(RsaPrivateKey::from_pkcs1_pem(text)?)),
            PEM_PUBLIC_LABEL => Ok(Self::from_public(RsaPublicKey::from_pkcs1_pem(text)?)),
            other => Err(IdentityError::UnknownBlock(other.to_string())),
        }
    }

    /// Encode the key material as a PEM envelope. A private-bearing identity
    /// is written as a private key block, otherwise as a public key block.
    pub fn to_pem(&self) -> Result<String, IdentityError> {
        if let Some(private) = &self.private {
            let pem = private.to_pkcs1_pem(LineEnding::LF)?;
            return Ok(pem.as_str().to_owned());
        }
        if let Some(public) = &self.public {
            return Ok(public.to_pkcs1_pem(LineEnding::LF)?);
        }
        Err(IdentityError::Empty)
    }

    /// Best-effort PEM text; empty when the identity cannot be encoded.
    pub fn to_text(&self) -> String {
        self.to_pem().unwrap_or_default()
    }

    /// Read and parse a PEM key file.
    pub fn load_from_file(path: &Path) -> Result<Self, IdentityError> {
        let text = std::fs::read(path)?;
        Self::parse(&text)
    }

    /// Write the PEM envelope to `path`, readable by the owner only.
    pub fn save_to_file(&self, path: &Path) -> Result<(), IdentityError> {
        let text = self.to_pem()?;
        std::fs::write(path, text)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))?;
        }

        Ok(())
    }

    /// A new identity holding only the public key.
    pub fn public_view(&self) -> Self {
        Self {
            private: None,
            public: self.public.clone(),
        }
    }

    /// Drop the private key in place.
    pub fn downgrade(&mut self) {
        self.private = None;
    }

    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_none()
    }

    /// Sign the SHA-256 digest of `message` with PKCS#1 v1.5 padding.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let private = self.private.as_ref().ok_or(IdentityError::NoPrivateKey)?;
        let digest = Sha256::digest(message);
        Ok(private.sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), &digest)?)
    }

    /// Verify a signature over `message`. Uses `public_key` when given,
    /// otherwise this identity's own public key.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: Option<&RsaPublicKey>,
    ) -> Result<(), IdentityError> {
        let public = self.resolve_public(public_key)?;
        let digest = Sha256::digest(message);
        Ok(public.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)?)
    }

    /// RSA-OAEP (SHA-256, empty label) encryption. Output differs on every
    /// call because the padding is seeded from fresh randomness.
    pub fn encrypt(
        &self,
        message: &[u8],
        public_key: Option<&RsaPublicKey>,
    ) -> Result<Vec<u8>, IdentityError> {
        let public = self.resolve_public(public_key)?;
        Ok(public.encrypt(&mut OsRng, Oaep::new::<Sha256>(), message)?)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let private = self.private.as_ref().ok_or(IdentityError::NoPrivateKey)?;
        Ok(private.decrypt(Oaep::new::<Sha256>(), ciphertext)?)
    }

    fn resolve_public<'a>(
        &'a self,
        public_key: Option<&'a RsaPublicKey>,
    ) -> Result<&'a RsaPublicKey, IdentityError> {
        public_key
            .or(self.public.as_ref())
            .ok_or(IdentityError::NoPublicKey)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("private", &self.private.is_some())
            .field("public", &self.public.is_some())
            .finish()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_pem().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Identity::parse(text.as_bytes()).map_err(de::Error::custom)
    }
}
