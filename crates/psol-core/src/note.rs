//! The note/commitment model.
//!
//! A note is the owner-side record of a shielded balance:
//! `(secret, nullifier, amount, asset_id)` with
//! `commitment = h4(secret, nullifier, amount, asset_id)`. After batch
//! settlement the owner learns the note's leaf index; spending requires the
//! nullifier hash `h2(h2(nullifier, secret), leaf_index)`, which the chain
//! records exactly once.

use rand::{CryptoRng, RngCore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::asset::AssetId;
use crate::error::CoreError;
use crate::field::Element;
use crate::poseidon::{h2, h4};

/// An owner-held note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    secret: Element,
    nullifier: Element,
    amount: u64,
    asset_id: AssetId,
    commitment: Element,
    leaf_index: Option<u64>,
    root: Option<Element>,
}

impl Note {
    /// Creates a fresh note: samples `secret` and `nullifier` uniformly from
    /// the scalar field and computes the commitment.
    pub fn new<R: RngCore + CryptoRng>(
        amount: u64,
        asset_id: AssetId,
        rng: &mut R,
    ) -> Result<Self, CoreError> {
        let secret = Element::random(rng);
        let nullifier = Element::random(rng);
        let commitment = compute_commitment(secret, nullifier, amount, asset_id)?;
        Ok(Self {
            secret,
            nullifier,
            amount,
            asset_id,
            commitment,
            leaf_index: None,
            root: None,
        })
    }

    /// The stored commitment.
    pub fn commitment(&self) -> Element {
        self.commitment
    }

    /// The note secret.
    pub fn secret(&self) -> Element {
        self.secret
    }

    /// The note nullifier (pre-image, not the spent hash).
    pub fn nullifier(&self) -> Element {
        self.nullifier
    }

    /// The note amount in base units.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// The asset this note denominates.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// The leaf index assigned at settlement, if any.
    pub fn leaf_index(&self) -> Option<u64> {
        self.leaf_index
    }

    /// The Merkle root the owner recorded at settlement, if any.
    pub fn root(&self) -> Option<Element> {
        self.root
    }

    /// Records the settled position of this note.
    pub fn set_settled(&mut self, leaf_index: u64, root: Element) {
        self.leaf_index = Some(leaf_index);
        self.root = Some(root);
    }

    /// Recomputes the commitment from the note fields.
    pub fn recompute_commitment(&self) -> Result<Element, CoreError> {
        compute_commitment(self.secret, self.nullifier, self.amount, self.asset_id)
    }

    /// True when the stored commitment matches the recomputation.
    pub fn verify(&self) -> Result<bool, CoreError> {
        Ok(self.recompute_commitment()? == self.commitment)
    }

    /// The spend tag `h2(h2(nullifier, secret), leaf_index)`.
    ///
    /// Fails with [`CoreError::NoLeafIndex`] before settlement: the leaf
    /// index is part of the hash, so an unsettled note has no nullifier hash.
    pub fn nullifier_hash(&self) -> Result<Element, CoreError> {
        let leaf_index = self.leaf_index.ok_or(CoreError::NoLeafIndex)?;
        let inner = h2(self.nullifier, self.secret)?;
        h2(inner, Element::from_u64(leaf_index))
    }

    /// Converts to the decimal-string file representation.
    pub fn to_file(&self) -> NoteFile {
        NoteFile {
            secret: self.secret.to_decimal_string(),
            nullifier: self.nullifier.to_decimal_string(),
            amount: self.amount.to_string(),
            asset_id: self.asset_id.to_element().to_decimal_string(),
            commitment: self.commitment.to_decimal_string(),
            leaf_index: self.leaf_index,
            root: self.root.map(Element::to_decimal_string),
        }
    }

    /// Parses the decimal-string file representation.
    pub fn from_file(file: &NoteFile) -> Result<Self, CoreError> {
        let amount = file
            .amount
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidNoteFile(format!("bad amount {:?}", file.amount)))?;
        let asset_element = Element::from_decimal_str(&file.asset_id)?;
        let asset_id = AssetId::from_bytes(asset_element.to_be32())?;
        let root = match &file.root {
            Some(s) => Some(Element::from_decimal_str(s)?),
            None => None,
        };
        Ok(Self {
            secret: Element::from_decimal_str(&file.secret)?,
            nullifier: Element::from_decimal_str(&file.nullifier)?,
            amount,
            asset_id,
            commitment: Element::from_decimal_str(&file.commitment)?,
            leaf_index: file.leaf_index,
            root,
        })
    }

    /// Serializes the note to its JSON file form.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.to_file())
            .map_err(|e| CoreError::InvalidNoteFile(e.to_string()))
    }

    /// Parses a note from its JSON file form.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: NoteFile =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidNoteFile(e.to_string()))?;
        Self::from_file(&file)
    }

    /// Encrypts the note file under a password.
    ///
    /// A fresh salt and nonce are drawn per call; the key is derived with
    /// HKDF-SHA256. Only the round-trip property is contractual; the
    /// plaintext JSON form is the interchange format.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        password: &str,
        rng: &mut R,
    ) -> Result<EncryptedNote, CoreError> {
        crypt::encrypt(self, password, rng)
    }

    /// Decrypts a note encrypted with [`Note::encrypt`].
    pub fn decrypt(envelope: &EncryptedNote, password: &str) -> Result<Self, CoreError> {
        crypt::decrypt(envelope, password)
    }
}

/// Computes `h4(secret, nullifier, amount, asset_id)`.
pub fn compute_commitment(
    secret: Element,
    nullifier: Element,
    amount: u64,
    asset_id: AssetId,
) -> Result<Element, CoreError> {
    h4(
        secret,
        nullifier,
        Element::from_u64(amount),
        asset_id.to_element(),
    )
}

/// On-disk note representation: every field value as a decimal string.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct NoteFile {
    /// Note secret.
    pub secret: String,
    /// Note nullifier pre-image.
    pub nullifier: String,
    /// Amount in base units.
    pub amount: String,
    /// Asset identifier as a field element.
    pub asset_id: String,
    /// Commitment `h4(secret, nullifier, amount, asset_id)`.
    pub commitment: String,
    /// Leaf index assigned at settlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,
    /// Merkle root observed at settlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// Password-encrypted note envelope.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedNote {
    /// HKDF salt, fresh per encryption.
    #[serde_as(as = "Hex")]
    pub salt: [u8; 32],
    /// XChaCha20-Poly1305 nonce, fresh per encryption.
    #[serde_as(as = "Hex")]
    pub nonce: [u8; 24],
    /// Authenticated ciphertext of the note JSON.
    #[serde_as(as = "Hex")]
    pub ciphertext: Vec<u8>,
}

mod crypt {
    use chacha20poly1305::aead::{Aead as _, KeyInit as _};
    use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
    use hkdf::Hkdf;
    use rand::{CryptoRng, RngCore};
    use sha2::Sha256;
    use zeroize::Zeroize as _;

    use super::{EncryptedNote, Note};
    use crate::error::CoreError;

    const KEY_INFO: &[u8] = b"psol:note-key:v1";

    fn derive_key(password: &str, salt: &[u8; 32]) -> Result<[u8; 32], CoreError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), password.as_bytes());
        let mut key = [0u8; 32];
        hkdf.expand(KEY_INFO, &mut key)
            .map_err(|_| CoreError::Encrypt)?;
        Ok(key)
    }

    pub(super) fn encrypt<R: RngCore + CryptoRng>(
        note: &Note,
        password: &str,
        rng: &mut R,
    ) -> Result<EncryptedNote, CoreError> {
        let mut salt = [0u8; 32];
        let mut nonce = [0u8; 24];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let mut key = derive_key(password, &salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let mut plaintext = note.to_json()?.into_bytes();
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| CoreError::Encrypt)?;
        plaintext.zeroize();
        key.zeroize();

        Ok(EncryptedNote {
            salt,
            nonce,
            ciphertext,
        })
    }

    pub(super) fn decrypt(envelope: &EncryptedNote, password: &str) -> Result<Note, CoreError> {
        let mut key = derive_key(password, &envelope.salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(&envelope.nonce),
                envelope.ciphertext.as_slice(),
            )
            .map_err(|_| CoreError::Decrypt)?;
        key.zeroize();
        let json = String::from_utf8(plaintext).map_err(|_| CoreError::Decrypt)?;
        Note::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests")]

    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn test_note() -> Note {
        let asset = AssetId::derive(&[0x05u8; 32]);
        Note::new(1_000, asset, &mut test_rng()).unwrap()
    }

    mod commitments {
        use super::*;

        #[test]
        fn stored_commitment_matches_recomputation() {
            let note = test_note();
            assert!(note.verify().unwrap());
        }

        #[test]
        fn commitment_binds_every_field() {
            let note = test_note();
            let asset = note.asset_id();
            let other_amount =
                compute_commitment(note.secret(), note.nullifier(), 1_001, asset).unwrap();
            assert_ne!(other_amount, note.commitment());

            let other_asset = AssetId::derive(&[0x06u8; 32]);
            let swapped =
                compute_commitment(note.secret(), note.nullifier(), 1_000, other_asset).unwrap();
            assert_ne!(swapped, note.commitment());
        }

        #[test]
        fn fresh_notes_do_not_collide() {
            let mut rng = test_rng();
            let asset = AssetId::derive(&[0x05u8; 32]);
            let a = Note::new(1, asset, &mut rng).unwrap();
            let b = Note::new(1, asset, &mut rng).unwrap();
            assert_ne!(a.commitment(), b.commitment());
        }
    }

    mod nullifier_hashes {
        use super::*;

        #[test]
        fn requires_leaf_index() {
            let note = test_note();
            assert!(matches!(
                note.nullifier_hash(),
                Err(CoreError::NoLeafIndex)
            ));
        }

        #[test]
        fn deterministic_once_settled() {
            let mut note = test_note();
            note.set_settled(7, Element::from_u64(99));
            let a = note.nullifier_hash().unwrap();
            let b = note.nullifier_hash().unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn leaf_index_changes_the_hash() {
            let mut note = test_note();
            note.set_settled(7, Element::from_u64(99));
            let at_7 = note.nullifier_hash().unwrap();
            note.set_settled(8, Element::from_u64(99));
            let at_8 = note.nullifier_hash().unwrap();
            assert_ne!(at_7, at_8);
        }
    }

    mod files {
        use super::*;

        #[test]
        fn round_trip_preserves_commitment() {
            let mut note = test_note();
            note.set_settled(3, Element::from_u64(1234));
            let json = note.to_json().unwrap();
            let restored = Note::from_json(&json).unwrap();
            assert_eq!(restored, note);
            assert_eq!(
                restored.recompute_commitment().unwrap(),
                note.commitment()
            );
        }

        #[test]
        fn unsettled_note_round_trips_without_optionals() {
            let note = test_note();
            let json = note.to_json().unwrap();
            assert!(!json.contains("leaf_index"));
            let restored = Note::from_json(&json).unwrap();
            assert_eq!(restored.leaf_index(), None);
            assert_eq!(restored, note);
        }

        #[test]
        fn rejects_non_canonical_secret() {
            let mut file = test_note().to_file();
            file.secret =
                "21888242871839275222246405745257275088548364400416034343698204186575808495617"
                    .to_owned();
            assert!(Note::from_file(&file).is_err());
        }

        #[test]
        fn rejects_garbage_amount() {
            let mut file = test_note().to_file();
            file.amount = "lots".to_owned();
            assert!(matches!(
                Note::from_file(&file),
                Err(CoreError::InvalidNoteFile(_))
            ));
        }
    }

    mod encryption {
        use super::*;

        #[test]
        fn round_trip() {
            let note = test_note();
            let mut rng = test_rng();
            let envelope = note.encrypt("hunter2", &mut rng).unwrap();
            let restored = Note::decrypt(&envelope, "hunter2").unwrap();
            assert_eq!(restored, note);
        }

        #[test]
        fn wrong_password_fails() {
            let note = test_note();
            let mut rng = test_rng();
            let envelope = note.encrypt("hunter2", &mut rng).unwrap();
            assert!(matches!(
                Note::decrypt(&envelope, "hunter3"),
                Err(CoreError::Decrypt)
            ));
        }

        #[test]
        fn tampered_ciphertext_fails() {
            let note = test_note();
            let mut rng = test_rng();
            let mut envelope = note.encrypt("hunter2", &mut rng).unwrap();
            if let Some(byte) = envelope.ciphertext.first_mut() {
                *byte ^= 0x01;
            }
            assert!(Note::decrypt(&envelope, "hunter2").is_err());
        }

        #[test]
        fn salt_and_nonce_are_fresh() {
            let note = test_note();
            let mut rng = test_rng();
            let a = note.encrypt("pw", &mut rng).unwrap();
            let b = note.encrypt("pw", &mut rng).unwrap();
            assert_ne!(a.salt, b.salt);
            assert_ne!(a.nonce, b.nonce);
            assert_ne!(a.ciphertext, b.ciphertext);
        }
    }
}
