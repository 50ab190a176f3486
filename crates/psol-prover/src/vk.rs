//! Verifying-key loading from the circuit's JSON export.

use std::path::Path;

use psol_core::curve::{g1_from_decimal, g2_from_decimal};
use serde::Deserialize;

use crate::error::ProverError;

/// The snarkjs `verification_key.json` shape.
///
/// Coordinates are decimal strings; G2 coordinates arrive as
/// `[[x_re, x_im], [y_re, y_im]]` and are swapped to the on-chain
/// imaginary-first byte form during conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyingKeyJson {
    /// Declared number of public inputs.
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    /// `alpha` in G1.
    pub vk_alpha_1: Vec<String>,
    /// `beta` in G2.
    pub vk_beta_2: Vec<Vec<String>>,
    /// `gamma` in G2.
    pub vk_gamma_2: Vec<Vec<String>>,
    /// `delta` in G2.
    pub vk_delta_2: Vec<Vec<String>>,
    /// Input commitments; length must be `nPublic + 1`.
    #[serde(rename = "IC")]
    pub ic: Vec<Vec<String>>,
}

/// A verifying key in on-chain byte layout.
#[derive(Debug, Clone)]
pub struct VerifyingKey {
    /// `alpha`, G1.
    pub alpha_g1: [u8; 64],
    /// `beta`, G2 (imaginary-first).
    pub beta_g2: [u8; 128],
    /// `gamma`, G2 (imaginary-first).
    pub gamma_g2: [u8; 128],
    /// `delta`, G2 (imaginary-first).
    pub delta_g2: [u8; 128],
    /// Input commitments, G1 each.
    pub ic: Vec<[u8; 64]>,
    /// Number of public inputs.
    pub n_public: usize,
}

impl VerifyingKey {
    /// Parses and converts a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ProverError> {
        let parsed: VerifyingKeyJson = serde_json::from_str(json)?;
        Self::from_parsed(&parsed)
    }

    /// Reads and converts a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ProverError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Converts the parsed JSON, enforcing structure.
    pub fn from_parsed(json: &VerifyingKeyJson) -> Result<Self, ProverError> {
        let expected = json.n_public.saturating_add(1);
        if json.ic.len() != expected {
            return Err(ProverError::IcLengthMismatch {
                expected,
                actual: json.ic.len(),
            });
        }

        let alpha_g1 = g1_point(&json.vk_alpha_1, "vk_alpha_1")?;
        let beta_g2 = g2_point(&json.vk_beta_2, "vk_beta_2")?;
        let gamma_g2 = g2_point(&json.vk_gamma_2, "vk_gamma_2")?;
        let delta_g2 = g2_point(&json.vk_delta_2, "vk_delta_2")?;

        if alpha_g1 == [0u8; 64] {
            return Err(ProverError::IdentityPoint("vk_alpha_1"));
        }
        if beta_g2 == [0u8; 128] {
            return Err(ProverError::IdentityPoint("vk_beta_2"));
        }
        if gamma_g2 == [0u8; 128] {
            return Err(ProverError::IdentityPoint("vk_gamma_2"));
        }
        if delta_g2 == [0u8; 128] {
            return Err(ProverError::IdentityPoint("vk_delta_2"));
        }

        let mut ic = Vec::with_capacity(json.ic.len());
        for (i, coords) in json.ic.iter().enumerate() {
            let point = g1_point(coords, "IC")?;
            if point == [0u8; 64] {
                return Err(ProverError::IdentityPoint("IC"));
            }
            tracing::trace!(index = i, "loaded IC point");
            ic.push(point);
        }

        Ok(Self {
            alpha_g1,
            beta_g2,
            gamma_g2,
            delta_g2,
            ic,
            n_public: json.n_public,
        })
    }
}

fn g1_point(coords: &[String], name: &str) -> Result<[u8; 64], ProverError> {
    match coords {
        [x, y, ..] => Ok(g1_from_decimal(x, y)?),
        _ => Err(ProverError::VkFormat(format!(
            "{name}: G1 point needs at least 2 coordinates"
        ))),
    }
}

fn g2_point(coords: &[Vec<String>], name: &str) -> Result<[u8; 128], ProverError> {
    let (x, y) = match coords {
        [x, y, ..] => (x, y),
        _ => {
            return Err(ProverError::VkFormat(format!(
                "{name}: G2 point needs at least 2 coordinates"
            )));
        }
    };
    match (x.as_slice(), y.as_slice()) {
        ([x_re, x_im, ..], [y_re, y_im, ..]) => Ok(g2_from_decimal(x_re, x_im, y_re, y_im)?),
        _ => Err(ProverError::VkFormat(format!(
            "{name}: G2 coordinates need two coefficients each"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests")]

    use super::*;

    const G2_X_RE: &str =
        "10857046999023057135944570762232829481370756359578518086990519993285655852781";
    const G2_X_IM: &str =
        "11559732032986387107991004021392285783925812861821192530917403151452391805634";
    const G2_Y_RE: &str =
        "8495653923123431417604973247489272438418190587263600148770280649306958101930";
    const G2_Y_IM: &str =
        "4082367875863433681332203403145435568316851327593401208105741076214120093531";

    fn g2_json() -> Vec<Vec<String>> {
        vec![
            vec![G2_X_RE.into(), G2_X_IM.into()],
            vec![G2_Y_RE.into(), G2_Y_IM.into()],
            vec!["1".into(), "0".into()],
        ]
    }

    fn sample_vk(n_public: usize, ic_len: usize) -> VerifyingKeyJson {
        VerifyingKeyJson {
            n_public,
            vk_alpha_1: vec!["1".into(), "2".into(), "1".into()],
            vk_beta_2: g2_json(),
            vk_gamma_2: g2_json(),
            vk_delta_2: g2_json(),
            ic: (0..ic_len)
                .map(|_| vec!["1".into(), "2".into(), "1".into()])
                .collect(),
        }
    }

    #[test]
    fn loads_well_formed_key() {
        let vk = VerifyingKey::from_parsed(&sample_vk(5, 6)).unwrap();
        assert_eq!(vk.n_public, 5);
        assert_eq!(vk.ic.len(), 6);
        // beta leads with the imaginary coefficient.
        let mut lead = [0u8; 32];
        lead.copy_from_slice(&vk.beta_g2[0..32]);
        assert_eq!(
            lead,
            psol_core::curve::fq_from_decimal(G2_X_IM).unwrap()
        );
    }

    #[test]
    fn ic_length_mismatch_is_fatal() {
        assert!(matches!(
            VerifyingKey::from_parsed(&sample_vk(5, 5)),
            Err(ProverError::IcLengthMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn identity_alpha_rejected() {
        let mut json = sample_vk(2, 3);
        json.vk_alpha_1 = vec!["0".into(), "0".into(), "0".into()];
        assert!(matches!(
            VerifyingKey::from_parsed(&json),
            Err(ProverError::IdentityPoint("vk_alpha_1"))
        ));
    }

    #[test]
    fn json_round_trip_from_string() {
        let json = serde_json::json!({
            "protocol": "groth16",
            "curve": "bn128",
            "nPublic": 1,
            "vk_alpha_1": ["1", "2", "1"],
            "vk_beta_2": [[G2_X_RE, G2_X_IM], [G2_Y_RE, G2_Y_IM], ["1", "0"]],
            "vk_gamma_2": [[G2_X_RE, G2_X_IM], [G2_Y_RE, G2_Y_IM], ["1", "0"]],
            "vk_delta_2": [[G2_X_RE, G2_X_IM], [G2_Y_RE, G2_Y_IM], ["1", "0"]],
            "IC": [["1", "2", "1"], ["1", "2", "1"]],
        });
        let vk = VerifyingKey::from_json_str(&json.to_string()).unwrap();
        assert_eq!(vk.n_public, 1);
    }

    #[test]
    fn malformed_g2_rejected() {
        let mut json = sample_vk(1, 2);
        json.vk_gamma_2 = vec![vec!["1".into()], vec!["2".into()]];
        assert!(matches!(
            VerifyingKey::from_parsed(&json),
            Err(ProverError::VkFormat(_))
        ));
    }
}
