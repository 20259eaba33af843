use crate::{jwk, Jwk};

use serde::{Deserialize, Serialize};

/// A JSON Web Key Set (JWKS)
///
/// Keys are kept in document order. Entries that cannot be understood are
/// skipped when deserializing rather than failing the whole set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Gets the first key, in document order, whose key ID equals `kid`
    ///
    /// Comparison is exact. When several keys share the same ID, the first
    /// one wins.
    pub fn get_key_by_id(&self, kid: &'_ jwk::KeyIdRef) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.key_id() == Some(kid))
    }

    /// Gets the key matching `kid`, if one was provided
    ///
    /// A token that does not declare a key ID never matches.
    pub fn get_key_by_opt(&self, kid: Option<&'_ jwk::KeyIdRef>) -> Option<&Jwk> {
        kid.and_then(|kid| self.get_key_by_id(kid))
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<T: IntoIterator<Item = Jwk>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<Jwk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct MaybeJwksVisitor;

    impl<'de> serde::de::Visitor<'de> for MaybeJwksVisitor {
        type Value = Vec<Jwk>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a list of JWK objects")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
            let mut index = 0_usize;

            while let Some(value) = seq.next_element()? {
                match value {
                    MaybeJwk::Jwk(jwk) => values.push(jwk),
                    MaybeJwk::Unknown(key) => {
                        tracing::warn!(
                            jwks.idx = index,
                            jwk.kid = ?key.kid,
                            jwk.kty = ?key.kty,
                            "ignoring unrecognized JWK"
                        );
                    }
                }
                index += 1;
            }

            Ok(values)
        }
    }

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum MaybeJwk {
        Jwk(Jwk),
        Unknown(JwkLike),
    }

    #[derive(serde::Deserialize)]
    struct JwkLike {
        #[serde(default)]
        kid: Option<serde_json::Value>,
        #[serde(default)]
        kty: Option<serde_json::Value>,
    }

    deserializer.deserialize_seq(MaybeJwksVisitor)
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use tracing_test::traced_test;

    use super::*;
    use crate::jwk::{KeyId, KeyIdRef};

    const JWKS_WITH_DUPLICATE_KIDS: &str = r#"
        {
            "keys": [
                { "kid": "other", "x5c": ["AAEC"] },
                { "kid": "abc", "x5c": ["AAAA"] },
                { "kid": "abc", "x5c": ["AQEB"] }
            ]
        }
    "#;

    const JWKS_WITH_UNKNOWN_USAGE: &str = r#"
        {
            "keys": [
                { "kid": "1", "use": "wrap", "n": "~~~", "x5c": ["AAEC"] },
                { "kid": "2", "use": "sig" }
            ]
        }
    "#;

    const JWKS_WITH_BAD_CERTIFICATE_ENCODING: &str = r#"
        {
            "keys": [
                { "kid": "1", "x5c": ["!!not base64!!"] }
            ]
        }
    "#;

    #[test]
    #[traced_test]
    fn first_key_with_matching_kid_wins() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(JWKS_WITH_DUPLICATE_KIDS)?;
        assert_eq!(jwks.keys().len(), 3);

        let key = jwks
            .get_key_by_id(KeyIdRef::from_str("abc"))
            .expect("key should be found");
        assert_eq!(
            key.certificate_chain().next().map(|c| c.as_slice()),
            Some(&[0u8, 0, 0][..])
        );
        Ok(())
    }

    #[test]
    fn kid_comparison_is_exact() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(JWKS_WITH_DUPLICATE_KIDS)?;
        assert!(jwks.get_key_by_id(KeyIdRef::from_str("ABC")).is_none());
        assert!(jwks.get_key_by_id(KeyIdRef::from_str("ab")).is_none());
        Ok(())
    }

    #[test]
    fn missing_kid_never_matches() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(JWKS_WITH_DUPLICATE_KIDS)?;
        assert!(jwks.get_key_by_opt(None).is_none());
        assert!(jwks
            .get_key_by_opt(Some(KeyIdRef::from_str("other")))
            .is_some());
        Ok(())
    }

    #[test]
    #[traced_test]
    fn keeps_keys_with_unknown_usage() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(JWKS_WITH_UNKNOWN_USAGE)?;
        assert_eq!(jwks.keys().len(), 2);

        let key = jwks
            .get_key_by_id(KeyIdRef::from_str("1"))
            .expect("key should be found");
        assert_eq!(key.usage(), None);
        assert!(key.modulus().is_none());
        assert_eq!(key.certificate_chain().count(), 1);

        assert_eq!(jwks.keys()[1].usage(), Some(jwk::Usage::Signing));
        assert!(!logs_contain("ignoring unrecognized JWK"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn skips_keys_with_undecodable_certificates() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(JWKS_WITH_BAD_CERTIFICATE_ENCODING)?;
        assert!(jwks.keys().is_empty());
        Ok(())
    }

    #[test]
    fn empty_key_set_is_valid() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(r#"{"keys":[]}"#)?;
        assert!(jwks.keys().is_empty());
        Ok(())
    }

    #[test]
    fn document_without_keys_is_rejected() {
        assert!(serde_json::from_str::<Jwks>(r#"{"foo":[]}"#).is_err());
        assert!(serde_json::from_str::<Jwks>("not json").is_err());
    }

    #[test]
    fn collects_keys_in_order() {
        let jwks: Jwks = vec![
            Jwk::default().with_key_id(KeyId::from_static("a")),
            Jwk::default().with_key_id(KeyId::from_static("b")),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = jwks.keys().iter().filter_map(Jwk::key_id).collect();
        assert_eq!(ids, [KeyIdRef::from_str("a"), KeyIdRef::from_str("b")]);
    }
}
