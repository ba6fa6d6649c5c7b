use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{RedmapError, Result};
use crate::types::BulkType;

/// 把任意 serde 可序列化的值存成 JSON bulk
///
/// ```
/// use redmap::types::{BulkType, Json};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Profile {
///     name: String,
///     level: u32,
/// }
///
/// let codec = Json::<Profile>::new();
/// let profile = Profile { name: "aria".into(), level: 3 };
/// let encoded = codec.encode(&profile).unwrap();
/// assert_eq!(codec.decode(&encoded).unwrap(), profile);
/// ```
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for Json<T> {}

impl<T> std::fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Json")
    }
}

impl<T> BulkType for Json<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Value = T;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| RedmapError::encoding(format!("JSON serialization failed: {}", e)))
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        serde_json::from_slice(bulk)
            .map_err(|e| RedmapError::decoding(format!("JSON deserialization failed: {}", e)))
    }
}

#[async_trait::async_trait]
impl<T> crate::types::ValueType for Json<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Input = T;
    type Stored = Option<T>;

    async fn load(&self, session: &crate::session::Session, key: &str) -> Result<Self::Stored> {
        crate::types::load_bulk(self, session, key).await
    }

    async fn save(
        &self,
        session: &crate::session::Session,
        key: &str,
        value: Self::Input,
    ) -> Result<Self::Stored> {
        crate::types::save_bulk(self, session, key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_json_round_trip() {
        let codec = Json::<Point>::new();
        let point = Point { x: 3, y: -4 };
        let encoded = codec.encode(&point).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), point);
    }

    #[test]
    fn test_json_rejects_malformed() {
        let codec = Json::<Point>::new();
        let err = codec.decode(b"{\"x\": 3").unwrap_err();
        assert!(matches!(err, RedmapError::Decoding(_)));
    }
}
