use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // identity UUID
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
}
