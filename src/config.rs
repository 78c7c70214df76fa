use serde::Deserialize;

use crate::catalog;
use crate::cdn;
use crate::objects;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogBackend,
    pub objects: ObjectsBackend,
    pub cdn: cdn::CdnConfig,
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogBackend {
    Postgres(catalog::PostgresConfig),
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectsBackend {
    S3(objects::S3Config),
}
