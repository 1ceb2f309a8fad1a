use opendal::services::S3;
use opendal::{ErrorKind, Operator};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::{ObjectStore, RemoteTarget};
use crate::config::RemoteConfig;
use crate::error::Result;

/// S3 bucket access. Calls block the worker thread on a private runtime.
pub struct S3Store {
    operator: Operator,
    runtime: Runtime,
}

impl S3Store {
    pub fn connect(target: &RemoteTarget, config: &RemoteConfig) -> Result<Self> {
        let mut builder = S3::default()
            .bucket(&target.bucket)
            .region(&config.region);
        if let Some(key) = &config.access_key_id {
            builder = builder.access_key_id(key);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.secret_access_key(secret);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)?.finish();
        let runtime = Builder::new_multi_thread()
            .thread_name("photostash-s3")
            .enable_all()
            .build()?;
        debug!("Connected to bucket {} in {}", target.bucket, config.region);
        Ok(Self { operator, runtime })
    }
}

impl ObjectStore for S3Store {
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        match self.runtime.block_on(self.operator.list(prefix)) {
            Ok(entries) => Ok(entries
                .into_iter()
                .map(|entry| entry.path().to_string())
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.runtime.block_on(self.operator.write(key, body))?;
        Ok(())
    }
}
