use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use super::{parse_assume_role_output, AssumeRoleRequest, CredentialRecord, CredentialSupplier};

/// Supplier that reads an already-obtained assume-role response.
///
/// Lets the exchange happen elsewhere, e.g.
/// `aws sts assume-role ... | session-token write`. The request passed to
/// [`CredentialSupplier::obtain`] is ignored and the reader is consumed to
/// its end on each call.
pub struct JsonInputSupplier<R> {
    reader: Mutex<R>,
}

impl<R> JsonInputSupplier<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }

    /// Read and decode the document without an accompanying request.
    pub async fn read_record(&self) -> Result<CredentialRecord> {
        let mut content = String::new();
        self.reader
            .lock()
            .await
            .read_to_string(&mut content)
            .await
            .context("Failed to read assume-role response")?;
        parse_assume_role_output(&content)
    }
}

#[async_trait]
impl<R> CredentialSupplier for JsonInputSupplier<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn obtain(&self, _request: &AssumeRoleRequest) -> Result<CredentialRecord> {
        self.read_record().await
    }
}
