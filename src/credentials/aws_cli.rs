//! Supplier backed by the `aws` command line tool.
//!
//! Performs the same exchange as the provider SDK would: look up the user's
//! MFA device when no serial is given, resolve a role name to its ARN, then
//! assume the role with the MFA code. Each step is a separate `aws`
//! invocation whose JSON output is decoded here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use uuid::Uuid;

use super::{parse_assume_role_output, AssumeRoleRequest, CredentialRecord, CredentialSupplier};

/// How to invoke the `aws` tool.
#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    /// Program to run. Defaults to `aws` looked up on `PATH`.
    pub program: PathBuf,
    /// When false, every call gets `--no-verify-ssl`.
    pub verify_ssl: bool,
    /// Profile holding the long-term credentials used to make the calls.
    pub source_profile: Option<String>,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("aws"),
            verify_ssl: true,
            source_profile: None,
        }
    }
}

pub struct AwsCliSupplier {
    config: AwsCliConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListMfaDevicesOutput {
    #[serde(rename = "MFADevices")]
    mfa_devices: Vec<MfaDevice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MfaDevice {
    serial_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetRoleOutput {
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Role {
    arn: String,
}

impl AwsCliSupplier {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    /// Run one `aws` subcommand and return its standard output.
    ///
    /// Only the service and operation are logged; arguments may carry the
    /// MFA code.
    async fn run(&self, service: &str, operation: &str, args: &[String]) -> Result<String> {
        let mut command = Command::new(&self.config.program);
        command.arg(service).arg(operation).args(args);
        command.arg("--output").arg("json");
        if !self.config.verify_ssl {
            command.arg("--no-verify-ssl");
        }
        if let Some(profile) = &self.config.source_profile {
            command.arg("--profile").arg(profile);
        }

        tracing::debug!(service, operation, "Running aws command");
        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("aws {service} {operation} failed: {}", stderr.trim());
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("Invalid UTF-8 in aws {service} {operation} output"))
    }

    /// Serial number of the first MFA device registered to `user_name`.
    pub async fn mfa_serial(&self, user_name: &str) -> Result<String> {
        let stdout = self
            .run(
                "iam",
                "list-mfa-devices",
                &[
                    "--user-name".to_string(),
                    user_name.to_string(),
                    "--max-items".to_string(),
                    "1".to_string(),
                ],
            )
            .await?;
        let output: ListMfaDevicesOutput =
            serde_json::from_str(&stdout).context("Failed to parse list-mfa-devices output")?;

        output
            .mfa_devices
            .into_iter()
            .next()
            .map(|device| device.serial_number)
            .with_context(|| format!("No MFA device registered for user {user_name}"))
    }

    /// ARN for a role. Values that already are ARNs are returned unchanged.
    pub async fn role_arn(&self, role: &str) -> Result<String> {
        if role.starts_with("arn:") {
            return Ok(role.to_string());
        }

        let stdout = self
            .run(
                "iam",
                "get-role",
                &["--role-name".to_string(), role.to_string()],
            )
            .await?;
        let output: GetRoleOutput =
            serde_json::from_str(&stdout).context("Failed to parse get-role output")?;
        Ok(output.role.arn)
    }
}

#[async_trait]
impl CredentialSupplier for AwsCliSupplier {
    async fn obtain(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord> {
        request.validate()?;

        let serial = match (&request.mfa_serial, &request.user_name) {
            (Some(serial), _) => serial.clone(),
            (None, Some(user_name)) => self.mfa_serial(user_name).await?,
            (None, None) => anyhow::bail!("Either an MFA serial or a user name is required"),
        };
        let role_arn = self.role_arn(&request.role).await?;
        let session_name = Uuid::new_v4().to_string();

        tracing::info!(role = %role_arn, session = %session_name, "Assuming role");
        let stdout = self
            .run(
                "sts",
                "assume-role",
                &[
                    "--role-arn".to_string(),
                    role_arn,
                    "--role-session-name".to_string(),
                    session_name,
                    "--serial-number".to_string(),
                    serial,
                    "--token-code".to_string(),
                    request.mfa_code.clone(),
                    "--duration-seconds".to_string(),
                    request.duration.as_secs().to_string(),
                ],
            )
            .await?;

        parse_assume_role_output(&stdout)
    }
}
