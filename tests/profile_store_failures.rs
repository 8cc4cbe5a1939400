mod support;

use anyhow::Result;
use session_token::store::{upsert_profile, ProfileStore, StoreError, StoreErrorKind};
use support::{header, read, record, write_credentials, TWO_PROFILES};
use tempfile::TempDir;

#[test]
fn missing_file_is_io_error_without_side_effects() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("credentials");
    let store = ProfileStore::new(&path);

    let err = store
        .upsert_profile(&header("[p]"), &record("1", "2", "3"))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Io);
    assert!(err.to_string().contains("credentials"));
    assert!(!path.exists());
    assert!(!store.backup_path().exists());

    Ok(())
}

#[test]
fn truncated_section_is_corruption_and_file_untouched() -> Result<()> {
    let dir = TempDir::new()?;
    let original = "[other]\nx = 1\n\n[p]\naws_access_key_id = old\naws_secret_access_key = old\n";
    let path = write_credentials(dir.path(), original)?;
    let store = ProfileStore::new(&path);

    let err = store
        .upsert_profile(&header("[p]"), &record("1", "2", "3"))
        .unwrap_err();
    match &err {
        StoreError::Corruption {
            header,
            expected,
            found,
            ..
        } => {
            assert_eq!(header, "[p]");
            assert_eq!(*expected, 3);
            assert_eq!(*found, 2);
        }
        other => panic!("expected corruption, got {other:?}"),
    }

    assert_eq!(read(&path)?, original);
    assert_eq!(read(&store.backup_path())?, original);

    Ok(())
}

#[test]
fn header_on_last_line_is_corruption() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), "[a]\nk = v\n[p]")?;

    let err = upsert_profile(&path, "[p]", &record("1", "2", "3")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Corruption);
    assert_eq!(read(&path)?, "[a]\nk = v\n[p]");

    Ok(())
}

#[test]
fn empty_secret_rejected_before_any_io() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), TWO_PROFILES)?;
    let store = ProfileStore::new(&path);

    let err = store
        .upsert_profile(&header("[a]"), &record("AK", "", "ST"))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Validation);
    assert!(!store.backup_path().exists());
    assert_eq!(read(&path)?, TWO_PROFILES);

    Ok(())
}

#[test]
fn validation_precedes_missing_file_check() {
    let store = ProfileStore::new("/nonexistent/dir/credentials");
    let err = store
        .upsert_profile(&header("[a]"), &record("AK", "SK", ""))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Validation);
}

#[test]
fn malformed_header_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), TWO_PROFILES)?;

    let err = upsert_profile(&path, "no-brackets", &record("1", "2", "3")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Validation);
    assert_eq!(read(&path)?, TWO_PROFILES);

    Ok(())
}

#[test]
fn errors_never_contain_secrets() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), "[p]\nonly one line\n")?;

    let secret = "wJalrXUtnFEMI-very-secret";
    let token = "FwoGZXIvYXdzEBY-token";
    let err = upsert_profile(&path, "[p]", &record("AK", secret, token)).unwrap_err();
    let message = format!("{err} {err:?}");
    assert!(!message.contains(secret));
    assert!(!message.contains(token));

    Ok(())
}

#[test]
fn read_profile_on_truncated_section_is_corruption() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), "[p]\naws_access_key_id = a\n")?;
    let store = ProfileStore::new(&path);

    let err = store.read_profile(&header("[p]")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Corruption);

    Ok(())
}

#[cfg(unix)]
#[test]
fn read_only_target_fails_after_backup() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new()?;
    let path = write_credentials(dir.path(), TWO_PROFILES)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444))?;

    // Privileged users ignore mode bits; nothing to check then.
    if std::fs::OpenOptions::new().write(true).open(&path).is_ok() {
        return Ok(());
    }

    let store = ProfileStore::new(&path);
    let err = store
        .upsert_profile(&header("[new]"), &record("1", "2", "3"))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Io);
    assert_eq!(read(&path)?, TWO_PROFILES);
    assert!(store.backup_path().exists());
    assert_eq!(read(&store.backup_path())?, TWO_PROFILES);

    Ok(())
}

#[test]
fn read_profile_with_keys_out_of_order_is_corruption() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_credentials(
        dir.path(),
        "[p]\naws_secret_access_key = s\naws_access_key_id = a\naws_session_token = t\n",
    )?;
    let store = ProfileStore::new(&path);

    let err = store.read_profile(&header("[p]")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Corruption);
    match &err {
        StoreError::MisplacedKey {
            header,
            position,
            expected,
            ..
        } => {
            assert_eq!(header, "[p]");
            assert_eq!(*position, 1);
            assert_eq!(*expected, "aws_access_key_id");
        }
        other => panic!("expected misplaced key, got {other:?}"),
    }
    assert!(!err.to_string().contains("= s"));
    assert!(store.read_profile(&header("[absent]"))?.is_none());

    Ok(())
}
