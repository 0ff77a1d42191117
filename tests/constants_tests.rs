//! Tests for constants module.
//!
//! Validates the keys and defaults that must match what other tools write
//! into manifests and expect from the runtime.

use magikplay::*;

// =============================================================================
// Size Limit Tests
// =============================================================================

#[test]
fn test_manifest_size_reasonable() {
    // Large multi-document manifests with embedded config stay well under this
    assert!(
        MAX_MANIFEST_SIZE >= 1024 * 1024,
        "manifest limit too restrictive"
    );
    assert!(
        MAX_MANIFEST_SIZE <= 64 * 1024 * 1024,
        "manifest limit too permissive"
    );
}

#[test]
fn test_oversized_manifest_rejected() {
    let manifest = vec![b'#'; MAX_MANIFEST_SIZE + 1];
    let err = parse_manifest(&manifest).unwrap_err();
    assert!(matches!(err, Error::ManifestTooLarge { .. }));
}

// =============================================================================
// Annotation Key Tests
// =============================================================================

#[test]
fn test_volume_annotations_share_prefix() {
    for key in [
        VOLUME_DRIVER_ANNOTATION,
        VOLUME_DEVICE_ANNOTATION,
        VOLUME_TYPE_ANNOTATION,
        VOLUME_UID_ANNOTATION,
        VOLUME_GID_ANNOTATION,
        VOLUME_MOUNT_OPTS_ANNOTATION,
    ] {
        assert!(key.starts_with("volume.podman.io/"), "{key}");
    }
}

#[test]
fn test_auto_update_keys_do_not_collide() {
    // The authfile key extends the base key; scoped lookups must still be exact
    assert!(AUTO_UPDATE_AUTHFILE_LABEL.starts_with(AUTO_UPDATE_LABEL));
    assert_ne!(
        format!("{AUTO_UPDATE_LABEL}/authfile"),
        AUTO_UPDATE_AUTHFILE_LABEL
    );
}

// =============================================================================
// Default Tests
// =============================================================================

#[test]
fn test_infra_defaults() {
    assert!(DEFAULT_INFRA_IMAGE.contains("pause"));
    assert_eq!(INFRA_CONTAINER_NAME, "infra");
}

#[test]
fn test_build_files_order() {
    assert_eq!(BUILD_FILE_NAMES, ["Containerfile", "Dockerfile"]);
}

#[test]
fn test_restart_policy_values() {
    assert_eq!(RestartPolicy::Always.as_str(), RESTART_POLICY_ALWAYS);
    assert_eq!(RestartPolicy::OnFailure.as_str(), RESTART_POLICY_ON_FAILURE);
    assert_eq!(RestartPolicy::No.as_str(), RESTART_POLICY_NO);
}
