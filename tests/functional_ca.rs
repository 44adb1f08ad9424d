//! Reconcile CAs kept on disk by the OpenSSL backend.

mod common;

use std::fs;

use chrono::{TimeDelta, Utc};
use tlsca::ca::SubjectField;

use common::*;

#[test]
fn present_creates_then_is_idempotent() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");

        let outcome = reconciler.present(&request, &apply());
        assert!(outcome.success(), "{}", outcome.message());
        assert!(outcome.message().contains("Created"));
        assert!(cert_path(&d, "example.com").is_file());
        assert!(key_path(&d, "example.com").is_file());

        let cert_before = fs::read(cert_path(&d, "example.com")).unwrap();

        let outcome = reconciler.present(&request, &apply());
        assert!(outcome.success());
        assert!(outcome.message().contains("exists in the correct state"));
        assert!(outcome.changes().is_empty());

        // nothing was rewritten
        let cert_after = fs::read(cert_path(&d, "example.com")).unwrap();
        assert_eq!(cert_before, cert_after);
    })
}

#[test]
fn present_replaces_diverging_ca() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");
        assert!(reconciler.present(&request, &apply()).success());

        let changed = common::request("example.com", "changed.com");
        let outcome = reconciler.present(&changed, &apply());
        assert!(outcome.success(), "{}", outcome.message());
        assert_eq!(
            outcome.message(),
            "Replaced CA certificate \"example.com\""
        );

        let info = reconciler.inspect("example.com", None).unwrap().unwrap();
        assert_eq!(
            info.subject().get(SubjectField::CommonName),
            Some("changed.com")
        );
    })
}

#[test]
fn present_replaces_on_new_expiry() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");
        assert!(reconciler.present(&request, &apply()).success());

        let expires = Utc::now().date_naive() + TimeDelta::days(730);
        let compact = expires.format("%Y%m%d").to_string();
        let request = request.with_expires(compact);

        let outcome = reconciler.present(&request, &apply());
        assert!(outcome.success(), "{}", outcome.message());
        assert!(outcome.message().contains("Replaced"));

        let info = reconciler.inspect("example.com", None).unwrap().unwrap();
        assert_eq!(info.expires_on(), Some(expires));

        let outcome = reconciler.present(&request, &apply());
        assert!(outcome.message().contains("exists in the correct state"));
    })
}

#[test]
fn organization_change_does_not_replace() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let mut request = request("example.com", "example.com");
        request.subject.set(SubjectField::Organization, "First");
        assert!(reconciler.present(&request, &apply()).success());

        request.subject.set(SubjectField::Organization, "Second");
        request.bits = 2048;
        request.digest = "sha512".to_string();
        let outcome = reconciler.present(&request, &apply());
        assert!(outcome.message().contains("exists in the correct state"));

        let info = reconciler.inspect("example.com", None).unwrap().unwrap();
        assert_eq!(
            info.subject().get(SubjectField::Organization),
            Some("First")
        );
    })
}

#[test]
fn dry_run_leaves_disk_alone() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");

        let outcome = reconciler.present(&request, &dry_run());
        assert!(outcome.success());
        assert!(outcome.message().contains("set to be added"));
        assert!(!cert_path(&d, "example.com").exists());

        assert!(reconciler.present(&request, &apply()).success());

        let changed = common::request("example.com", "changed.com");
        let outcome = reconciler.present(&changed, &dry_run());
        assert!(outcome.success());
        assert!(outcome.message().contains("CN: changed.com"));

        let outcome = reconciler.absent("example.com", None, &dry_run());
        assert!(outcome.success());
        assert!(outcome.message().contains("set to be removed"));

        assert!(cert_path(&d, "example.com").is_file());
        assert!(key_path(&d, "example.com").is_file());
        let info = reconciler.inspect("example.com", None).unwrap().unwrap();
        assert_eq!(
            info.subject().get(SubjectField::CommonName),
            Some("example.com")
        );
    })
}

#[test]
fn absent_removes_certificate_and_key() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");
        assert!(reconciler.present(&request, &apply()).success());

        let outcome = reconciler.absent("example.com", None, &apply());
        assert!(outcome.success(), "{}", outcome.message());
        assert_eq!(
            outcome.changes().get("example.com").map(String::as_str),
            Some("removed")
        );
        assert!(!cert_path(&d, "example.com").exists());
        assert!(!key_path(&d, "example.com").exists());

        let outcome = reconciler.absent("example.com", None, &apply());
        assert!(outcome.success());
        assert_eq!(
            outcome.message(),
            "CA certificate \"example.com\" is not present"
        );
        assert!(outcome.changes().is_empty());
    })
}

#[test]
fn absent_reports_missing_key() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");
        assert!(reconciler.present(&request, &apply()).success());
        fs::remove_file(key_path(&d, "example.com")).unwrap();

        let outcome = reconciler.absent("example.com", None, &apply());
        assert!(!outcome.success());
        assert_eq!(
            outcome.changes().get("example.com").map(String::as_str),
            Some("certificate removed")
        );
        assert!(!cert_path(&d, "example.com").exists());
    })
}

#[test]
fn storage_location_overrides_storage_dir() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d.join("unused"));
        let other = d.join("other");
        let request = request("example.com", "example.com")
            .with_storage_location(other.clone());

        assert!(reconciler.present(&request, &apply()).success());
        assert!(cert_path(&other, "example.com").is_file());
        assert!(!d.join("unused").exists());

        let outcome = reconciler.absent("example.com", Some(&other), &apply());
        assert!(outcome.success());
        assert!(!cert_path(&other, "example.com").exists());
    })
}

#[test]
fn bad_requests_fail_without_writing() {
    test_under_tmp(|d| {
        let reconciler = reconciler(&d);

        let request = request("example.com", "example.com")
            .with_expires("next year");
        let outcome = reconciler.present(&request, &apply());
        assert!(!outcome.success());
        assert_eq!(outcome.message(), "Invalid expiration date: next year");

        let request = request.with_expires("2001-01-01");
        let outcome = reconciler.present(&request, &apply());
        assert!(!outcome.success());
        assert!(
            outcome
                .message()
                .starts_with("Failed to create CA certificate \"example.com\"")
        );

        let mut request = common::request("example.com", "example.com");
        request.digest = "no-such-digest".to_string();
        let outcome = reconciler.present(&request, &apply());
        assert!(!outcome.success());
        assert!(outcome.message().contains("no-such-digest"));

        assert!(!cert_path(&d, "example.com").exists());
        assert!(!key_path(&d, "example.com").exists());
    })
}

#[test]
fn unreadable_certificate_is_reported() {
    test_under_tmp(|d| {
        let path = cert_path(&d, "example.com");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "this is not a certificate").unwrap();

        let reconciler = reconciler(&d);
        let request = request("example.com", "example.com");
        let outcome = reconciler.present(&request, &apply());

        assert!(!outcome.success());
        assert!(outcome.message().starts_with("Could not inspect"));
        assert_eq!(fs::read(&path).unwrap(), b"this is not a certificate");
    })
}
