use super::common::*;
use crate::recruitment::domain::{RecordId, ValidationError};
use crate::recruitment::ledger::LedgerError;
use crate::recruitment::session::SessionUser;
use crate::recruitment::stats::{ListQuery, SortOrder};
use crate::recruitment::storage::UploadedFile;
use crate::recruitment::ServiceError;
use std::sync::Arc;

fn visitor() -> SessionUser {
    SessionUser {
        name: "visitor".to_string(),
        image: Some("https://pbs.twimg.com/profile_images/1/a.jpg".to_string()),
        provider: Some("twitter".to_string()),
        is_admin: false,
    }
}

fn pdf(name: &str, size: usize) -> UploadedFile {
    UploadedFile::new(name.to_string(), None, vec![b'%'; size])
}

#[tokio::test]
async fn talent_submission_expands_other_answers() {
    let harness = Harness::new();

    let receipt = harness
        .service
        .submit_talent(talent_submission(), Some(&visitor()))
        .await
        .expect("submission succeeds");

    let stored = harness.repository.talent();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, receipt.id);
    assert_eq!(stored[0].expertise, vec!["AI & Machine Learning", "Compilers"]);
    assert_eq!(stored[0].previous_work_links, vec!["https://ada.dev"]);

    let rows = harness.ledger.talent_rows();
    assert_eq!(rows[0].cells()[9], "visitor", "twitter sign-in fills the twitter cell");
}

#[tokio::test]
async fn ledger_failure_persists_nothing() {
    let repository = Arc::new(MemoryRepository::default());
    let service = service_with(repository.clone(), Arc::new(RateLimitedLedger));

    match service.submit_job_application(job_submission(), None).await {
        Err(ServiceError::Ledger(LedgerError::RateLimited)) => {}
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert!(repository.applications().is_empty());
}

#[tokio::test]
async fn invalid_submission_never_reaches_the_ledger() {
    let harness = Harness::new();
    let mut submission = job_submission();
    submission.contact = "   ".to_string();

    match harness.service.submit_job_application(submission, None).await {
        Err(ServiceError::Validation(ValidationError::MissingFields(fields))) => {
            assert_eq!(fields, vec!["contact"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(harness.ledger.application_rows().is_empty());
}

#[tokio::test]
async fn application_listing_counts_before_filtering() {
    let harness = Harness::new();
    harness
        .repository
        .seed_application(stored_application("1", "Designer", 9));
    harness
        .repository
        .seed_application(stored_application("2", "Rust Engineer", 10));
    harness
        .repository
        .seed_application(stored_application("3", "Community Lead", 11));

    let listing = harness
        .service
        .job_applications(&ListQuery {
            q: None,
            sort: Some(SortOrder::Desc),
        })
        .await
        .expect("listing succeeds");

    assert_eq!(listing.total_applications, 3);
    let positions: Vec<_> = listing
        .applications
        .iter()
        .map(|application| application.position.as_str())
        .collect();
    assert_eq!(positions, vec!["Rust Engineer", "Designer", "Community Lead"]);
}

#[tokio::test]
async fn deleting_unknown_id_is_not_an_error() {
    let harness = Harness::new();
    harness.repository.seed_talent(stored_recruit("1", "Ada", 9));

    harness
        .service
        .delete_talent_recruit(&RecordId::from("404"))
        .await
        .expect("delete succeeds");
    assert_eq!(harness.service.talent_recruit_count().await.expect("count"), 1);
}

#[tokio::test]
async fn file_checks_run_before_session_checks() {
    let harness = Harness::new();

    match harness.service.upload_talent_resume(None, None).await {
        Err(ServiceError::MissingFile) => {}
        other => panic!("expected missing file, got {other:?}"),
    }

    match harness
        .service
        .upload_talent_resume(Some(pdf("cv.pdf", 2048)), Some(&visitor()))
        .await
    {
        Err(ServiceError::FileTooLarge { limit: 1024 }) => {}
        other => panic!("expected size rejection, got {other:?}"),
    }

    let nameless = SessionUser {
        name: " ".to_string(),
        ..visitor()
    };
    match harness
        .service
        .upload_talent_resume(Some(pdf("cv.pdf", 16)), Some(&nameless))
        .await
    {
        Err(ServiceError::Unauthorized(message)) => {
            assert_eq!(message, "Unauthorized access or missing username");
        }
        other => panic!("expected unauthorized, got {other:?}"),
    }
    assert!(harness.bucket.paths().is_empty());
}

#[tokio::test]
async fn file_browser_rejects_paths_outside_resume_folders() {
    let harness = Harness::new();
    harness.bucket.put("private/keys.pem", b"secret", "text/plain");

    for path in ["private/keys.pem", "talentresume/../private/keys.pem", ""] {
        match harness.service.download_resume(path).await {
            Err(ServiceError::InvalidPath(_)) => {}
            other => panic!("expected invalid path for {path:?}, got {other:?}"),
        }
    }

    match harness.service.remove_resume("private/keys.pem").await {
        Err(ServiceError::InvalidPath(_)) => {}
        other => panic!("expected invalid path, got {other:?}"),
    }
    assert_eq!(harness.bucket.paths(), vec!["private/keys.pem"]);
}
