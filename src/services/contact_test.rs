use super::*;

fn scratch_log() -> (ContactLog, PathBuf) {
    let dir = std::env::temp_dir().join(format!("valleystays-contact-{}", uuid::Uuid::new_v4()));
    (ContactLog::new(dir.join("nested").join("messages.json")), dir)
}

fn form() -> ContactForm {
    ContactForm {
        name: " Asha Rao ".into(),
        email: "Asha@Example.com".into(),
        phone: String::new(),
        subject: "Airport pickup".into(),
        message: "Do you offer pickups from Srinagar airport?".into(),
    }
}

#[tokio::test]
async fn missing_file_is_empty_log() {
    let (log, dir) = scratch_log();
    assert!(log.messages().await.unwrap().is_empty());
    assert!(!dir.exists());
}

#[tokio::test]
async fn submit_appends_in_order() {
    let (log, dir) = scratch_log();
    let first = log.submit(form()).await.unwrap();
    let mut second_form = form();
    second_form.subject = "Houseboat".into();
    log.submit(second_form).await.unwrap();

    assert_eq!(first.name, "Asha Rao");
    assert_eq!(first.email, "asha@example.com");
    assert_eq!(first.status, RECEIVED);
    assert!(chrono::DateTime::parse_from_rfc3339(&first.timestamp).is_ok());

    let stored = log.messages().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0], first);
    assert_eq!(stored[1].subject, "Houseboat");

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(log.path()).unwrap()).unwrap();
    assert!(raw.is_array());
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn required_fields_are_checked_first() {
    let (log, dir) = scratch_log();
    for (field, blank) in [("name", 0), ("email", 1), ("subject", 2), ("message", 3)] {
        let mut f = form();
        match blank {
            0 => f.name = "  ".into(),
            1 => f.email = String::new(),
            2 => f.subject = String::new(),
            _ => f.message = "\n".into(),
        }
        let err = log.submit(f).await.unwrap_err();
        assert!(matches!(err, ContactError::MissingField(name) if name == field));
    }
    assert!(!dir.exists());
}

#[tokio::test]
async fn bad_email_is_rejected() {
    let (log, _dir) = scratch_log();
    let mut f = form();
    f.email = "asha".into();
    assert!(matches!(log.submit(f).await, Err(ContactError::InvalidEmail)));
}

#[tokio::test]
async fn corrupt_log_is_reported() {
    let (log, dir) = scratch_log();
    std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
    std::fs::write(log.path(), b"{not json").unwrap();
    let err = log.submit(form()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn sent_notice_text() {
    assert_eq!(sent_notice().title, "Message Sent Successfully!");
}
