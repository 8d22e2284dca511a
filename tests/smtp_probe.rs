//! Submission sessions against a mock SMTP server

mod support;

use mailprobe::{flow, session::Verdict};
use pretty_assertions::assert_eq;
use support::{fast_config, mock_server::MockServer, smtp_target};

#[tokio::test]
async fn test_submission_succeeds() {
    let server = MockServer::smtp().build().await.unwrap();
    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(
        server.received().await,
        vec![
            "HELO example.com",
            "MAIL FROM:<sender@example.com>",
            "RCPT TO:<receiver@example.com>",
            "DATA",
            "QUIT",
        ]
    );

    let messages = server.mailbox().messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Subject: Test Email from mailprobe"));
    assert!(messages[0].contains("This is a test email sent by the mailprobe SMTP tester."));

    server.shutdown();
}

#[tokio::test]
async fn test_multiline_helo_reply() {
    let server = MockServer::smtp()
        .with_response("HELO", "250-mock.example.com\r\n250-PIPELINING\r\n250 SIZE 10000")
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert!(report.is_success(), "{}", report.verdict);
    assert_eq!(server.received().await.len(), 5);
    server.shutdown();
}

#[tokio::test]
async fn test_rejected_recipient_fails() {
    let server = MockServer::smtp()
        .with_response("RCPT", "550 User unknown")
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::Failure("550 User unknown".to_string()));
    assert!(!server.received().await.contains(&"DATA".to_string()));
    assert!(server.mailbox().messages().await.is_empty());
    server.shutdown();
}

#[tokio::test]
async fn test_rejected_message_fails() {
    let server = MockServer::smtp()
        .with_data_end_response("554 Transaction failed")
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert_eq!(
        report.verdict,
        Verdict::Failure("554 Transaction failed".to_string())
    );
    server.shutdown();
}

#[tokio::test]
async fn test_replies_split_into_small_writes() {
    let server = MockServer::smtp().with_chunk_size(3).build().await.unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert!(report.is_success(), "{}", report.verdict);
    server.shutdown();
}

#[tokio::test]
async fn test_connection_dropped_mid_session() {
    let server = MockServer::smtp()
        .with_network_error_after_commands(2)
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    // The peer's close is seen as EOF or as a reset, depending on timing
    assert!(!report.is_success());
    assert_eq!(report.sent.len(), 3);
    server.shutdown();
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let server = MockServer::smtp()
        .with_timeout_on_command(1)
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert_eq!(
        report.verdict,
        Verdict::Failure("no response within 2 seconds".to_string())
    );
    server.shutdown();
}

#[tokio::test]
async fn test_greeting_rejection_fails() {
    let server = MockServer::smtp()
        .with_greeting("554 No SMTP service here")
        .build()
        .await
        .unwrap();

    let report = flow::submit(&smtp_target(server.port()), &fast_config())
        .await
        .unwrap();

    assert_eq!(
        report.verdict,
        Verdict::Failure("554 No SMTP service here".to_string())
    );
    assert!(report.sent.is_empty());
    server.shutdown();
}
